//! Structured event stream for match consumers.
//!
//! Discrete, typed events emitted as the game progresses.  Events are
//! serialized as newline-delimited JSON (JSONL) and include a monotonically
//! increasing sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::roles::Team;
use crate::state::{EliminationReason, GameOverReason, GameSummary, Phase, PlayerId};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// One tally row in a [`Event::VoteResults`] event.
#[derive(Debug, Clone, Serialize)]
pub struct TallyLine {
    /// Nominee the votes landed on.
    pub target: PlayerId,
    /// Total votes, defaults included.
    pub votes: usize,
    /// Voters attributed to this nominee.
    pub voters: Vec<PlayerId>,
}

/// A discrete event emitted during a match.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A new match has begun.
    GameStarted {
        /// When the match started.
        timestamp: DateTime<Utc>,
        /// All seats at the table.
        players: Vec<PlayerId>,
        /// Black-team seats, Don included.
        mafia: Vec<PlayerId>,
        /// The Sheriff's seat.
        sheriff: Option<PlayerId>,
        /// Seed the role deal was drawn from.
        seed: u64,
    },

    /// The game moved to a new phase.
    PhaseChanged {
        timestamp: DateTime<Utc>,
        phase: Phase,
        day: u32,
        night: u32,
    },

    /// A player delivered a speech.
    Speech {
        timestamp: DateTime<Utc>,
        player: PlayerId,
        day: u32,
        text: String,
        /// Whether this was a closing statement after elimination.
        closing: bool,
    },

    /// A nomination was parsed from a speech.
    Nomination {
        timestamp: DateTime<Utc>,
        nominator: PlayerId,
        target: PlayerId,
        day: u32,
        accepted: bool,
        /// Rejection reason when not accepted.
        reason: Option<String>,
    },

    /// Voting opened over the listed nominees.
    VotingStarted {
        timestamp: DateTime<Utc>,
        nominees: Vec<PlayerId>,
        day: u32,
    },

    /// An explicit vote was cast.
    VoteCast {
        timestamp: DateTime<Utc>,
        voter: PlayerId,
        target: PlayerId,
        day: u32,
    },

    /// Final tallies for one vote round, defaults resolved.
    VoteResults {
        timestamp: DateTime<Utc>,
        day: u32,
        tallies: Vec<TallyLine>,
    },

    /// A vote round ended with a tie.
    TieDetected {
        timestamp: DateTime<Utc>,
        tied: Vec<PlayerId>,
        day: u32,
    },

    /// A player left the game.
    Elimination {
        timestamp: DateTime<Utc>,
        player: PlayerId,
        reason: EliminationReason,
        day: Option<u32>,
        night: Option<u32>,
        voters: Vec<PlayerId>,
    },

    /// A mafioso claimed a kill target during the night protocol.
    KillClaim {
        timestamp: DateTime<Utc>,
        mafia: PlayerId,
        target: PlayerId,
        night: u32,
    },

    /// The binding kill decision for the night.
    KillDecision {
        timestamp: DateTime<Utc>,
        decider: PlayerId,
        target: PlayerId,
        night: u32,
        /// Whether the Don made the call.
        is_don: bool,
    },

    /// The Sheriff checked a player's team.
    SheriffCheck {
        timestamp: DateTime<Utc>,
        target: PlayerId,
        result: Team,
        night: u32,
    },

    /// The Don checked whether a player is the Sheriff.
    DonCheck {
        timestamp: DateTime<Utc>,
        target: PlayerId,
        is_sheriff: bool,
        night: u32,
    },

    /// The moderator said something to the table.
    Announcement {
        timestamp: DateTime<Utc>,
        text: String,
        phase: Phase,
        day: u32,
        night: u32,
    },

    /// Full state snapshot after a consequential change.
    StateSnapshot {
        timestamp: DateTime<Utc>,
        summary: GameSummary,
    },

    /// The match ended.
    GameOver {
        timestamp: DateTime<Utc>,
        winner: Option<Team>,
        reason: GameOverReason,
        day: u32,
        night: u32,
    },

    /// A fatal decision failure aborted the match.
    FatalError {
        timestamp: DateTime<Utc>,
        message: String,
        player: Option<PlayerId>,
        action: Option<String>,
    },
}

/// What actually goes on the wire: the event plus its position in the
/// stream, flattened into one JSON object.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

/// Serializes events to a shared writer, one JSON line each.
///
/// Sequence numbers start at zero and are handed out atomically, so a
/// consumer can reorder or de-duplicate the stream. Writes go through a
/// mutex; a failed write or serialization is dropped on the floor rather
/// than interrupting the match.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl EventEmitter {
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Stderr keeps the stream clear of the verdict printed on stdout.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Discards every event.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Streams into a freshly created file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(Box::new(std::fs::File::create(path)?)))
    }

    /// Assigns the next sequence number and writes the event as one
    /// JSONL line, flushing immediately so consumers can tail the stream.
    pub fn emit(&self, event: Event) {
        let envelope = EventEnvelope {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            event,
        };
        let Ok(line) = serde_json::to_string(&envelope) else {
            return;
        };
        if let Ok(mut w) = self.writer.lock() {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// How many events have been handed a sequence number.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// The boxed writer has no Debug impl.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
