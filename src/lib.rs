//! `mafiasim` — a ten-player mafia (werewolf) match engine.
//!
//! The crate separates three concerns:
//!
//! - **State** ([`state`]): the authoritative record of the match, only
//!   mutable through its own methods.
//! - **Adjudication** ([`judge`], [`phases`], [`game`]): the moderator and
//!   the phase controllers that drive the rules.
//! - **Decisions** ([`agent`]): every player choice crosses the
//!   [`agent::DecisionSource`] boundary, so the engine never decides for a
//!   player and a source never sees more than its player may know.
//!
//! Matches are deterministic for a given seed and configuration, and every
//! consequential step is published on a JSONL event stream
//! ([`observability`]).

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod game;
pub mod judge;
pub mod observability;
pub mod phases;
pub mod roles;
pub mod state;
