//! Day phase integration tests: speaking order, nominations, and the
//! end-of-day decision.

mod common;

use std::sync::Arc;

use mafiasim::error::FatalError;
use mafiasim::judge::Judge;
use mafiasim::observability::EventEmitter;
use mafiasim::phases::DayPhase;
use mafiasim::state::{ActionRecord, EliminationReason, Phase, PlayerId};

use common::{StubAgent, fixed_state, pid, stub_pool};

fn harness() -> (Judge, DayPhase) {
    let emitter = Arc::new(EventEmitter::noop());
    (Judge::new(Arc::clone(&emitter), false), DayPhase::new(emitter))
}

#[tokio::test]
async fn first_day_single_nomination_skips_the_vote() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(1),
        Box::new(StubAgent::saying("I nominate player number 5. PASS")),
    );
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert_eq!(state.phase(), Phase::Night);
    assert_eq!(state.alive_ids().len(), 10);
    assert_eq!(state.nominations_for(1), &[pid(5)]);
}

#[tokio::test]
async fn no_nominations_goes_straight_to_night() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert_eq!(state.phase(), Phase::Night);
    assert!(state.nominations_for(1).is_empty());
}

#[tokio::test]
async fn later_day_single_nomination_is_unanimous_elimination() {
    let mut state = fixed_state(None);
    state.start_night();
    state.start_day();
    assert_eq!(state.day(), 2);

    let mut agents = stub_pool(&state);
    agents.insert(
        pid(1),
        Box::new(StubAgent::saying("I nominate player number 5. PASS")),
    );
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert!(!state.player(pid(5)).unwrap().is_alive());
    let elimination = state
        .log()
        .iter()
        .find_map(|r| match r {
            ActionRecord::Elimination {
                player,
                reason,
                voters,
                ..
            } => Some((*player, *reason, voters.clone())),
            _ => None,
        })
        .expect("elimination recorded");
    assert_eq!(elimination.0, pid(5));
    assert_eq!(elimination.1, EliminationReason::UnanimousNomination);
    // Everyone but the target counts as a voter.
    assert_eq!(elimination.2.len(), 9);
    assert!(!elimination.2.contains(&pid(5)));
    // The eliminated player gave a closing statement.
    assert!(
        state
            .player(pid(5))
            .unwrap()
            .speeches()
            .iter()
            .any(|s| s.closing)
    );
    assert_eq!(state.phase(), Phase::Night);
}

#[tokio::test]
async fn two_nominations_open_the_vote() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(1),
        Box::new(StubAgent::saying("I nominate player number 5. PASS")),
    );
    agents.insert(
        pid(2),
        Box::new(StubAgent::saying("I nominate player number 6. PASS")),
    );
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert_eq!(state.phase(), Phase::Voting);
    assert_eq!(state.nominations_for(1), &[pid(5), pid(6)]);
}

#[tokio::test]
async fn repeat_nomination_is_rejected_first_writer_wins() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(1),
        Box::new(StubAgent::saying("I nominate player number 5. PASS")),
    );
    agents.insert(
        pid(3),
        Box::new(StubAgent::saying("I also nominate player number 5. PASS")),
    );
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert_eq!(state.nominations_for(1), &[pid(5)]);
    assert_eq!(judge.first_nominator(1, pid(5)), Some(pid(1)));
}

#[tokio::test]
async fn missing_terminator_is_repaired() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(4),
        Box::new(StubAgent::saying("I have my suspicions but will keep them")),
    );
    let (mut judge, day) = harness();

    day.run(&mut state, &mut judge, &mut agents).await.unwrap();

    let speech = &state.player(pid(4)).unwrap().speeches()[0];
    assert!(speech.text.ends_with(" PASS"));
    assert_eq!(
        speech.text,
        "I have my suspicions but will keep them PASS"
    );
}

#[tokio::test]
async fn empty_speech_is_fatal() {
    let mut state = fixed_state(None);
    let mut agents = stub_pool(&state);
    agents.insert(pid(2), Box::new(StubAgent::saying("   ")));
    let (mut judge, day) = harness();

    let err = day
        .run(&mut state, &mut judge, &mut agents)
        .await
        .unwrap_err();
    assert!(matches!(err, FatalError::Agent(_)));
    assert_eq!(err.player(), Some(pid(2)));
}

#[test]
fn speaking_order_starts_at_seat_one() {
    let state = fixed_state(None);
    let order = DayPhase::speaking_order(&state);
    assert_eq!(order.first(), Some(&pid(1)));
    assert_eq!(order.len(), 10);
}

#[test]
fn speaking_order_rotates_past_the_previous_opener() {
    let mut state = fixed_state(None);
    // Day one opened with seat 1; day two opens with seat 2.
    state.set_last_day_starter(pid(1));
    let order = DayPhase::speaking_order(&state);
    assert_eq!(order.first(), Some(&pid(2)));

    // With seat 2 dead, day two opens with seat 3 instead.
    state.eliminate(pid(2), EliminationReason::NightKill, &[]);
    let order = DayPhase::speaking_order(&state);
    assert_eq!(order.first(), Some(&pid(3)));
    assert_eq!(order.len(), 9);
}

#[test]
fn speaking_order_wraps_to_the_lowest_seat() {
    let mut state = fixed_state(None);
    state.set_last_day_starter(pid(10));
    let order = DayPhase::speaking_order(&state);
    assert_eq!(order.first(), Some(&pid(1)));
    assert_eq!(order.last(), Some(&pid(10)));
}

#[test]
fn set_last_day_starter_is_visible() {
    let mut state = fixed_state(None);
    assert_eq!(state.last_day_starter(), None);
    state.set_last_day_starter(pid(4));
    assert_eq!(state.last_day_starter(), Some(pid(4)));
}

#[test]
fn speaking_order_is_a_permutation_of_the_living() {
    let mut state = fixed_state(None);
    state.eliminate(pid(6), EliminationReason::Voting, &[]);
    state.set_last_day_starter(pid(5));
    let mut order = DayPhase::speaking_order(&state);
    assert_eq!(order.first(), Some(&pid(7)));
    order.sort();
    let mut alive: Vec<PlayerId> = state.alive_ids();
    alive.sort();
    assert_eq!(order, alive);
}
