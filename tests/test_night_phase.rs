//! Night phase integration tests: the check/kill/check protocol and
//! mandatory-action validation.

mod common;

use std::sync::Arc;

use mafiasim::agent::{NightAction, NightRequest, RequestKind};
use mafiasim::error::FatalError;
use mafiasim::judge::Judge;
use mafiasim::observability::EventEmitter;
use mafiasim::phases::NightPhase;
use mafiasim::roles::{RoleKind, Team};
use mafiasim::state::{EliminationReason, Phase};

use common::{StubAgent, fixed_state, pid, stub_pool};

fn harness() -> (Judge, NightPhase) {
    let emitter = Arc::new(EventEmitter::noop());
    (Judge::new(Arc::clone(&emitter), false), NightPhase::new(emitter))
}

#[tokio::test]
async fn full_night_runs_check_kill_check() {
    let mut state = fixed_state(None);
    state.start_night();
    let mut agents = stub_pool(&state);
    let (mut judge, night) = harness();

    night.run(&mut state, &mut judge, &mut agents).await.unwrap();

    // Default stubs: everyone targets the lowest legal seat, so the mafia
    // converge on player 1.
    assert!(!state.player(pid(1)).unwrap().is_alive());
    assert_eq!(state.night_kill(1), Some(pid(1)));
    // The victim's closing statement was collected.
    assert!(
        state
            .player(pid(1))
            .unwrap()
            .speeches()
            .iter()
            .any(|s| s.closing)
    );

    // Sheriff checked player 1 before the kill and learned their team.
    let sheriff = state.player(pid(7)).unwrap();
    let check = &sheriff.sheriff_checks()[&1];
    assert_eq!(check.target, pid(1));
    assert_eq!(check.team, Team::Red);

    // Every living mafioso made a claim; the Don made the decision.
    for mafioso in [pid(8), pid(9), pid(10)] {
        assert!(state.player(mafioso).unwrap().kill_claims().contains_key(&1));
    }
    assert!(state.player(pid(10)).unwrap().kill_decisions().contains_key(&1));

    // Don checked after the kill, so his first living other is seat 2.
    let don_check = &state.player(pid(10)).unwrap().don_checks()[&1];
    assert_eq!(don_check.target, pid(2));
    assert!(!don_check.is_sheriff);

    assert_eq!(state.phase(), Phase::Night);
}

#[tokio::test]
async fn skipped_sheriff_check_fails_the_game() {
    let mut state = fixed_state(None);
    state.start_night();
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(7),
        Box::new(StubAgent::new().with_night(|_| Ok(NightAction::Pass))),
    );
    let (mut judge, night) = harness();

    let err = night
        .run(&mut state, &mut judge, &mut agents)
        .await
        .unwrap_err();
    let FatalError::NightValidation(violations) = err else {
        panic!("expected a night validation failure, got {err}");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].role, RoleKind::Sheriff);
    assert_eq!(violations[0].player, pid(7));
}

#[tokio::test]
async fn skipped_don_check_fails_the_game() {
    let mut state = fixed_state(None);
    state.start_night();
    let mut agents = stub_pool(&state);
    // The Don claims and decides but never performs his check.
    agents.insert(
        pid(10),
        Box::new(StubAgent::new().with_night(|ctx| match &ctx.request {
            RequestKind::Night(NightRequest::KillClaim) => {
                Ok(NightAction::KillClaim { target: ctx.presumed_civilians()[0] })
            }
            RequestKind::Night(NightRequest::KillDecision { claims }) => Ok(
                NightAction::KillDecision {
                    target: *claims.values().next().unwrap(),
                },
            ),
            _ => Ok(NightAction::Pass),
        })),
    );
    let (mut judge, night) = harness();

    let err = night
        .run(&mut state, &mut judge, &mut agents)
        .await
        .unwrap_err();
    let FatalError::NightValidation(violations) = err else {
        panic!("expected a night validation failure, got {err}");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].role, RoleKind::Don);
    assert_eq!(violations[0].player, pid(10));
}

#[tokio::test]
async fn skipped_kill_decision_fails_the_game() {
    let mut state = fixed_state(None);
    state.start_night();
    let mut agents = stub_pool(&state);
    // The Don claims and checks but refuses the binding kill decision.
    agents.insert(
        pid(10),
        Box::new(StubAgent::new().with_night(|ctx| match &ctx.request {
            RequestKind::Night(NightRequest::KillClaim) => {
                Ok(NightAction::KillClaim { target: ctx.presumed_civilians()[0] })
            }
            RequestKind::Night(NightRequest::DonCheck) => {
                Ok(NightAction::DonCheck { target: ctx.alive_others()[0] })
            }
            _ => Ok(NightAction::Pass),
        })),
    );
    let (mut judge, night) = harness();

    let err = night
        .run(&mut state, &mut judge, &mut agents)
        .await
        .unwrap_err();
    let FatalError::NightValidation(violations) = err else {
        panic!("expected a night validation failure, got {err}");
    };
    assert_eq!(state.night_kill(1), None);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].role, RoleKind::Don);
    assert_eq!(violations[0].player, pid(10));
}

#[tokio::test]
async fn lone_don_still_kills() {
    let mut state = fixed_state(None);
    state.eliminate(pid(8), EliminationReason::Voting, &[]);
    state.eliminate(pid(9), EliminationReason::Voting, &[]);
    state.start_night();
    let mut agents = stub_pool(&state);
    let (mut judge, night) = harness();

    night.run(&mut state, &mut judge, &mut agents).await.unwrap();

    let victim = state.night_kill(1).expect("a kill was decided");
    assert!(!state.player(victim).unwrap().is_alive());
    let don = state.player(pid(10)).unwrap();
    assert!(don.kill_claims().contains_key(&1));
    assert!(don.kill_decisions().contains_key(&1));
}

#[tokio::test]
async fn dead_don_passes_the_decision_down() {
    let mut state = fixed_state(None);
    state.eliminate(pid(10), EliminationReason::Voting, &[]);
    state.start_night();
    let mut agents = stub_pool(&state);
    let (mut judge, night) = harness();

    night.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert!(state.night_kill(1).is_some());
    // Seat 8 is the lowest living non-Don mafioso.
    assert!(state.player(pid(8)).unwrap().kill_decisions().contains_key(&1));
}

#[tokio::test]
async fn win_mid_night_skips_validation() {
    let mut state = fixed_state(None);
    // Four civilians against three mafia; the night kill reaches parity.
    for n in [1u8, 2, 3] {
        state.eliminate(pid(n), EliminationReason::Voting, &[]);
    }
    state.start_night();
    let mut agents = stub_pool(&state);
    // The Sheriff never acts, which would normally abort the match.
    agents.insert(
        pid(7),
        Box::new(StubAgent::new().with_night(|_| Ok(NightAction::Pass))),
    );
    let (mut judge, night) = harness();

    night.run(&mut state, &mut judge, &mut agents).await.unwrap();

    assert_eq!(state.phase(), Phase::GameOver);
    assert_eq!(state.winner(), Some(Team::Black));
}

#[tokio::test]
async fn agent_failure_during_the_night_is_fatal() {
    let mut state = fixed_state(None);
    state.start_night();
    let mut agents = stub_pool(&state);
    agents.insert(
        pid(8),
        Box::new(StubAgent::new().with_night(|ctx| {
            Err(mafiasim::error::AgentError::SourceFailure {
                player: ctx.player.id(),
                action: ctx.request.label().to_owned(),
                message: "connection lost".to_owned(),
            })
        })),
    );
    let (mut judge, night) = harness();

    let err = night
        .run(&mut state, &mut judge, &mut agents)
        .await
        .unwrap_err();
    assert!(matches!(err, FatalError::Agent(_)));
    assert_eq!(err.player(), Some(pid(8)));
    assert_eq!(err.action(), Some("kill_claim"));
}
