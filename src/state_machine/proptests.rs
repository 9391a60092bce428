//! Property-based tests for the state machine
//!
//! Drive whole round trips through the pure transition function and check
//! what reaches the history.

use super::transition::*;
use super::*;
use crate::actions::{ActionRequest, ActionResult};
use crate::history::{Turn, ERROR_REPLY};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_request() -> impl Strategy<Value = ActionRequest> {
    prop_oneof![
        prop_oneof![Just("HOME"), Just("MARKETPLACE"), Just("BAZAAR")].prop_map(|screen| {
            ActionRequest::from_tool_use("navigate_to_screen", &json!({ "screen": screen }))
        }),
        ("[A-Z][a-z]{2,8}", 1u32..10_000).prop_map(|(crop, price)| {
            ActionRequest::from_tool_use("add_market_listing", &json!({ "crop": crop, "price": price }))
        }),
        "[a-z_]{3,12}".prop_map(|name| ActionRequest::from_tool_use(&name, &json!({}))),
    ]
}

/// A batch of requests, each paired with its outcome and optional follow-up text
fn arb_round_trip() -> impl Strategy<Value = Vec<(ActionRequest, bool, Option<String>)>> {
    prop::collection::vec(
        (arb_request(), any::<bool>(), prop::option::of("[a-zA-Z ]{1,20}")),
        1..5,
    )
}

// ============================================================================
// Helpers
// ============================================================================

fn step(state: &mut ConvState, event: Event) -> Vec<Effect> {
    let result = transition(state, event).expect("valid transition");
    *state = result.new_state;
    result.effects
}

fn commits(effects: &[Effect]) -> Vec<Turn> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::CommitTurns { turns } => Some(turns.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn outcome_for(request: &ActionRequest, succeeded: bool) -> ActionResult {
    if succeeded {
        ActionResult::success(&request.name, format!("{} done", request.name))
    } else {
        ActionResult::failure(&request.name, format!("{} failed", request.name))
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// For N requests the history gains, in order: the utterance, the request
    /// turn, then each result followed by its follow-up text when present.
    #[test]
    fn prop_round_trip_history_order(trip in arb_round_trip()) {
        let requests: Vec<ActionRequest> = trip.iter().map(|(r, _, _)| r.clone()).collect();
        let mut state = ConvState::Idle;
        let mut effects = step(&mut state, Event::UserMessage { text: "hello".to_string() });
        effects.extend(step(&mut state, Event::ModelResponse {
            text: None,
            action_requests: requests.clone(),
        }));

        let mut expected = vec![Turn::user("hello"), Turn::action_requests(requests.clone())];
        let mut executed = vec![];

        for (request, succeeded, follow_up) in &trip {
            prop_assert!(matches!(state, ConvState::Dispatching { .. }), "expected Dispatching state");
            executed.extend(effects.iter().filter_map(|e| match e {
                Effect::ExecuteAction { request } => Some(request.clone()),
                _ => None,
            }));

            let result = outcome_for(request, *succeeded);
            expected.push(Turn::action_result(result.clone()));
            effects = step(&mut state, Event::ActionComplete { result });
            prop_assert!(effects.iter().any(|e| matches!(e, Effect::RequestModel { .. })), "expected RequestModel effect");

            if let Some(text) = follow_up {
                expected.push(Turn::assistant(text));
            }
            effects = step(&mut state, Event::ModelResponse {
                text: follow_up.clone(),
                action_requests: vec![],
            });
        }

        prop_assert!(state.is_idle());
        prop_assert_eq!(executed, requests);
        prop_assert_eq!(commits(&effects), expected);
    }

    /// A model failure at any point commits only the utterance and the fixed reply
    #[test]
    fn prop_model_error_leaves_clean_history(trip in arb_round_trip(), fail_at in 0usize..6) {
        let requests: Vec<ActionRequest> = trip.iter().map(|(r, _, _)| r.clone()).collect();
        let mut state = ConvState::Idle;
        step(&mut state, Event::UserMessage { text: "hello".to_string() });

        let effects = if fail_at == 0 {
            step(&mut state, Event::ModelError { message: "down".to_string() })
        } else {
            step(&mut state, Event::ModelResponse { text: None, action_requests: requests });
            let mut last = vec![];
            for (i, (request, succeeded, follow_up)) in trip.iter().enumerate() {
                step(&mut state, Event::ActionComplete { result: outcome_for(request, *succeeded) });
                if i + 1 == fail_at {
                    last = step(&mut state, Event::ModelError { message: "down".to_string() });
                    break;
                }
                last = step(&mut state, Event::ModelResponse {
                    text: follow_up.clone(),
                    action_requests: vec![],
                });
            }
            last
        };

        prop_assert!(state.is_idle());
        let committed = commits(&effects);
        if fail_at <= trip.len() {
            prop_assert_eq!(committed, vec![Turn::user("hello"), Turn::assistant(ERROR_REPLY)]);
        } else {
            // Never failed: the round trip completed normally
            prop_assert_eq!(&committed[0], &Turn::user("hello"));
            prop_assert!(committed.iter().all(|t| *t != Turn::assistant(ERROR_REPLY)));
        }
    }

    /// No state other than Idle accepts a second utterance
    #[test]
    fn prop_single_flight(trip in arb_round_trip()) {
        let requests: Vec<ActionRequest> = trip.iter().map(|(r, _, _)| r.clone()).collect();
        let mut state = ConvState::Idle;
        step(&mut state, Event::UserMessage { text: "first".to_string() });
        let busy = |state: &ConvState| {
            matches!(
                transition(state, Event::UserMessage { text: "second".to_string() }),
                Err(TransitionError::AssistantBusy)
            )
        };

        prop_assert!(busy(&state));
        step(&mut state, Event::ModelResponse { text: None, action_requests: requests });
        for (request, succeeded, _) in &trip {
            prop_assert!(busy(&state));
            step(&mut state, Event::ActionComplete { result: outcome_for(request, *succeeded) });
            prop_assert!(busy(&state));
            step(&mut state, Event::ModelResponse { text: None, action_requests: vec![] });
        }
        prop_assert!(state.is_idle());
    }
}
