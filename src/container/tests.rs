//! Transition tests for the resource container.

use std::time::Duration;

use tokio::time::Instant;

use super::*;
use crate::error::FetchError;
use crate::key::ArgKey;

type State = ResourceState<u32, &'static str, &'static str>;

fn request(seq: u64, args: u32) -> Action<u32, &'static str, &'static str> {
    Action::Request {
        args,
        key: ArgKey::new(args.to_string()),
        seq,
    }
}

fn succeed(seq: u64, data: &'static str) -> Action<u32, &'static str, &'static str> {
    Action::Succeed {
        seq,
        data,
        at: Instant::now(),
    }
}

fn fail(seq: u64, error: &'static str) -> Action<u32, &'static str, &'static str> {
    Action::Fail {
        seq,
        error: FetchError::Rejected(error),
    }
}

#[test]
fn test_new_state_is_idle() {
    let state = State::new();
    assert!(state.is_idle());
    assert_eq!(state.request_seq(), 0);
    assert!(state.data().is_none());
    assert!(state.args().is_none());
    assert!(state.error().is_none());
}

#[test]
fn test_request_enters_loading() {
    let state = State::new().reduce(request(1, 7));
    assert!(state.is_loading());
    assert_eq!(state.args(), Some(&7));
    assert_eq!(state.key(), Some(&ArgKey::new("7")));
    assert_eq!(state.request_seq(), 1);
}

#[test]
fn test_request_keeps_previous_data_and_error() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(succeed(1, "A"))
        .reduce(request(2, 2))
        .reduce(fail(2, "down"))
        .reduce(request(3, 2));

    assert!(state.is_loading());
    assert_eq!(state.data(), Some(&"A"));
    assert_eq!(state.error().and_then(|e| e.rejection()), Some(&"down"));
}

#[test]
fn test_succeed_with_current_seq() {
    let state = State::new().reduce(request(1, 1)).reduce(succeed(1, "A"));
    assert!(state.is_loaded());
    assert_eq!(state.data(), Some(&"A"));
    assert!(state.error().is_none());
    assert!(state.updated_at().is_some());
}

#[test]
fn test_succeed_clears_error() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(fail(1, "down"))
        .reduce(request(2, 1))
        .reduce(succeed(2, "A"));

    assert!(state.is_loaded());
    assert!(state.error().is_none());
}

#[test]
fn test_stale_succeed_is_ignored() {
    let state = State::new().reduce(request(1, 1)).reduce(request(2, 2));
    let stale = succeed(1, "old");
    assert!(!state.accepts(&stale));

    let state = state.reduce(stale);
    assert!(state.is_loading());
    assert!(state.data().is_none());
    assert_eq!(state.args(), Some(&2));
}

#[test]
fn test_fail_keeps_data() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(succeed(1, "A"))
        .reduce(request(2, 1))
        .reduce(fail(2, "network down"));

    assert!(state.is_error());
    assert_eq!(state.data(), Some(&"A"));
    assert_eq!(
        state.error(),
        Some(&FetchError::Rejected("network down"))
    );
}

#[test]
fn test_stale_fail_is_ignored() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(request(2, 2))
        .reduce(succeed(2, "B"))
        .reduce(fail(1, "late"));

    assert!(state.is_loaded());
    assert_eq!(state.data(), Some(&"B"));
    assert!(state.error().is_none());
}

#[test]
fn test_set_data_leaves_phase_alone() {
    let state = State::new().reduce(request(1, 1));
    let state = state.reduce(Action::SetData { data: "draft" });

    assert!(state.is_loading());
    assert_eq!(state.data(), Some(&"draft"));
    assert_eq!(state.request_seq(), 1);
}

#[test]
fn test_set_data_then_fetch_overwrites() {
    let state = State::new()
        .reduce(Action::SetData { data: "x" })
        .reduce(request(1, 1))
        .reduce(succeed(1, "y"));

    assert_eq!(state.data(), Some(&"y"));
}

#[test]
fn test_clear_data() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(succeed(1, "A"))
        .reduce(Action::ClearData);

    assert!(state.is_loaded());
    assert!(state.data().is_none());
}

#[test]
fn test_reset_returns_to_idle_and_bumps_seq() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(succeed(1, "A"))
        .reduce(request(2, 2))
        .reduce(Action::Reset);

    assert!(state.is_idle());
    assert!(state.data().is_none());
    assert!(state.args().is_none());
    assert!(state.key().is_none());
    assert!(state.error().is_none());
    assert!(state.updated_at().is_none());
    assert_eq!(state.request_seq(), 3);
}

#[test]
fn test_reset_invalidates_in_flight_request() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(Action::Reset)
        .reduce(succeed(1, "late"));

    assert!(state.is_idle());
    assert!(state.data().is_none());
}

#[test]
fn test_view_projects_fields() {
    let state = State::new().reduce(request(1, 1)).reduce(succeed(1, "A"));
    let view = state.view();

    assert_eq!(view.data, Some("A"));
    assert_eq!(view.status, Status::Loaded);
    assert!(view.error.is_none());
    assert!(!view.is_loading());
}

#[test]
fn test_freshness() {
    let at = Instant::now();
    let state = State::new().reduce(request(1, 1)).reduce(Action::Succeed {
        seq: 1,
        data: "A",
        at,
    });

    assert!(state.is_fresh(at + Duration::from_secs(3600), None));
    assert!(state.is_fresh(at + Duration::from_secs(5), Some(Duration::from_secs(10))));
    assert!(!state.is_fresh(at + Duration::from_secs(10), Some(Duration::from_secs(10))));
}

#[test]
fn test_only_loaded_is_fresh() {
    let now = Instant::now();
    assert!(!State::new().is_fresh(now, None));
    assert!(!State::new().reduce(request(1, 1)).is_fresh(now, None));

    let errored = State::new().reduce(request(1, 1)).reduce(fail(1, "down"));
    assert!(!errored.is_fresh(now, None));
}

#[test]
fn test_status_display() {
    assert_eq!(Status::Idle.to_string(), "idle");
    assert_eq!(Status::Loading.to_string(), "loading");
    assert!(Status::Loaded.is_settled());
    assert!(Status::Error.is_settled());
    assert!(!Status::Loading.is_settled());
}

#[test]
fn test_reject_supersedes_and_clears_key() {
    let state = State::new()
        .reduce(request(1, 1))
        .reduce(succeed(1, "A"))
        .reduce(request(2, 2))
        .reduce(Action::Reject {
            args: 3,
            seq: 3,
            error: FetchError::Rejected("bad args"),
        });

    assert!(state.is_error());
    assert_eq!(state.request_seq(), 3);
    assert_eq!(state.args(), Some(&3));
    assert!(state.key().is_none());
    assert_eq!(state.data(), Some(&"A"));

    // The request it superseded can no longer land.
    let state = state.reduce(succeed(2, "B"));
    assert!(state.is_error());
    assert_eq!(state.data(), Some(&"A"));
}

#[test]
fn test_action_names() {
    assert_eq!(request(1, 1).name(), "request");
    assert_eq!(succeed(1, "A").completion_seq(), Some(1));
    assert_eq!(request(4, 1).completion_seq(), None);
}
