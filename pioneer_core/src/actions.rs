//! Action-style entry points: each call produces an [`ActionResponse`] the way
//! the host daemon expects it, mapping every failure onto a response field.

use crate::explorer::{ExplorationContext, ExploreError, TransitionExplorer};
use crate::progress::DeadlineExtender;
use crate::stop::StopCondition;
use crate::store::{StateStore, StoreError, state_name_to_filename};
use crate::transactor::ConfigTransactor;
use serde::Serialize;
use tracing::{debug, info};

/// Reply of one action. At least one field is set.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            success: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            failure: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.success.is_some() && self.failure.is_none() && self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `key: value` lines, in the order error, success, failure.
    pub fn to_lines(&self) -> String {
        let fields = [
            ("error", &self.error),
            ("success", &self.success),
            ("failure", &self.failure),
        ];
        fields
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Explores the transitions between every state recorded for `device`.
pub fn explore_transitions(
    store: &dyn StateStore,
    explorer: &mut TransitionExplorer,
    device: &str,
    stop: &StopCondition,
    ctx: &mut ExplorationContext<'_>,
) -> ActionResponse {
    info!(device, ?stop, "explore-transitions");
    let states = match store.list_states(device) {
        Ok(states) => states,
        Err(e) => return ActionResponse::error(e.to_string()),
    };

    match explorer.explore(device, &states, stop, ctx) {
        Err(ExploreError::InsufficientStates { .. }) => ActionResponse::error(
            "No transitions to make. Run 'record-state' several times, with some device \
             configuration changes in between each recorded state before running this command.",
        ),
        Err(e) => ActionResponse::error(e.to_string()),
        Ok(report) if report.is_success() => ActionResponse::success("Completed successfully"),
        Ok(report) => ActionResponse {
            success: None,
            failure: (!report.failed.is_empty()).then(|| report.failure_lines()),
            error: report.aborted.as_ref().map(ToString::to_string),
        },
    }
}

/// Applies one recorded state to `device`.
pub fn transition_to_state(
    store: &dyn StateStore,
    transactor: &mut dyn ConfigTransactor,
    deadline: &mut dyn DeadlineExtender,
    timeout_secs: u64,
    device: &str,
    state: &str,
) -> ActionResponse {
    info!(device, state, "transition-to-state");
    if let Err(e) = store.snapshot_path(device, state) {
        return ActionResponse::error(e.to_string());
    }
    deadline.extend(timeout_secs);
    let outcome = transactor.transition_to(device, state);
    if outcome.is_success() {
        ActionResponse::success("Done")
    } else {
        ActionResponse::failure(outcome.as_str())
    }
}

pub fn list_states(store: &dyn StateStore, device: &str) -> ActionResponse {
    debug!(device, "list-states");
    match store.list_states(device) {
        Ok(states) => ActionResponse::success(format!("Saved device states: {states:?}")),
        Err(e) => ActionResponse::error(e.to_string()),
    }
}

pub fn delete_state(store: &mut dyn StateStore, device: &str, state: &str) -> ActionResponse {
    info!(device, state, "delete-state");
    match store.delete_state(device, state) {
        Ok(()) => ActionResponse::success(format!("Deleted {state}")),
        Err(StoreError::NoSuchState(_)) => ActionResponse::error(format!(
            "Could not delete {}",
            state_name_to_filename(state, device)
        )),
        Err(e) => ActionResponse::error(format!("Could not delete {state}: {e}")),
    }
}

/// Records `snapshot` as `state` of `device`.
pub fn record_state(
    store: &mut dyn StateStore,
    device: &str,
    state: &str,
    snapshot: &[u8],
) -> ActionResponse {
    info!(device, state, bytes = snapshot.len(), "record-state");
    match store.record_state(device, state, snapshot) {
        Ok(_) => ActionResponse::success(format!("Recorded states {:?}", [state])),
        Err(e) => ActionResponse::error(e.to_string()),
    }
}
