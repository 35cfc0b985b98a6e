//! Mirrors device outcomes into `hardware.*`.

use serde_json::{json, Value};

use crate::device::{ConnectReport, DispatchOutcome};
use crate::state::StateStore;

/// Record which controllers are live after a connect pass.
pub fn record_connect(store: &StateStore, report: &ConnectReport) {
    store.update([
        ("hardware.connected", json!(report.live_count() > 0)),
        ("hardware.live_count", json!(report.live_count())),
        (
            "hardware.endpoints",
            serde_json::to_value(report).unwrap_or(Value::Null),
        ),
    ]);
}

/// Record the last command and how it was delivered.
pub fn record_dispatch(store: &StateStore, command: &str, outcome: &DispatchOutcome) {
    let motor_status = match outcome {
        DispatchOutcome::Sent(_) => "dispatched",
        DispatchOutcome::DryRun { .. } => "dry_run",
    };
    store.update([
        ("hardware.last_command", json!(command)),
        ("hardware.motor_status", json!(motor_status)),
        (
            "hardware.last_dispatch",
            serde_json::to_value(outcome).unwrap_or(Value::Null),
        ),
    ]);
}
