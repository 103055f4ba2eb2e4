//! Prometheus-compatible metrics.
//!
//! Label values are checked against fixed sets so that a corrupt record or
//! a future mode name cannot grow label cardinality without bound.

use std::sync::atomic::{AtomicBool, Ordering};

use legionbot_core::error::LegionBotError;
use legionbot_core::model::{MODE_NAMES, Outcome};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const KNOWN_ACTIONS: [&str; 6] = [
    "send_message",
    "send_foreign_message",
    "delete_message",
    "timeout_user",
    "unban_user",
    "set_emote_only",
];

/// Returns `mode` when it is a registered mode name, `"__unknown__"` otherwise.
#[must_use]
pub fn sanitize_mode_label(mode: &str) -> &str {
    if MODE_NAMES.contains(&mode) {
        mode
    } else {
        "__unknown__"
    }
}

fn sanitize_action_label(action: &str) -> &str {
    if KNOWN_ACTIONS.contains(&action) {
        action
    } else {
        "__unknown__"
    }
}

/// Installs the global metrics recorder.
///
/// With `port` set, a Prometheus listener is bound on `127.0.0.1:<port>`.
///
/// # Errors
///
/// Returns `LegionBotError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), LegionBotError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| LegionBotError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "legionbot_rounds_started_total",
        "Total number of rounds started per mode"
    );
    describe_counter!(
        "legionbot_rounds_finished_total",
        "Total number of rounds finished per mode and outcome"
    );
    describe_counter!(
        "legionbot_outbound_total",
        "Outbound gateway calls by action and status"
    );
    describe_counter!(
        "legionbot_timers_fired_total",
        "Timer callbacks that ran to completion"
    );
    describe_gauge!("legionbot_active_rounds", "Rounds currently running");
}

/// Records a round start.
pub fn record_round_started(mode: &str) {
    counter!("legionbot_rounds_started_total", "mode" => sanitize_mode_label(mode).to_owned())
        .increment(1);
    gauge!("legionbot_active_rounds").increment(1.0);
}

/// Records a round end.
pub fn record_round_finished(mode: &str, outcome: Outcome) {
    counter!(
        "legionbot_rounds_finished_total",
        "mode" => sanitize_mode_label(mode).to_owned(),
        "outcome" => outcome.as_str(),
    )
    .increment(1);
    gauge!("legionbot_active_rounds").decrement(1.0);
}

/// Records a round cleared without an outcome (mute, startup migration).
pub fn record_round_aborted() {
    gauge!("legionbot_active_rounds").decrement(1.0);
}

/// Records an outbound gateway call.
pub fn record_outbound(action: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "legionbot_outbound_total",
        "action" => sanitize_action_label(action).to_owned(),
        "status" => status,
    )
    .increment(1);
}

/// Records a timer callback run.
pub fn record_timer_fired() {
    counter!("legionbot_timers_fired_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_known_modes() {
        for mode in MODE_NAMES {
            assert_eq!(sanitize_mode_label(mode), mode);
        }
    }

    #[test]
    fn sanitize_unknown_mode() {
        assert_eq!(sanitize_mode_label("trapper"), "__unknown__");
        assert_eq!(sanitize_mode_label(""), "__unknown__");
    }

    #[test]
    fn sanitize_unknown_action() {
        assert_eq!(sanitize_action_label("send_message"), "send_message");
        assert_eq!(sanitize_action_label("ban_everyone"), "__unknown__");
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_round_started("legion");
        record_round_finished("legion", Outcome::Success);
        record_round_aborted();
        record_outbound("send_message", false);
        record_timer_fired();
    }
}
