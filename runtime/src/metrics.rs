//! Metric names and descriptions emitted by the store runtime.
//!
//! The runtime records through the [`metrics`] facade only; installing a
//! recorder (Prometheus, statsd, ...) is up to the application. Call
//! [`describe_metrics`] once after installing one so exporters can show units
//! and help text.
//!
//! # Example
//!
//! ```
//! composable_runtime::metrics::describe_metrics();
//! ```

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Actions reduced by a store, whether sent by callers or fed back by effects
pub const ACTIONS_TOTAL: &str = "store.actions.total";
/// Actions dropped because the effect that produced them was cancelled
pub const ACTIONS_DROPPED: &str = "store.actions.dropped";
/// Time spent inside the reducer for one action
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";
/// Effects started, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";
/// Effect tasks cancelled through their cancellation id
pub const EFFECTS_CANCELLED: &str = "store.effects.cancelled";
/// Fallible effects that returned an error
pub const EFFECTS_FAILED: &str = "store.effects.failed";
/// Effect tasks currently running
pub const EFFECTS_IN_FLIGHT: &str = "store.effects.in_flight";
/// Shutdowns initiated
pub const SHUTDOWN_INITIATED: &str = "store.shutdown.initiated";
/// Shutdowns that drained every effect in time
pub const SHUTDOWN_COMPLETED: &str = "store.shutdown.completed";
/// Shutdowns that gave up waiting for effects
pub const SHUTDOWN_TIMEOUT: &str = "store.shutdown.timeout";
/// Actions rejected because the store was shutting down
pub const SHUTDOWN_REJECTED_ACTIONS: &str = "store.shutdown.rejected_actions";

/// Register descriptions for every metric the runtime emits
///
/// Safe to call more than once.
pub fn describe_metrics() {
    describe_counter!(ACTIONS_TOTAL, Unit::Count, "Actions reduced by a store");
    describe_counter!(
        ACTIONS_DROPPED,
        Unit::Count,
        "Actions dropped because their effect was cancelled"
    );
    describe_histogram!(REDUCER_DURATION, Unit::Seconds, "Reducer execution time per action");
    describe_counter!(EFFECTS_EXECUTED, Unit::Count, "Effects started, by type");
    describe_counter!(EFFECTS_CANCELLED, Unit::Count, "Effect tasks cancelled by id");
    describe_counter!(EFFECTS_FAILED, Unit::Count, "Fallible effects that returned an error");
    describe_gauge!(EFFECTS_IN_FLIGHT, Unit::Count, "Effect tasks currently running");
    describe_counter!(SHUTDOWN_INITIATED, Unit::Count, "Graceful shutdowns initiated");
    describe_counter!(SHUTDOWN_COMPLETED, Unit::Count, "Graceful shutdowns completed");
    describe_counter!(SHUTDOWN_TIMEOUT, Unit::Count, "Graceful shutdowns that timed out");
    describe_counter!(
        SHUTDOWN_REJECTED_ACTIONS,
        Unit::Count,
        "Actions rejected during shutdown"
    );
}
