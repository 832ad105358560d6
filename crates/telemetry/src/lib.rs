//! Logging and metrics setup for the reasoner service.

pub mod metrics;
pub mod tracing_layer;

pub use self::metrics::{
    setup_metrics_recorder, track_request, track_run, track_submission, track_task,
};
pub use tracing_layer::{build_filter, configure_tracing};
