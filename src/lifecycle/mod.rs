//! Pipeline startup, shutdown and observability.

pub mod pipeline;
pub mod tracing;

pub use self::pipeline::EmailOpenedPipeline;
pub use self::tracing::setup_tracing;
