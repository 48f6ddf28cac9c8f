//! Processors of the email-opened pipeline.
//!
//! Each processor handles one concern for an already identified contact and
//! reports either an outcome or a [`ProcessError`].

pub mod error;
pub mod reset_bounce_count;

pub use error::ProcessError;
pub use reset_bounce_count::{Outcome, ResetContactEmailBounceCount};
