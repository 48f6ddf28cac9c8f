//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing` subscriber whose level is read
//! from `RUST_LOG`. Module paths are hidden (`with_target(false)`); spans such
//! as `process` and `get_contact_with_retry` show up inline instead.
//!
//! ```bash
//! # Outcomes, commits and store lifecycle
//! RUST_LOG=info cargo run
//!
//! # Also every lookup, skip and staged request
//! RUST_LOG=debug cargo run
//! ```
//!
//! ## Levels
//!
//! - `debug`: each fetch, each "not visible yet" miss, both skip outcomes with
//!   the rendered event (`details=EmailOpen(contact=..., ...)`)
//! - `info`: store start and shutdown, upserts, commits, successful resets
//! - `warn`: rejected commits, session attempts about to be retried
//! - `error`: a bounce count that could not be reset, with the event and the
//!   full store error
//!
//! **With `RUST_LOG=debug`**, an open that arrives before its contact is
//! visible looks like:
//!
//! ```text
//! DEBUG process: Processing args=EmailOpen(contact=demo:alice, message=welcome-1, instance=, opened_at=0)
//! DEBUG process:get_contact_with_retry: Fetch identifier=demo:alice facets=[Emails] found=false
//! DEBUG process:get_contact_with_retry: Contact not visible yet attempt=1 max_attempts=6
//! DEBUG process:get_contact_with_retry: Fetch identifier=demo:alice facets=[Emails] found=true
//! INFO process: Committed size=1
//! INFO process: Bounce count reset identifier=demo:alice version=1
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
