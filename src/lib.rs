//! # Bounce Reset
//!
//! > **Reset a contact's email bounce count when one of its emails is opened.**
//!
//! An opened email proves the contact's preferred address delivers mail, so the
//! address's bounce count goes back to zero. The contact store is eventually
//! consistent: the open may arrive before the contact's own write is visible,
//! and two writers may race on the same contact.
//!
//! ## 🏗️ Design
//!
//! ### Two retries, two concerns
//! - **Read-after-write lag**: [`ContactService`](clients::ContactService) looks a
//!   contact up again after a configurable delay, up to an attempt budget. A
//!   contact that never shows up is a skip, not an error.
//! - **Transient store failures**: [`SessionRetry`](retry::SessionRetry) reruns
//!   the whole read-modify-write in a fresh session with backoff. Lost updates
//!   are detected by the store's per-contact versions and retried the same way.
//!
//! ### Outcomes vs. failures
//! [`process`](processors::ResetContactEmailBounceCount::process) returns
//! [`Outcome::Updated`](processors::Outcome::Updated) or one of the two skips;
//! everything else is a [`ProcessError`](processors::ProcessError) that keeps
//! the store error as its `source()`.
//!
//! ### Cancellation
//! Every wait and every store call observes one
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and gives up with
//! a distinct `Cancelled` error that is never retried.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data ([`model`])
//! Contacts, their email facet and the email-opened event.
//!
//! ### 2. The Store ([`store`])
//! An in-memory, eventually consistent [`ContactStore`](store::ContactStore) run
//! as a single Tokio task, its client, sessions, and a scripted
//! [`MockStore`](store::mock::MockStore) for tests.
//!
//! ### 3. The Retries ([`retry`], [`clients`])
//! Policies, the session retry wrapper and the lag-tolerant reader.
//!
//! ### 4. The Processor ([`processors`])
//! The bounce count reset itself.
//!
//! ### 5. The Orchestrator ([`lifecycle`], [`config`])
//! [`EmailOpenedPipeline`](lifecycle::EmailOpenedPipeline) wires everything
//! from a figment-loaded [`Config`](config::Config).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Override the read budget
//! BOUNCE_RESET_READ_RETRY_COUNT=2 RUST_LOG=debug cargo run
//! ```

pub mod clients;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod processors;
pub mod retry;
pub mod store;
