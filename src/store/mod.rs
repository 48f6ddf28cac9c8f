//! Contact store access.
//!
//! # Main Components
//!
//! - [`ContactStore`] - In-memory, eventually consistent store served by one task
//! - [`StoreClient`] - Cloneable handle speaking the [`StoreRequest`] protocol
//! - [`StoreSession`] / [`ClientSession`] - Unit of work: direct reads, staged writes
//! - [`SessionFactory`] - Opens sessions; implemented by [`StoreClient`]
//! - [`StoreError`] - Every failure a store interaction can report
//!
//! # Testing
//!
//! See [`mock`] for a scripted store that speaks the same protocol.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod session;

pub use actor::{ContactStore, StoreOptions};
pub use client::StoreClient;
pub use error::StoreError;
pub use message::{Operation, Response, StoreRequest};
pub use session::{ClientSession, SessionFactory, StoreSession};
