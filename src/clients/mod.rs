//! Domain-level wrappers over store sessions.

pub mod contact_service;

pub use contact_service::*;
