//! Pure data structures shared by the store, the session and the processors.

pub mod contact;
pub mod email;
pub mod event;

pub use contact::*;
pub use email::*;
pub use event::*;
