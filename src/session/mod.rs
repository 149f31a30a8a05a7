//! Session hosting
//!
//! [`SessionHost`] is the synchronous owner of one participant session;
//! [`SessionRunner`] drives a host on tokio, feeding it configuration,
//! timer deadlines and operator input one at a time.

pub mod host;
pub mod runner;

pub use host::{JournalEntry, SessionHost};
pub use runner::{Dispatcher, SessionHandle, SessionRunner, SessionSummary};
