//! `gazecue` - adaptive cued visual-search trial engine
//!
//! A participant looks for a target item among 2 or 4 positions while an
//! on-screen character cues its location with escalating intensity. The
//! crate provides the trial state machine, cue and difficulty adaptation,
//! an in-process event bus, timeout timers, and a session host that wires
//! them together.

pub mod bus;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod cue;
pub mod error;
pub mod machine;
pub mod observability;
pub mod session;
pub mod timers;
