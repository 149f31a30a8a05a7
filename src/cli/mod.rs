//! Command-line interface
//!
//! Argument definitions, operator input parsing, and command handlers.

pub mod args;
pub mod commands;
pub mod input;
