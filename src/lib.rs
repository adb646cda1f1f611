//! # pylaunch
//!
//! Picks the installed Python runtime a script asks for (through its `#!` line, a
//! version flag, or configured defaults) and runs it as a transparent stand-in: same
//! standard streams, same exit code, and the child never outlives the launcher.

pub mod cli;
pub mod constants;
pub mod core;
pub mod logging;
pub mod models;
pub mod state;
pub mod system;
