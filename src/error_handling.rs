//! Error types shared by every subsystem.
//!
//! Each subsystem owns one enum; [`types::ControllerError`] aggregates them
//! at the command boundary where the process exit code is decided.

pub mod types;
