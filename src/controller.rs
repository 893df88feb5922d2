//! Command-line surface: argument parsing, tagged console output, and the
//! [`Controller`](controller_handler::Controller) that dispatches one action.

pub mod cli;
pub mod console;
pub mod controller_handler;

pub use cli::{parse_args, Action, Cli, Invocation};
pub use console::Console;
pub use controller_handler::Controller;
