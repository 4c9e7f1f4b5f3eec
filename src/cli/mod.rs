pub mod interpreter;
pub mod output;
mod shell;

pub use interpreter::{CommandLineInterface, CommandLineInterpreter, SessionStore};
pub use output::ConsoleView;
pub use shell::{run_cli, run_cli_with_mode, CliError, CliMode, SCRIPT_ENV};
