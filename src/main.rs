use std::process::ExitCode;

use colored::Colorize;
use shapecodec::cli::CommandLineInterface;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let command_line_interface = CommandLineInterface::load();

    // RUST_LOG wins over --verbose
    let default = if command_line_interface.verbose() { "shapecodec=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    match command_line_interface.run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
