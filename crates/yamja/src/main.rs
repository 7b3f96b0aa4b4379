use std::process::ExitCode;

use clap::Parser;
use yamja::cli::Cli;
use yamja::env::RealEnv;
use yamja::{diagnostic, logging};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Help and version go to stdout and are not failures.
            return if err.use_stderr() {
                ExitCode::from(diagnostic::EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    logging::init(cli.options.verbose);

    let mut stdout = std::io::stdout().lock();
    match yamja::run(cli, &RealEnv, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => diagnostic::report(&err),
    }
}
