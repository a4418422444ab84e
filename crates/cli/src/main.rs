use std::process::ExitCode;

fn main() -> ExitCode {
    clientpulse_cli::run()
}
