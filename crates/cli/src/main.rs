use std::process::ExitCode;

fn main() -> ExitCode {
    linkbot_cli::run()
}
