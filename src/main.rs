use clap::Parser;
use takane::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
