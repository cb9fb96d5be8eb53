use clap::Parser;
use strongscan::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
