//! parfor demo entry point.
//!
//! Thin dispatcher: loads `PARFOR_*` environment defaults, initializes
//! logging, and hands the argument list to the compression demo.

use std::process::ExitCode;

use parfor::telemetry;
use parfor::{cli, config};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("help" | "--help" | "-h") => {
            cli::print_usage();
            if args.len() < 2 {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Some("version" | "--version" | "-V") => {
            println!("parfor {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Some(_) => {
            let defaults = config::load();
            if let Err(err) = telemetry::init_logging(&defaults.log) {
                eprintln!("logging setup failed: {err}");
                return ExitCode::FAILURE;
            }
            let parsed = match cli::parse_args(&args[1..], &defaults) {
                Ok(parsed) => parsed,
                Err(err) => {
                    eprintln!("error: {err}\n");
                    cli::print_usage();
                    return ExitCode::FAILURE;
                }
            };
            ExitCode::from(cli::run_compress(&parsed) as u8)
        }
    }
}
