// LinkTerm - Serial and TCP terminal
use clap::Parser;
use linkterm::cli::{execute_command, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    match execute_command(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
