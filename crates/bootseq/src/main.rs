//! `bootseq` binary: waits for dependencies, writes the runtime
//! configuration and replaces itself with the server.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match bootseq::run_boot() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            if error.precedes_telemetry() {
                let _ = writeln!(io::stderr(), "bootseq: {error}");
            }
            error.into()
        }
    }
}
