use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Prints progress lines to stdout as each stage starts and finishes.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let mut stdout = io::stdout().lock();
        let _ = match event.elapsed {
            Some(elapsed) => writeln!(stdout, "{} ({} ms)", event.message, elapsed.as_millis()),
            None => writeln!(stdout, "{}", event.message),
        };
        let _ = stdout.flush();
    }
}

impl ConsoleOutput {
    pub fn print_run(result: &RunResult) {
        println!("Finished {}", result.date);
        println!(
            "  staged: {} locations, {} emissions, {} mapped locations",
            result.loaded.locations, result.loaded.emissions, result.loaded.mapped_locations
        );
        for output in &result.outputs {
            println!("  {:<18} {} ({} rows)", output.kind, output.path, output.rows);
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
