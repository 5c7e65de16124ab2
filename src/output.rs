use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::batch::{BatchResult, ProgressEvent, ProgressSink};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_batch(result: &BatchResult) -> io::Result<()> {
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

/// Reports each finished pair through `tracing`.
pub struct LogOutput;

impl ProgressSink for LogOutput {
    fn event(&self, event: ProgressEvent) {
        let elapsed_ms = event
            .elapsed
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        info!(remaining = event.remaining, elapsed_ms, "{}", event.message);
    }
}
