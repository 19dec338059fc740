pub mod api;
pub mod core;
pub mod logging;
pub mod shared;

pub use crate::core::session::Calculator;
pub use crate::shared::errors::{EngineError, EngineResult};
pub use crate::shared::settings::EngineSettings;
pub use crate::shared::types::{EngineCommand, FieldRole, FieldSnapshot};

use serde::Serialize;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::info;

/// One output line of the line-oriented host protocol
#[derive(Serialize)]
#[serde(untagged)]
enum Reply {
    Snapshots(Vec<FieldSnapshot>),
    Error { error: EngineError },
}

/// Drives a catalog calculator over a line protocol.
///
/// Each input line is one JSON `EngineCommand`; each output line is the
/// resulting snapshot array, or `{"error": {...}}` when the command is
/// rejected. Rejected commands leave the calculator untouched and do not
/// stop the loop. Blank lines are skipped.
pub fn run(calculator_id: &str, settings: EngineSettings, input: impl BufRead, mut output: impl Write) -> EngineResult<()> {
    let mut calculator = api::commands::calculator::open_calculator_with(calculator_id, Arc::new(settings))?;
    info!(calculator = calculator_id, "calculator session started");

    writeln!(output, "{}", serde_json::to_string(&calculator.snapshots())?)?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match api::commands::execute_json(&mut calculator, &line) {
            Ok(snapshots) => Reply::Snapshots(snapshots),
            Err(error) => Reply::Error { error },
        };
        writeln!(output, "{}", serde_json::to_string(&reply)?)?;
    }

    output.flush()?;
    Ok(())
}
