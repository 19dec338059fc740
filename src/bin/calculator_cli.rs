// Line-protocol host: `calculator-cli <calculator-id>` or `calculator-cli --list`

use calculator_widgets_lib::api::commands::list_calculators;
use calculator_widgets_lib::logging::init_logging;
use calculator_widgets_lib::{run, EngineResult, EngineSettings};
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    match start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[calculator-cli] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn start() -> EngineResult<()> {
    let settings = EngineSettings::from_env()?;
    init_logging(&settings)?;

    match std::env::args().nth(1).as_deref() {
        None | Some("--list") => {
            println!("{}", serde_json::to_string_pretty(&list_calculators()?)?);
            Ok(())
        }
        Some(id) => run(id, settings, io::stdin().lock(), io::stdout().lock()),
    }
}
