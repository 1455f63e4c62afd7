use std::process;
use std::sync::Arc;

use bikeshare_workflow::SystemClock;

use super::{payload_text, payload_value};
use crate::host::{self, CliCaller};
use crate::ledger_file::LedgerFile;
use crate::{report_error, EngineArgs, OutputFormat};

pub(crate) fn cmd_invoke(
    function: &str,
    args: &[String],
    engine_args: &EngineArgs,
    org: Option<&str>,
    issuer: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let rt = match host::runtime() {
        Ok(rt) => rt,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let (engine, file) = match host::build_engine(engine_args, Arc::new(SystemClock)) {
        Ok(built) => built,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let is_query = engine
        .registry()
        .lookup(function)
        .is_some_and(|spec| spec.operation.is_query());
    let caller = CliCaller::new(org, issuer);

    let payload = match rt.block_on(engine.invoke(&caller, function, args)) {
        Ok(payload) => payload,
        Err(e) => {
            report_error(&host::describe(&e), output, quiet);
            process::exit(1);
        }
    };

    if !is_query {
        persist(&file, engine.store(), output, quiet);
    }

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "function": function,
                "payload": payload_value(&payload, is_query),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string())
            );
        }
        OutputFormat::Text => {
            if !payload.is_empty() {
                println!("{}", payload_text(&payload, is_query));
            } else if !quiet {
                println!("{}: ok", function);
            }
        }
    }
}

fn persist(
    file: &LedgerFile,
    ledger: &bikeshare_storage::MemoryLedger,
    output: OutputFormat,
    quiet: bool,
) {
    if let Err(msg) = file.save(ledger) {
        report_error(&msg, output, quiet);
        process::exit(1);
    }
}
