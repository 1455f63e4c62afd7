//! Scripted invocations against one ledger file.
//!
//! A script is a JSON array of steps. Each step names an operation, its
//! arguments, optionally the caller, and optionally the Unix time at which
//! it runs. Steps without `at` run at the time of the previous step. The
//! ledger file is written only when every step succeeds.

use std::path::Path;
use std::process;
use std::sync::Arc;

use bikeshare_workflow::{Clock, ManualClock, SystemClock};
use serde::Deserialize;

use super::{payload_text, payload_value};
use crate::host::{self, CliCaller};
use crate::{report_error, EngineArgs, OutputFormat};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Step {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub at: Option<i64>,
}

pub(crate) fn parse_script(content: &str) -> Result<Vec<Step>, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

pub(crate) fn cmd_replay(
    script_path: &Path,
    engine_args: &EngineArgs,
    output: OutputFormat,
    quiet: bool,
) {
    let content = match std::fs::read_to_string(script_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading script '{}': {}", script_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let steps = match parse_script(&content) {
        Ok(steps) => steps,
        Err(e) => {
            let msg = format!("error parsing script '{}': {}", script_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let rt = match host::runtime() {
        Ok(rt) => rt,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let clock = Arc::new(ManualClock::new(SystemClock.now_unix()));
    let (engine, file) = match host::build_engine(engine_args, clock.clone()) {
        Ok(built) => built,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut results = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        if let Some(at) = step.at {
            clock.set(at);
        }
        let is_query = engine
            .registry()
            .lookup(&step.function)
            .is_some_and(|spec| spec.operation.is_query());
        let caller = CliCaller::new(step.org.as_deref(), step.issuer.as_deref());

        let invocation = engine.invoke(&caller, &step.function, step.args.as_slice());
        let payload = match rt.block_on(invocation) {
            Ok(payload) => payload,
            Err(e) => {
                let msg = format!(
                    "step {} ({}): {}",
                    number,
                    step.function,
                    host::describe(&e)
                );
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        };
        tracing::debug!(step = number, function = %step.function, "replay step done");

        match output {
            OutputFormat::Json => results.push(serde_json::json!({
                "step": number,
                "function": step.function,
                "payload": payload_value(&payload, is_query),
            })),
            OutputFormat::Text => {
                if !quiet {
                    let shown = if payload.is_empty() {
                        "ok".to_string()
                    } else {
                        payload_text(&payload, is_query)
                    };
                    println!("{}. {}: {}", number, step.function, shown);
                }
            }
        }
    }

    if let Err(msg) = file.save(engine.store()) {
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    match output {
        OutputFormat::Json => {
            let doc = serde_json::Value::Array(results);
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{} step(s) committed to {}", steps.len(), file.path().display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_default_optional_fields() {
        let steps = parse_script(r#"[{"function": "registerBike", "args": ["b1"]}]"#).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].args, ["b1"]);
        assert!(steps[0].org.is_none());
        assert!(steps[0].at.is_none());
    }

    #[test]
    fn unknown_step_fields_are_rejected() {
        let err = parse_script(r#"[{"function": "registerBike", "when": 5}]"#).unwrap_err();
        assert!(err.contains("unknown field"), "{err}");
    }
}
