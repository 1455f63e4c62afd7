use bikeshare_workflow::{OperationSpec, Registry};

use crate::OutputFormat;

pub(crate) fn cmd_operations(output: OutputFormat, quiet: bool) {
    let registry = Registry::standard();
    match output {
        OutputFormat::Json => {
            let ops: Vec<serde_json::Value> = registry.iter().map(describe).collect();
            let doc = serde_json::Value::Array(ops);
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{:<20} {:<26} {:<6} ARGUMENTS", "OPERATION", "ROLE", "ARITY");
            }
            for spec in registry.iter() {
                println!(
                    "{:<20} {:<26} {:<6} {}",
                    spec.name,
                    spec.requirement.label(),
                    spec.arity(),
                    spec.schema_label()
                );
            }
        }
    }
}

fn describe(spec: &OperationSpec) -> serde_json::Value {
    let roles: Vec<&str> = spec.requirement.roles().iter().map(|r| r.as_str()).collect();
    serde_json::json!({
        "name": spec.name,
        "roles": roles,
        "arity": spec.arity(),
        "arguments": spec.schema,
        "query": spec.operation.is_query(),
    })
}
