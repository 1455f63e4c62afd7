use std::path::Path;
use std::process;

use bikeshare_workflow::EngineConfig;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_check_config(file: &Path, output: OutputFormat, quiet: bool) {
    let config = match EngineConfig::load(file) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "file": file.display().to_string(),
                "valid": true,
                "config": config,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string())
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{}: valid", file.display());
                println!("  dev_mode          = {}", config.dev_mode);
                println!("  rate_per_minute   = {}", config.pricing.rate_per_minute);
                println!("  cost_scale        = {}", config.pricing.cost_scale);
                println!("  ids.collision     = {}", config.ids.collision.as_str());
                println!("  discard_discarded = {}", config.bikes.discard_discarded.as_str());
            }
        }
    }
}
