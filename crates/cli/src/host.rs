//! Engine assembly shared by `invoke` and `replay`.

use std::sync::Arc;

use bikeshare_storage::MemoryLedger;
use bikeshare_workflow::identity::extraction_failed;
use bikeshare_workflow::{CallerIdentity, Clock, Engine, EngineConfig, WorkflowError};

use crate::ledger_file::{self, LedgerFile};
use crate::EngineArgs;

/// The caller as given on the command line or in a replay step.
#[derive(Debug, Clone, Default)]
pub(crate) struct CliCaller {
    pub org: Option<String>,
    pub issuer: Option<String>,
}

impl CliCaller {
    pub fn new(org: Option<&str>, issuer: Option<&str>) -> Self {
        Self {
            org: org.map(str::to_string),
            issuer: issuer.map(str::to_string),
        }
    }
}

impl CallerIdentity for CliCaller {
    fn organization(&self) -> Result<String, WorkflowError> {
        self.org
            .clone()
            .ok_or_else(|| extraction_failed("no caller organization given (--org)"))
    }

    fn issuer_common_name(&self) -> Result<String, WorkflowError> {
        self.issuer
            .clone()
            .ok_or_else(|| extraction_failed("no certificate issuer given (--issuer)"))
    }
}

/// Engine configuration from `--config`, or defaults. `--dev` forces
/// development mode on; it never turns it off.
pub(crate) fn engine_config(args: &EngineArgs) -> Result<EngineConfig, String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::new(false),
    };
    if args.dev {
        config.dev_mode = true;
    }
    Ok(config)
}

/// Lock and open the ledger file and build an engine over it. The ledger
/// stays locked until the returned [`LedgerFile`] is dropped.
pub(crate) fn build_engine(
    args: &EngineArgs,
    clock: Arc<dyn Clock>,
) -> Result<(Engine<MemoryLedger>, LedgerFile), String> {
    let config = engine_config(args)?;
    let (file, ledger) = ledger_file::open(&args.ledger)?;
    let engine = Engine::new(ledger, config, clock).map_err(|e| e.to_string())?;
    Ok((engine, file))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("error: could not start async runtime: {}", e))
}

/// `conflict error: Bike b1 not available.`
pub(crate) fn describe(err: &WorkflowError) -> String {
    format!("{} error: {}", err.kind(), err)
}
