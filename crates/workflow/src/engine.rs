//! The workflow engine: one entry point for every invocation.
//!
//! `invoke` resolves the operation name, authorizes the caller, checks the
//! argument count, then runs the operation inside a single ledger snapshot.
//! The snapshot is committed only when the operation succeeds; any failure
//! aborts it, so a rejected invocation leaves the ledger untouched.

use std::sync::Arc;

use bikeshare_storage::LedgerStore;
use tracing::{debug, info, warn};

use crate::accessor::Accessor;
use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::error::WorkflowError;
use crate::identity::CallerIdentity;
use crate::operation::{Operation, OperationSpec, Registry};
use crate::policy::AccessPolicy;
use crate::query::status_payload;
use crate::transitions::{bikes, issues, registration, repairs, rides, Context, Payload};

pub struct Engine<S: LedgerStore> {
    store: S,
    config: EngineConfig,
    policy: AccessPolicy,
    registry: Registry,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> Engine<S> {
    /// Build an engine over `store`. The configuration is validated first.
    pub fn new(store: S, config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = AccessPolicy::from_config(&config.policy);
        Ok(Self {
            store,
            config,
            policy,
            registry: Registry::standard(),
            clock,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run `function` with `args` on behalf of `caller`.
    ///
    /// Checks happen in this order: operation name, caller identity and
    /// role (skipped in development mode), argument count. No record is
    /// read before all three pass.
    pub async fn invoke<A: AsRef<str> + Sync>(
        &self,
        caller: &dyn CallerIdentity,
        function: &str,
        args: &[A],
    ) -> Result<Vec<u8>, WorkflowError> {
        let spec = self.registry.resolve(function)?;
        if !self.config.dev_mode {
            let organization = caller.organization()?;
            let issuer = caller.issuer_common_name()?;
            if let Err(e) = self.policy.check(&organization, &issuer, &spec.requirement) {
                debug!(operation = spec.name, %organization, %issuer, "caller rejected");
                return Err(e);
            }
        }
        spec.check_arity(args.len())?;
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();

        if let Operation::QueryByStatus(doc_type) = spec.operation {
            return status_payload(&self.store, doc_type, args[0]).await;
        }
        self.transact(spec, &args).await
    }

    async fn transact(&self, spec: &OperationSpec, args: &[&str]) -> Result<Payload, WorkflowError> {
        let ctx = Context {
            config: &self.config,
            now: self.clock.now_unix(),
        };
        let mut snapshot = self.store.begin_snapshot().await?;
        let outcome = {
            let mut tx = Accessor::new(&self.store, &mut snapshot);
            apply(spec.operation, &ctx, &mut tx, args).await
        };

        match outcome {
            Ok(payload) => match self.store.commit_snapshot(snapshot).await {
                Ok(()) => {
                    info!(operation = spec.name, args = ?args, "transition committed");
                    Ok(payload)
                }
                Err(e) => {
                    warn!(operation = spec.name, error = %e, "commit rejected");
                    Err(e.into())
                }
            },
            Err(e) => {
                debug!(operation = spec.name, kind = %e.kind(), error = %e, "transition rejected");
                let _ = self.store.abort_snapshot(snapshot).await;
                Err(e)
            }
        }
    }
}

/// Route a mutating operation to its transition. Arity is already checked.
async fn apply<S: LedgerStore>(
    operation: Operation,
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    args: &[&str],
) -> Result<Payload, WorkflowError> {
    match operation {
        Operation::RegisterUser => registration::register_user(tx, args[0], args[1]).await,
        Operation::RegisterRepairer => registration::register_repairer(tx, args[0]).await,
        Operation::RegisterBike => registration::register_bike(tx, args[0]).await,
        Operation::ReactivateBike => bikes::reactivate_bike(tx, args[0]).await,
        Operation::DiscardBike => bikes::discard_bike(ctx, tx, args[0]).await,
        Operation::UpdateBikeLocation => {
            bikes::update_bike_location(tx, args[0], args[1], args[2]).await
        }
        Operation::StartRide => rides::start_ride(ctx, tx, args[0], args[1], args[2], args[3]).await,
        Operation::EndRide => rides::end_ride(ctx, tx, args[0], args[1], args[2], args[3]).await,
        Operation::ReportIssue => issues::report_issue(ctx, tx, args[0], args[1]).await,
        Operation::AcceptIssue => issues::accept_issue(tx, args[0]).await,
        Operation::RejectIssue => issues::reject_issue(tx, args[0]).await,
        Operation::RequestRepair => repairs::request_repair(ctx, tx, args[0], args[1]).await,
        Operation::AcceptRepair => repairs::accept_repair(tx, args[0], args[1]).await,
        Operation::RejectRepair => repairs::reject_repair(tx, args[0], args[1]).await,
        Operation::CompleteRepair => repairs::complete_repair(tx, args[0], args[1]).await,
        Operation::QueryByStatus(doc_type) => Err(WorkflowError::InvalidOperation(format!(
            "{} queries do not run inside a transaction.",
            doc_type
        ))),
    }
}
