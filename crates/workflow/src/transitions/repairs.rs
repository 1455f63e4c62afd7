use bikeshare_records::{Bike, BikeStatus, Repair, RepairStatus, Repairer};
use bikeshare_storage::LedgerStore;

use super::{conflict, ids, Context, Payload};
use crate::accessor::Accessor;
use crate::error::WorkflowError;

/// Send an AVAILABLE bike to a registered repairer. Returns the repair id.
pub(crate) async fn request_repair<S: LedgerStore>(
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
    repairer_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut bike = tx.require::<Bike>(bike_id).await?;
    if bike.status != BikeStatus::Available {
        return Err(conflict(format!("Bike {} not available.", bike_id)));
    }
    tx.require::<Repairer>(repairer_id).await?;

    let repair_id = ids::allocate::<Repair, _>(
        tx,
        format!("{}-{}-{}", bike_id, repairer_id, ctx.now),
        ctx.config.ids.collision,
        |id| format!("Repair {} already requested.", id),
    )
    .await?;

    let repair = Repair::request(repair_id.clone(), bike_id, repairer_id);
    bike.status = BikeStatus::ToRepair;

    tx.stage(&repair).await?;
    tx.stage(&bike).await?;
    Ok(repair_id.into_bytes())
}

pub(crate) async fn accept_repair<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    repairer_id: &str,
    repair_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut repair = assigned_repair(tx, repairer_id, repair_id).await?;
    if repair.status != RepairStatus::Requested {
        return Err(conflict(format!("Repair {} already processed.", repair_id)));
    }
    let mut bike =
        bike_in(tx, &repair.bike_id, BikeStatus::ToRepair, "not ready to repair").await?;

    repair.status = RepairStatus::Accepted;
    bike.status = BikeStatus::Repairing;

    tx.stage(&repair).await?;
    tx.stage(&bike).await?;
    Ok(Payload::new())
}

/// Decline a requested repair. The bike stays TO_REPAIR; `reactivateBike`
/// returns it to service.
pub(crate) async fn reject_repair<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    repairer_id: &str,
    repair_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut repair = assigned_repair(tx, repairer_id, repair_id).await?;
    if repair.status != RepairStatus::Requested {
        return Err(conflict(format!("Repair {} already processed.", repair_id)));
    }
    bike_in(tx, &repair.bike_id, BikeStatus::ToRepair, "not ready to repair").await?;

    repair.status = RepairStatus::Rejected;
    tx.stage(&repair).await?;
    Ok(Payload::new())
}

pub(crate) async fn complete_repair<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    repairer_id: &str,
    repair_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut repair = assigned_repair(tx, repairer_id, repair_id).await?;
    if repair.status != RepairStatus::Accepted {
        return Err(conflict(format!("Repair {} not accepted.", repair_id)));
    }
    let mut bike =
        bike_in(tx, &repair.bike_id, BikeStatus::Repairing, "not repairing").await?;

    repair.status = RepairStatus::Completed;
    bike.status = BikeStatus::Repaired;

    tx.stage(&repair).await?;
    tx.stage(&bike).await?;
    Ok(Payload::new())
}

/// Load a repair after checking the named repairer exists and owns it.
async fn assigned_repair<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    repairer_id: &str,
    repair_id: &str,
) -> Result<Repair, WorkflowError> {
    tx.require::<Repairer>(repairer_id).await?;
    let repair = tx.require::<Repair>(repair_id).await?;
    if repair.repairer_id != repairer_id {
        return Err(conflict(format!(
            "Actual repairer {} and requested repairer {} not match.",
            repair.repairer_id, repairer_id
        )));
    }
    Ok(repair)
}

async fn bike_in<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
    expected: BikeStatus,
    otherwise: &str,
) -> Result<Bike, WorkflowError> {
    let bike = tx.require::<Bike>(bike_id).await?;
    if bike.status != expected {
        return Err(conflict(format!("Bike {} {}.", bike_id, otherwise)));
    }
    Ok(bike)
}
