use bikeshare_records::{Bike, BikeStatus};
use bikeshare_storage::LedgerStore;
use tracing::debug;

use super::{conflict, Context, Payload};
use crate::accessor::Accessor;
use crate::config::DiscardPolicy;
use crate::error::WorkflowError;
use crate::numeric::parse_location;

/// TO_REPAIR or REPAIRED back to AVAILABLE.
pub(crate) async fn reactivate_bike<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut bike = tx.require::<Bike>(bike_id).await?;
    match bike.status {
        BikeStatus::ToRepair | BikeStatus::Repaired => {}
        BikeStatus::Discarded => return Err(conflict(format!("Bike {} discarded.", bike_id))),
        BikeStatus::Repairing => return Err(conflict(format!("Bike {} repairing.", bike_id))),
        BikeStatus::Available | BikeStatus::InUse => {
            return Err(conflict(format!("Bike {} active.", bike_id)))
        }
    }
    bike.status = BikeStatus::Available;
    tx.stage(&bike).await?;
    Ok(Payload::new())
}

/// AVAILABLE to DISCARDED. A bike that is already discarded is handled per
/// the configured [`DiscardPolicy`].
pub(crate) async fn discard_bike<S: LedgerStore>(
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut bike = tx.require::<Bike>(bike_id).await?;
    match bike.status {
        BikeStatus::Available => {}
        BikeStatus::InUse | BikeStatus::Repairing => {
            return Err(conflict(format!("Bike {} currently busy.", bike_id)))
        }
        BikeStatus::ToRepair | BikeStatus::Repaired => {
            return Err(conflict(format!("Bike {} not available.", bike_id)))
        }
        BikeStatus::Discarded => {
            return match ctx.config.bikes.discard_discarded {
                DiscardPolicy::Reject => {
                    Err(conflict(format!("Bike {} already discarded.", bike_id)))
                }
                DiscardPolicy::Ignore => {
                    debug!(bike_id, "bike already discarded, nothing to write");
                    Ok(Payload::new())
                }
            };
        }
    }
    bike.status = BikeStatus::Discarded;
    tx.stage(&bike).await?;
    Ok(Payload::new())
}

pub(crate) async fn update_bike_location<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
    longitude: &str,
    latitude: &str,
) -> Result<Payload, WorkflowError> {
    let mut bike = tx.require::<Bike>(bike_id).await?;
    if bike.status == BikeStatus::Discarded {
        return Err(conflict(format!("Bike {} already discarded.", bike_id)));
    }
    bike.location = Some(parse_location(longitude, latitude)?);
    tx.stage(&bike).await?;
    Ok(Payload::new())
}
