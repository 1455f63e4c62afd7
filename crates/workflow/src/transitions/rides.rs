use bikeshare_records::{Bike, BikeStatus, Ride, RideStatus, User, UserStatus};
use bikeshare_storage::LedgerStore;
use rust_decimal::Decimal;
use tracing::debug;

use super::{conflict, ids, Context, Payload};
use crate::accessor::Accessor;
use crate::error::WorkflowError;
use crate::numeric::{parse_location, ride_cost};

/// FREE user with positive balance takes an AVAILABLE bike.
///
/// Creates the ride `{user}-{bike}-{now}` and returns its id.
pub(crate) async fn start_ride<S: LedgerStore>(
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    user_id: &str,
    bike_id: &str,
    longitude: &str,
    latitude: &str,
) -> Result<Payload, WorkflowError> {
    let mut user = tx.require::<User>(user_id).await?;
    if user.status != UserStatus::Free {
        return Err(conflict(format!("User {} has another ongoing ride.", user_id)));
    }
    if user.balance <= Decimal::ZERO {
        return Err(conflict(format!("User {} has non-positive balance.", user_id)));
    }

    let mut bike = tx.require::<Bike>(bike_id).await?;
    if bike.status != BikeStatus::Available {
        return Err(conflict(format!("Bike {} not available.", bike_id)));
    }

    let location = parse_location(longitude, latitude)?;
    let ride_id = ids::allocate::<Ride, _>(
        tx,
        format!("{}-{}-{}", user_id, bike_id, ctx.now),
        ctx.config.ids.collision,
        |id| format!("Ride {} already started.", id),
    )
    .await?;

    let ride = Ride::start(ride_id.clone(), user_id, bike_id, ctx.now, location);
    user.status = UserStatus::InRide;
    user.current_ride_id = Some(ride_id.clone());
    bike.status = BikeStatus::InUse;
    bike.location = Some(location);

    tx.stage(&ride).await?;
    tx.stage(&user).await?;
    tx.stage(&bike).await?;
    debug!(ride_id = %ride_id, user_id, bike_id, "ride staged");
    Ok(ride_id.into_bytes())
}

/// Close the user's ongoing ride on the bike they hold, charge its cost and
/// free both.
pub(crate) async fn end_ride<S: LedgerStore>(
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    user_id: &str,
    bike_id: &str,
    longitude: &str,
    latitude: &str,
) -> Result<Payload, WorkflowError> {
    let mut user = tx.require::<User>(user_id).await?;
    let ride_id = match (&user.status, &user.current_ride_id) {
        (UserStatus::InRide, Some(ride_id)) => ride_id.clone(),
        _ => {
            return Err(conflict(format!(
                "User {} doesn't have an ongoing ride.",
                user_id
            )))
        }
    };

    let mut bike = tx.require::<Bike>(bike_id).await?;
    if bike.status != BikeStatus::InUse {
        return Err(conflict(format!("Bike {} not in use.", bike_id)));
    }

    let mut ride = tx.require::<Ride>(&ride_id).await?;
    if ride.bike_id != bike_id {
        return Err(conflict(format!(
            "Actual bike {} and requested bike {} not match.",
            ride.bike_id, bike_id
        )));
    }
    if ride.status != RideStatus::Ongoing {
        return Err(conflict(format!("Ride {} not ongoing.", ride_id)));
    }

    let location = parse_location(longitude, latitude)?;
    let cost = ride_cost(ride.start_time, ctx.now, &ctx.config.pricing)?;
    let balance = user.balance.checked_sub(cost).ok_or_else(|| {
        WorkflowError::Validation(format!("Balance of user {} overflows.", user_id))
    })?;

    ride.end_time = Some(ctx.now);
    ride.end_location = Some(location);
    ride.cost = cost;
    ride.status = RideStatus::Completed;
    bike.status = BikeStatus::Available;
    bike.location = Some(location);
    user.status = UserStatus::Free;
    user.current_ride_id = None;
    user.balance = balance;

    tx.stage(&ride).await?;
    tx.stage(&bike).await?;
    tx.stage(&user).await?;
    debug!(ride_id = %ride_id, cost = %cost, "ride completion staged");
    Ok(Payload::new())
}
