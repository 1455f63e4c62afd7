use bikeshare_records::{Bike, Repairer, User};
use bikeshare_storage::LedgerStore;

use super::Payload;
use crate::accessor::Accessor;
use crate::error::WorkflowError;
use crate::numeric::parse_balance;

pub(crate) async fn register_user<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    user_id: &str,
    balance: &str,
) -> Result<Payload, WorkflowError> {
    tx.ensure_absent::<User>(user_id, || format!("User {} already registered.", user_id))
        .await?;
    let balance = parse_balance(balance)?;
    tx.stage(&User::new(user_id, balance)).await?;
    Ok(Payload::new())
}

pub(crate) async fn register_repairer<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    repairer_id: &str,
) -> Result<Payload, WorkflowError> {
    tx.ensure_absent::<Repairer>(repairer_id, || {
        format!("Repairer {} already registered.", repairer_id)
    })
    .await?;
    tx.stage(&Repairer::new(repairer_id)).await?;
    Ok(Payload::new())
}

pub(crate) async fn register_bike<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    bike_id: &str,
) -> Result<Payload, WorkflowError> {
    tx.ensure_absent::<Bike>(bike_id, || format!("Bike {} already registered.", bike_id))
        .await?;
    tx.stage(&Bike::new(bike_id)).await?;
    Ok(Payload::new())
}
