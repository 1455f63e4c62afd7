use bikeshare_records::{Issue, IssueStatus, Ride, RideStatus, User};
use bikeshare_storage::LedgerStore;

use super::{conflict, ids, Context, Payload};
use crate::accessor::Accessor;
use crate::error::WorkflowError;

/// Open an issue against the caller's COMPLETED ride. Returns the issue id.
pub(crate) async fn report_issue<S: LedgerStore>(
    ctx: &Context<'_>,
    tx: &mut Accessor<'_, S>,
    user_id: &str,
    ride_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut ride = tx.require::<Ride>(ride_id).await?;
    if ride.user_id != user_id {
        return Err(conflict(format!(
            "Actual user {} and requested user {} not match.",
            ride.user_id, user_id
        )));
    }
    if ride.status != RideStatus::Completed {
        return Err(conflict(format!("Ride {} not completed.", ride_id)));
    }

    let issue_id = ids::allocate::<Issue, _>(
        tx,
        format!("{}-{}", ride_id, ctx.now),
        ctx.config.ids.collision,
        |id| format!("Issue {} already opened.", id),
    )
    .await?;

    let issue = Issue::open(issue_id.clone(), user_id, ride.bike_id.clone(), ride_id);
    ride.status = RideStatus::IssueOpen;

    tx.stage(&issue).await?;
    tx.stage(&ride).await?;
    Ok(issue_id.into_bytes())
}

/// Close the issue in the user's favour: refund the ride cost.
pub(crate) async fn accept_issue<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    issue_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut issue = open_issue(tx, issue_id).await?;
    let mut user = tx.require::<User>(&issue.user_id).await?;
    let mut ride = ride_under_issue(tx, &issue).await?;

    user.balance = user.balance.checked_add(ride.cost).ok_or_else(|| {
        WorkflowError::Validation(format!("Balance of user {} overflows.", user.id))
    })?;
    ride.cost = rust_decimal::Decimal::ZERO;
    ride.status = RideStatus::IssueClosed;
    issue.status = IssueStatus::Closed;

    tx.stage(&issue).await?;
    tx.stage(&user).await?;
    tx.stage(&ride).await?;
    Ok(Payload::new())
}

/// Close the issue without a refund.
pub(crate) async fn reject_issue<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    issue_id: &str,
) -> Result<Payload, WorkflowError> {
    let mut issue = open_issue(tx, issue_id).await?;
    let mut ride = ride_under_issue(tx, &issue).await?;

    ride.status = RideStatus::IssueClosed;
    issue.status = IssueStatus::Closed;

    tx.stage(&issue).await?;
    tx.stage(&ride).await?;
    Ok(Payload::new())
}

async fn open_issue<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    issue_id: &str,
) -> Result<Issue, WorkflowError> {
    let issue = tx.require::<Issue>(issue_id).await?;
    if issue.status != IssueStatus::Open {
        return Err(conflict(format!("Issue {} not open.", issue_id)));
    }
    Ok(issue)
}

async fn ride_under_issue<S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    issue: &Issue,
) -> Result<Ride, WorkflowError> {
    let ride = tx.require::<Ride>(&issue.ride_id).await?;
    if ride.status != RideStatus::IssueOpen {
        return Err(conflict(format!(
            "Ride {} not associated with an issue.",
            issue.ride_id
        )));
    }
    Ok(ride)
}
