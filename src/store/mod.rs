mod movies;
mod ratings;

use std::future::Future;

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub use movies::MovieStore;
pub use ratings::RatingStore;

use crate::error::{StoreError, StoreResult};

/// Races a database future against the caller's cancellation token.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, DbErr>>,
) -> StoreResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        res = fut => res.map_err(StoreError::from),
    }
}

pub(crate) async fn begin(
    db: &DatabaseConnection,
    cancel: &CancellationToken,
) -> StoreResult<DatabaseTransaction> {
    cancellable(cancel, db.begin()).await
}

/// Commits when the body reported exactly-one-row success and the caller is
/// still waiting; rolls back otherwise.
pub(crate) async fn settle(
    txn: DatabaseTransaction,
    cancel: &CancellationToken,
    outcome: StoreResult<bool>,
) -> StoreResult<bool> {
    match outcome {
        Ok(true) if !cancel.is_cancelled() => {
            txn.commit().await?;
            Ok(true)
        },
        Ok(true) => {
            txn.rollback().await?;
            Err(StoreError::Cancelled)
        },
        Ok(false) => {
            txn.rollback().await?;
            Ok(false)
        },
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        },
    }
}
