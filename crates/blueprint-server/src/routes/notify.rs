use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use blueprint_core::ledger::Transaction;
use blueprint_hub::{CommitReport, CommittedTransaction};

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/notify: a transaction was committed by the replication layer.
///
/// The transaction is recorded so it can serve as the next action's
/// predecessor, then the commit hook resolves and fans out.
pub async fn notify_commit(
    State(app): State<AppState>,
    Json(commit): Json<CommittedTransaction>,
) -> Result<(StatusCode, Json<CommitReport>), AppError> {
    commit.validate()?;
    let mut tx = Transaction::new(&commit.transaction_id, &commit.blueprint_id);
    tx.sender = commit.sender.clone();
    app.ledger.record_transaction(tx)?;

    tracing::info!(
        tx = %commit.transaction_id,
        blueprint = %commit.blueprint_id,
        "transaction committed"
    );

    let report = app.hook.handle(&commit).await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}
