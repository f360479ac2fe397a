use shared_types::entities::Transaction;
use shared_types::ipc::SubmitOutcome;

use crate::domain::errors::PipelineError;

pub trait TransactionPipelineApi: Send + Sync {
    /// Stages 1-4 inline: ingress validation, leader-forwarding decision,
    /// pre-batch validation, and enqueue onto the open batch. Returns
    /// once the transaction has been accepted into a batch or forwarded
    /// — not once it has committed (commit outcome arrives later over
    /// the notification channel).
    fn submit(&self, tx: Transaction) -> Result<SubmitOutcome, PipelineError>;

    /// Drive stages 5-7 for anything the Consensus Engine has newly
    /// committed: hand to the engine's take/ack cycle, apply to the
    /// store, and notify. Intended to be polled by a background task.
    fn drain_committed(&self) -> Result<usize, PipelineError>;
}
