use crate::app::RunRecord;
use crate::azure::FetchError;
use async_trait::async_trait;

#[async_trait]
pub trait RunService: Send + Sync {
    /// Runs for one definition, or for every definition when `None`, in
    /// upstream order.
    async fn fetch_runs(&self, definition_id: Option<u32>) -> Result<Vec<RunRecord>, FetchError>;
    async fn cancel_run(&self, run_id: u64) -> Result<(), FetchError>;
}
