use crate::error::Error;
use async_trait::async_trait;
use baker_core::OperationHash;

/// Fetches the "extra operations" a forge step pulls in beyond the
/// node's own mempool. Implementations
/// (file, HTTP) are expected to apply their own bounded timeout and treat a timeout as a fetch
/// failure rather than blocking the baking timer.
#[async_trait]
pub trait ExtraOperationsSource: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Vec<OperationHash>, Error>;
}
