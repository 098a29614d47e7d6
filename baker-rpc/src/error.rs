use thiserror::Error;

/// Errors surfaced by the node RPC, the remote signer, and extra-operation
/// fetchers.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("node connection lost")]
    NodeConnectionLost,

    #[error("node RPC call failed: {0}")]
    NodeRpc(String),

    #[error("remote signer rejected the request: {0}")]
    SignerRejected(String),

    #[error("failed to fetch extra operations from {path}: {reason}")]
    ExtraOperationsFetch { path: String, reason: String },
}

impl From<Error> for baker_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NodeConnectionLost => baker_core::Error::NodeConnectionLost,
            Error::NodeRpc(reason) => baker_core::Error::MempoolFetchFailed { path: "node".into(), reason },
            Error::SignerRejected(reason) => baker_core::Error::SignerRejected(reason),
            Error::ExtraOperationsFetch { path, reason } => {
                baker_core::Error::MempoolFetchFailed { path, reason }
            }
        }
    }
}
