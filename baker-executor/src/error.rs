use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] baker_core::Error),

    #[error(transparent)]
    Rpc(#[from] baker_rpc::Error),

    #[error("watermark store failure: {0}")]
    Watermark(String),

    #[error("no own delegate registered for {0}")]
    UnknownDelegate(baker_core::PublicKeyHash),
}

impl From<baker_watermark::StoreError> for Error {
    fn from(e: baker_watermark::StoreError) -> Self {
        Error::Watermark(e.to_string())
    }
}
