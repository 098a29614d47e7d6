use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Executor(#[from] baker_executor::Error),

    #[error(transparent)]
    Rpc(#[from] baker_rpc::Error),

    #[error("node connection lost")]
    NodeConnectionLost,
}
