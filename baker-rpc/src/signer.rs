use crate::error::Error;
use async_trait::async_trait;
use baker_core::{ChainId, SignerHandle};

/// What kind of content is being signed, so a signer implementation can
/// apply its own high-watermark policy on top of ours if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningKind {
    Block,
    Preendorsement,
    Endorsement,
}

/// The remote signer surface. `unsigned_bytes` is the
/// watermark-tagged payload the caller has already validated against the
/// local high-watermark store before calling this.
#[async_trait]
pub trait Signer: Send + Sync + 'static {
    async fn request_signature(
        &self,
        handle: &SignerHandle,
        chain_id: &ChainId,
        kind: SigningKind,
        unsigned_bytes: &[u8],
    ) -> Result<Vec<u8>, Error>;
}
