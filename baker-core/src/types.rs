use crate::hash::PublicKeyHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotone block height.
pub type Level = i32;
/// A round within a level; round 0 is the canonical proposer.
pub type Round = i32;
/// A 0-based index in the committee.
pub type Slot = u32;
/// One unit of committee weight per slot.
pub type VotingPower = u64;
/// Wall-clock instant; round/time arithmetic is expressed in terms of this.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque handle the signer uses to locate a key; resolving key URIs is
/// out of scope so this is carried around uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerHandle(pub String);

/// A public key, compared only via its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub String);

/// A signing identity: an optional alias, a public key, its hash, and an
/// opaque handle used to request signatures. Delegates compare by key hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegate {
    pub alias: Option<String>,
    pub public_key: PublicKey,
    pub public_key_hash: PublicKeyHash,
    pub signer_handle: SignerHandle,
}

impl PartialEq for Delegate {
    fn eq(&self, other: &Self) -> bool {
        self.public_key_hash == other.public_key_hash
    }
}
impl Eq for Delegate {}

impl PartialOrd for Delegate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Delegate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.public_key_hash.cmp(&other.public_key_hash)
    }
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} ({})", alias, self.public_key_hash),
            None => write!(f, "{}", self.public_key_hash),
        }
    }
}

/// Total ordering over blocks used to break ties across competing
/// branches. Tezos-style fitness is a list of
/// byte strings compared lexicographically component-wise, then by length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fitness(pub Vec<Vec<u8>>);

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}
