//! Content hashes used throughout the data model.
//!
//! Actual signature/hash cryptography is out of scope; these
//! are opaque 32-byte digests that compare, hash, and print as hex the way
//! `simperby_common::crypto::Hash256` does, but without pulling in a real
//! hash function dependency beyond what's needed for test fixtures.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

macro_rules! digest_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "hex_bytes")] pub [u8; 32]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn of(data: impl AsRef<[u8]>) -> Self {
                let mut hasher = Sha3_256::new();
                hasher.update(data.as_ref());
                let mut out = [0u8; 32];
                out.copy_from_slice(&hasher.finalize());
                Self(out)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

digest_newtype!(BlockHash);
digest_newtype!(PayloadHash);
digest_newtype!(OperationHash);
digest_newtype!(ProtocolHash);
digest_newtype!(PublicKeyHash);

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
