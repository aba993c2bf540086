//! # Ledger Entities
//!
//! Primitive ledger shapes consumed by the extension orchestrator.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`, `EncryptedPayloadHash`
//! - **Chain**: `Log`, `Transaction`, `SubmittedTransaction`

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::errors::ParseError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Defines a fixed-width byte identifier rendered as `0x`-prefixed hex.
///
/// The hex form is also the serde form so the type can key a JSON object.
macro_rules! hex_identifier {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Build from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
                    kind: stringify!($name),
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(array))
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True when every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex {
                    kind: stringify!($name),
                    reason: e.to_string(),
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_identifier!(
    /// A 20-byte account or contract address.
    Address,
    20
);

hex_identifier!(
    /// A 32-byte hash (block hash, transaction hash, event topic).
    Hash,
    32
);

impl Hash {
    /// Keccak-256 digest of `data`.
    ///
    /// Event topics are the Keccak-256 of the canonical event signature.
    pub fn keccak256(data: impl AsRef<[u8]>) -> Self {
        let digest = Keccak256::digest(data.as_ref());
        Self(digest.into())
    }
}

/// Handle of an encrypted payload stored in the private transaction manager.
///
/// Private transactions carry this handle as their data, so it is also the
/// lookup key for the payload's participants.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptedPayloadHash(pub [u8; 64]);

impl EncryptedPayloadHash {
    /// Width in bytes.
    pub const LEN: usize = 64;

    /// Build from arbitrary bytes: longer input keeps its trailing 64 bytes,
    /// shorter input is left-padded with zeroes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let tail = if bytes.len() > Self::LEN {
            &bytes[bytes.len() - Self::LEN..]
        } else {
            bytes
        };
        let mut out = [0u8; 64];
        out[Self::LEN - tail.len()..].copy_from_slice(tail);
        Self(out)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Standard base64 form used by the transaction manager's API.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl Default for EncryptedPayloadHash {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for EncryptedPayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for EncryptedPayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedPayloadHash({})", self.to_base64())
    }
}

impl FromStr for EncryptedPayloadHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64.decode(s).map_err(|e| ParseError::InvalidBase64 {
            kind: "EncryptedPayloadHash",
            reason: e.to_string(),
        })?;
        if bytes.len() != Self::LEN {
            return Err(ParseError::InvalidLength {
                kind: "EncryptedPayloadHash",
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self::from_bytes(&bytes))
    }
}

impl Serialize for EncryptedPayloadHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for EncryptedPayloadHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// A contract log as delivered by a filtered log subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    /// Contract that emitted the log.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature topic.
    pub topics: Vec<Hash>,
    /// ABI-encoded non-indexed event arguments.
    pub data: Vec<u8>,
    /// Height of the including block.
    pub block_number: u64,
    /// Hash of the including block.
    pub block_hash: Hash,
    /// Hash of the transaction that emitted the log.
    pub tx_hash: Hash,
    /// Set when the log was reverted by a chain reorganisation.
    pub removed: bool,
}

impl Log {
    /// Event signature topic, if the log carries one.
    pub fn event_topic(&self) -> Option<&Hash> {
        self.topics.first()
    }
}

/// A transaction as returned by a lookup by hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash.
    pub hash: Hash,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Call data. For private transactions this is the encrypted payload handle.
    pub data: Vec<u8>,
    /// Whether the transaction is private.
    pub private: bool,
    /// Raw signature bytes (r, s, v).
    pub signature: Vec<u8>,
}

/// Receipt-less acknowledgement of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    /// Hash the ledger assigned.
    pub hash: Hash,
    /// Whether the ledger treats it as private.
    pub private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_round_trip() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(addr.0[19], 0xaa);
        assert_eq!(addr.to_string(), "0x00000000000000000000000000000000000000aa");
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_address_accepts_missing_prefix() {
        let addr: Address = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".parse().unwrap();
        assert_eq!(addr, Address([0xbb; 20]));
    }

    #[test]
    fn test_address_serializes_as_json_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address([1u8; 20]), 7u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, format!("{{\"0x{}\":7}}", "01".repeat(20)));
    }

    #[test]
    fn test_keccak_event_topic() {
        // Well-known ERC-20 Transfer topic.
        let topic = Hash::keccak256("Transfer(address,address,uint256)");
        assert_eq!(
            topic.to_string(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_payload_hash_left_pads_short_input() {
        let hash = EncryptedPayloadHash::from_bytes(&[1, 2, 3]);
        assert_eq!(&hash.0[61..], &[1, 2, 3]);
        assert!(hash.0[..61].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_payload_hash_keeps_trailing_bytes_of_long_input() {
        let mut data = vec![9u8; 10];
        data.extend_from_slice(&[5u8; 64]);
        let hash = EncryptedPayloadHash::from_bytes(&data);
        assert_eq!(hash.0, [5u8; 64]);
    }

    #[test]
    fn test_payload_hash_base64_parse() {
        let hash = EncryptedPayloadHash([7u8; 64]);
        let parsed: EncryptedPayloadHash = hash.to_base64().parse().unwrap();
        assert_eq!(parsed, hash);
        assert!("AAAA".parse::<EncryptedPayloadHash>().is_err());
    }

    #[test]
    fn test_log_event_topic() {
        let log = Log {
            topics: vec![Hash([3u8; 32])],
            ..Log::default()
        };
        assert_eq!(log.event_topic(), Some(&Hash([3u8; 32])));
        assert_eq!(Log::default().event_topic(), None);
    }
}
