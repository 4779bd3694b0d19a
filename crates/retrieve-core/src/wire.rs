//! Wire messages
//!
//! JSON bodies exchanged between the block server and its clients:
//!
//! - `GET /block/{root}` -> [`RootBlock`]
//! - `GET /size/{root}` -> [`RootSize`]
//! - `POST /block` <- [`RootBlock`]
//!
//! Block bytes travel as standard padded base64 strings. A `null` or missing
//! block decodes as empty bytes.

use serde::{Deserialize, Serialize};

/// A block and its content identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBlock {
    pub root: String,
    #[serde(with = "base64_bytes", default)]
    pub block: Vec<u8>,
}

/// The stored size of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSize {
    pub root: String,
    pub size: u64,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
