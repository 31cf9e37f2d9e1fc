use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// BLAKE3 hash of one revision's content.
///
/// Equal content gives equal ids, so two revisions can be compared without
/// reading either.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId([u8; 32]);

impl ContentId {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 4 bytes as hex, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidLength { expected: 32, actual })?;
        Ok(Self(hash))
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_hex()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_id() {
        assert_eq!(ContentId::from_bytes(b"tide"), ContentId::from_bytes(b"tide"));
        assert_ne!(ContentId::from_bytes(b"ebb"), ContentId::from_bytes(b"flow"));
    }

    #[test]
    fn hex_parses_back() {
        let id = ContentId::from_bytes(b"revision");
        assert_eq!(id.to_string().parse::<ContentId>().unwrap(), id);
        assert_eq!(id.short_hex().len(), 8);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(
            ContentId::from_hex("abcd").unwrap_err(),
            TypeError::InvalidLength { expected: 32, actual: 2 }
        );
        assert!(matches!(ContentId::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ContentId::from_bytes(b"json");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        assert_eq!(serde_json::from_str::<ContentId>(&json).unwrap(), id);
    }
}
