//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// ItemId
// ============================================================================

/// Stable identity of a catalog item
///
/// The canonical string form (lowercase, hyphenated UUID) is the remote
/// primary key, so one id always maps to exactly one remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new random ItemId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an ItemId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UUID '{s}': {e}")))
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Opaque pagination continuation token issued by the remote table
///
/// Never parsed or compared beyond presence: the only question a caller
/// asks is whether another page exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a server-issued token, rejecting empty strings
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.is_empty() {
            return Err(DomainError::InvalidCursor("cursor cannot be empty".to_string()));
        }
        Ok(Self(token))
    }

    /// Interprets an optional wire value; empty strings mean "no more pages"
    pub fn from_wire(token: Option<String>) -> Option<Self> {
        token.and_then(|t| Self::new(t).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Cursor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

// ============================================================================
// AssetRef
// ============================================================================

const SHA256_PREFIX: &str = "sha256:";
const SHA256_HEX_LEN: usize = 64;

/// Content-addressable reference to an uploaded binary attachment
///
/// Format: `sha256:<64 lowercase hex chars>`. Identical bytes always map
/// to the same reference, so re-uploading an unchanged cover is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetRef(String);

impl AssetRef {
    /// Builds a reference from a hex-encoded SHA-256 digest
    pub fn from_sha256_hex(hex: &str) -> Result<Self, DomainError> {
        let hex = hex.to_ascii_lowercase();
        if hex.len() != SHA256_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidAssetRef(format!(
                "expected {SHA256_HEX_LEN} hex characters, got '{hex}'"
            )));
        }
        Ok(Self(format!("{SHA256_PREFIX}{hex}")))
    }

    /// The full `sha256:<hex>` form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex digest without the algorithm prefix
    pub fn digest(&self) -> &str {
        &self.0[SHA256_PREFIX.len()..]
    }
}

impl Display for AssetRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix(SHA256_PREFIX)
            .ok_or_else(|| DomainError::InvalidAssetRef(format!("missing sha256 prefix: {s}")))?;
        Self::from_sha256_hex(hex)
    }
}

impl TryFrom<String> for AssetRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetRef> for String {
    fn from(asset: AssetRef) -> Self {
        asset.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn test_item_id_display_roundtrip() {
        let id = ItemId::new();
        let parsed: ItemId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn test_item_id_rejects_garbage() {
        assert!(matches!(
            "not-a-uuid".parse::<ItemId>(),
            Err(DomainError::InvalidId(_))
        ));
    }

    #[test]
    fn test_item_id_serializes_as_plain_string() {
        let id: ItemId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"67e55044-10b1-426f-9247-bb680e5fe0c8\"");
    }

    #[test]
    fn test_cursor_rejects_empty() {
        assert!(Cursor::new("").is_err());
        assert_eq!(Cursor::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_cursor_from_wire_treats_empty_as_end() {
        assert!(Cursor::from_wire(None).is_none());
        assert!(Cursor::from_wire(Some(String::new())).is_none());
        assert!(Cursor::from_wire(Some("next".to_string())).is_some());
    }

    #[test]
    fn test_asset_ref_from_digest() {
        let asset = AssetRef::from_sha256_hex(DIGEST).unwrap();
        assert_eq!(asset.as_str(), format!("sha256:{DIGEST}"));
        assert_eq!(asset.digest(), DIGEST);
    }

    #[test]
    fn test_asset_ref_normalizes_case() {
        let asset = AssetRef::from_sha256_hex(&DIGEST.to_uppercase()).unwrap();
        assert_eq!(asset.digest(), DIGEST);
    }

    #[test]
    fn test_asset_ref_parse() {
        let asset: AssetRef = format!("sha256:{DIGEST}").parse().unwrap();
        assert_eq!(asset.digest(), DIGEST);

        assert!("md5:abcd".parse::<AssetRef>().is_err());
        assert!("sha256:abcd".parse::<AssetRef>().is_err());
        assert!(format!("sha256:{}", "z".repeat(64)).parse::<AssetRef>().is_err());
    }

    #[test]
    fn test_asset_ref_serde_validates() {
        let ok: Result<AssetRef, _> = serde_json::from_str(&format!("\"sha256:{DIGEST}\""));
        assert!(ok.is_ok());

        let bad: Result<AssetRef, _> = serde_json::from_str("\"sha256:nope\"");
        assert!(bad.is_err());
    }
}
