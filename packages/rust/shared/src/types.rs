//! Core domain types for address reconciliation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AddrSyncError, Result};

/// Snapshot file holding the generated addresses fetched from the document store.
pub const GENERATED_SNAPSHOT: &str = "generated_addresses.json";

/// Snapshot file holding the assigned address values fetched from the relational store.
pub const ASSIGNED_SNAPSHOT: &str = "assigned_addresses.json";

/// Snapshot file holding the reconciled output awaiting persistence.
pub const UNASSIGNED_SNAPSHOT: &str = "unassigned_addresses.json";

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Destination-native document identifier (a 12-byte ObjectId).
///
/// Serializes as its 24-character hex form so snapshot files stay plain JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Parse a source identifier into a destination identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|e| AddrSyncError::decode(format!("invalid ObjectId '{raw}': {e}")))
    }

    /// The underlying ObjectId, for building store documents.
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = AddrSyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// GeneratedAddress
// ---------------------------------------------------------------------------

/// An address record produced upstream and stored in the document source.
///
/// Aliases accept snapshots written with the capitalized field names of the
/// earlier batch tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAddress {
    /// Source-native identifier, kept opaque until reconciliation.
    #[serde(rename = "_id", alias = "ID")]
    pub id: String,
    /// The address string; the reconciliation key.
    #[serde(alias = "Value")]
    pub value: String,
    /// Address type tag.
    #[serde(rename = "type", alias = "Type")]
    pub kind: String,
    /// Currency code, e.g. `BTC`.
    #[serde(rename = "currencyISO", alias = "CurrencyISO")]
    pub currency_iso: String,
    /// Owning client, e.g. `SENDCASH`.
    #[serde(alias = "Client")]
    pub client: String,
    /// When the address was generated upstream.
    #[serde(rename = "createdAt", alias = "CreatedAt")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// UnassignedAddress
// ---------------------------------------------------------------------------

/// A generated address whose value is not among the assigned addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedAddress {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "currencyISO")]
    pub currency_iso: String,
    pub client: String,
    /// Copy of the source record's creation time.
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UnassignedAddress {
    /// Overwrite both bookkeeping timestamps with `now`.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }
}
