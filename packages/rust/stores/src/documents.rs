//! BSON-shaped documents and their conversions to domain types.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson};
use serde::{Deserialize, Serialize};

use addrsync_shared::{AddrSyncError, GeneratedAddress, Result, UnassignedAddress};

/// A document from the generated-addresses collection.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeneratedDocument {
    /// Stored either as a hex string or as a native ObjectId.
    #[serde(rename = "_id")]
    pub id: Bson,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "currencyISO")]
    pub currency_iso: String,
    pub client: String,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
}

impl TryFrom<GeneratedDocument> for GeneratedAddress {
    type Error = AddrSyncError;

    fn try_from(doc: GeneratedDocument) -> Result<Self> {
        let id = match doc.id {
            Bson::String(s) => s,
            Bson::ObjectId(oid) => oid.to_hex(),
            other => {
                return Err(AddrSyncError::decode(format!(
                    "unsupported _id type {:?} for address {}",
                    other.element_type(),
                    doc.value
                )));
            }
        };

        Ok(Self {
            id,
            value: doc.value,
            kind: doc.kind,
            currency_iso: doc.currency_iso,
            client: doc.client,
            created_at: from_bson_datetime(doc.created_at)?,
        })
    }
}

/// A document written to the unassigned-addresses collection.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UnassignedDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "currencyISO")]
    pub currency_iso: String,
    pub client: String,
    #[serde(rename = "generatedAt")]
    pub generated_at: bson::DateTime,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

impl From<&UnassignedAddress> for UnassignedDocument {
    fn from(record: &UnassignedAddress) -> Self {
        Self {
            id: record.id.object_id(),
            value: record.value.clone(),
            kind: record.kind.clone(),
            currency_iso: record.currency_iso.clone(),
            client: record.client.clone(),
            generated_at: to_bson_datetime(record.generated_at),
            created_at: to_bson_datetime(record.created_at),
            updated_at: to_bson_datetime(record.updated_at),
        }
    }
}

/// BSON datetimes carry millisecond precision; sub-millisecond digits are dropped.
fn to_bson_datetime(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_datetime(dt: bson::DateTime) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(|| {
        AddrSyncError::decode(format!("createdAt out of range: {}", dt.timestamp_millis()))
    })
}
