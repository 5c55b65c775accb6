//! MongoDB adapter: generated-address source and unassigned-address sink.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection};
use tracing::{debug, info, instrument};

use addrsync_shared::{
    AddrSyncError, GeneratedAddress, MongoConfig, MongoConnection, Result, UnassignedAddress,
};

use crate::documents::{GeneratedDocument, UnassignedDocument};
use crate::{GeneratedSource, UnassignedSink};

/// Everything needed to reach the document store.
#[derive(Clone)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    pub source_collection: String,
    pub destination_collection: String,
    pub client: String,
    pub currency_iso: String,
}

impl MongoSettings {
    /// Combine file config with the resolved connection strings.
    pub fn new(config: &MongoConfig, connection: &MongoConnection) -> Self {
        Self {
            uri: connection.uri.clone(),
            database: connection.database.clone(),
            source_collection: config.source_collection.clone(),
            destination_collection: config.destination_collection.clone(),
            client: config.client.clone(),
            currency_iso: config.currency_iso.clone(),
        }
    }

    /// Equality filter selecting generated addresses.
    pub(crate) fn generated_filter(&self) -> Document {
        doc! {
            "client": &self.client,
            "currencyISO": &self.currency_iso,
        }
    }
}

/// Document store handle. Connects per operation.
pub struct MongoStore {
    settings: MongoSettings,
}

impl MongoStore {
    pub fn new(settings: MongoSettings) -> Self {
        Self { settings }
    }

    /// Open a client and ping the database so connectivity errors surface here.
    async fn connect(&self) -> Result<Client> {
        let client = Client::with_uri_str(&self.settings.uri)
            .await
            .map_err(|e| AddrSyncError::Connection(format!("mongodb: {e}")))?;

        if let Err(e) = client
            .database(&self.settings.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
        {
            client.shutdown().await;
            return Err(AddrSyncError::Connection(format!("mongodb: {e}")));
        }

        debug!(database = %self.settings.database, "mongodb connected");
        Ok(client)
    }

    async fn find_generated(&self, client: &Client) -> Result<Vec<GeneratedAddress>> {
        let collection: Collection<GeneratedDocument> = client
            .database(&self.settings.database)
            .collection(&self.settings.source_collection);

        let cursor = collection
            .find(self.settings.generated_filter(), None)
            .await
            .map_err(|e| AddrSyncError::Query(format!("mongodb find: {e}")))?;

        let docs: Vec<GeneratedDocument> = cursor.try_collect().await.map_err(cursor_error)?;

        docs.into_iter().map(GeneratedAddress::try_from).collect()
    }

    async fn insert_documents(&self, client: &Client, records: &[UnassignedAddress]) -> Result<u64> {
        let collection: Collection<UnassignedDocument> = client
            .database(&self.settings.database)
            .collection(&self.settings.destination_collection);

        let docs: Vec<UnassignedDocument> = records.iter().map(UnassignedDocument::from).collect();

        let result = collection
            .insert_many(docs, None)
            .await
            .map_err(|e| AddrSyncError::Insert(format!("mongodb insert_many: {e}")))?;

        Ok(result.inserted_ids.len() as u64)
    }
}

#[async_trait]
impl GeneratedSource for MongoStore {
    #[instrument(skip_all, fields(collection = %self.settings.source_collection))]
    async fn fetch_generated(&self) -> Result<Vec<GeneratedAddress>> {
        let client = self.connect().await?;
        let result = self.find_generated(&client).await;
        client.shutdown().await;

        let generated = result?;
        info!(count = generated.len(), "fetched generated addresses");
        Ok(generated)
    }
}

#[async_trait]
impl UnassignedSink for MongoStore {
    #[instrument(skip_all, fields(collection = %self.settings.destination_collection, count = records.len()))]
    async fn insert_unassigned(&self, records: &[UnassignedAddress]) -> Result<u64> {
        // The driver rejects an empty insert_many.
        if records.is_empty() {
            return Ok(0);
        }

        let client = self.connect().await?;
        let result = self.insert_documents(&client, records).await;
        client.shutdown().await;

        let inserted = result?;
        info!(inserted, "inserted unassigned addresses");
        Ok(inserted)
    }
}

/// Errors raised while draining a cursor are either decode failures or transport failures.
fn cursor_error(e: mongodb::error::Error) -> AddrSyncError {
    match *e.kind {
        ErrorKind::BsonDeserialization(_) => {
            AddrSyncError::decode(format!("failed to decode address document: {e}"))
        }
        _ => AddrSyncError::Query(format!("mongodb cursor: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MongoSettings {
        MongoSettings::new(
            &MongoConfig::default(),
            &MongoConnection {
                uri: "mongodb://127.0.0.1:1".into(),
                database: "wallets".into(),
            },
        )
    }

    #[test]
    fn settings_merge_config_and_connections() {
        let s = settings();
        assert_eq!(s.database, "wallets");
        assert_eq!(s.source_collection, "addresses");
        assert_eq!(s.destination_collection, "unassigned_addresses");
    }

    #[test]
    fn filter_matches_client_and_currency() {
        let filter = settings().generated_filter();
        assert_eq!(filter.get_str("client").unwrap(), "SENDCASH");
        assert_eq!(filter.get_str("currencyISO").unwrap(), "BTC");
        assert_eq!(filter.len(), 2);
    }

    #[tokio::test]
    async fn empty_insert_never_connects() {
        // Port 1 is unreachable; reaching the driver would fail.
        let store = MongoStore::new(settings());
        let inserted = store.insert_unassigned(&[]).await.expect("empty batch");
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn malformed_uri_is_connection_error() {
        let mut s = settings();
        s.uri = "not-a-mongo-uri".into();
        let err = MongoStore::new(s).fetch_generated().await.unwrap_err();
        assert!(matches!(err, AddrSyncError::Connection(_)));
    }
}
