use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use mongodb::bson::{self, Document};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use thiserror::Error;

use scraper::{read_artifact, Timestamp};

use crate::config::DatabaseConfig;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid collection name {0:?}, expected <prefix>_YYYYMMDD_HHMM")]
pub struct CollectionNameError(String);

/// Name of the collection holding one export: `{prefix}_{timestamp}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionName {
    prefix: String,
    timestamp: Timestamp,
}

impl CollectionName {
    pub fn new(prefix: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            prefix: prefix.into(),
            timestamp,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

impl FromStr for CollectionName {
    type Err = CollectionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CollectionNameError(s.to_owned());

        let (rest, minutes) = s.rsplit_once('_').ok_or_else(invalid)?;
        let (prefix, date) = rest.rsplit_once('_').ok_or_else(invalid)?;
        if prefix.is_empty() {
            return Err(invalid());
        }
        let timestamp = format!("{date}_{minutes}").parse().map_err(|_| invalid())?;

        Ok(Self::new(prefix, timestamp))
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.timestamp)
    }
}

/// Parsed artifact contents, ready for insertion.
#[derive(Debug, PartialEq)]
pub enum Payload {
    Many(Vec<Document>),
    One(Document),
}

/// Converts an artifact into documents: arrays become one document per element.
pub fn documents(value: Value) -> Result<Payload> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                bson::to_document(item)
                    .with_context(|| format!("element {i} is not a JSON object"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Payload::Many),
        other => bson::to_document(&other)
            .context("artifact is neither an array nor a JSON object")
            .map(Payload::One),
    }
}

/// Destination of the bulk write.
#[async_trait]
pub trait DocumentSink {
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize>;
    async fn insert_one(&self, document: Document) -> Result<()>;
}

#[async_trait]
impl DocumentSink for Collection<Document> {
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize> {
        let result = Collection::insert_many(self, documents).await?;
        Ok(result.inserted_ids.len())
    }

    async fn insert_one(&self, document: Document) -> Result<()> {
        Collection::insert_one(self, document).await?;
        Ok(())
    }
}

/// Loads the artifact at `json_file` into `sink`, returning the number of inserted documents.
pub async fn upload<S>(sink: &S, json_file: &Path, collection: &CollectionName) -> Result<usize>
where
    S: DocumentSink + ?Sized,
{
    let value = read_artifact(json_file)?;

    match documents(value)? {
        Payload::Many(docs) if docs.is_empty() => {
            warn!(
                "{} holds no courses, nothing inserted into {collection}",
                json_file.display()
            );
            Ok(0)
        }
        Payload::Many(docs) => {
            let inserted = sink.insert_many(docs).await?;
            info!("inserted {inserted} courses into MongoDB collection: {collection}");
            Ok(inserted)
        }
        Payload::One(doc) => {
            sink.insert_one(doc).await?;
            info!("inserted 1 document into MongoDB collection: {collection}");
            Ok(1)
        }
    }
}

/// Where an artifact ended up.
pub struct Upload {
    pub database: Database,
    pub collection: CollectionName,
    pub inserted: usize,
}

pub async fn connect(config: &DatabaseConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.uri)
        .await
        .context("failed to create MongoDB client")?;
    Ok(client.database(&config.database))
}

pub async fn upload_to_mongodb(
    json_file: &Path,
    timestamp: &Timestamp,
    config: &DatabaseConfig,
) -> Result<Upload> {
    let database = connect(config).await?;

    let name = CollectionName::new(config.collection_prefix.as_str(), timestamp.clone());
    let collection = database.collection::<Document>(&name.to_string());

    let inserted = upload(&collection, json_file, &name)
        .await
        .with_context(|| format!("failed to upload {} to {name}", json_file.display()))?;

    Ok(Upload {
        database,
        collection: name,
        inserted,
    })
}
