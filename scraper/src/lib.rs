use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use enum_iterator::Sequence;
use log::{error, info, warn};
use reqwest::{header::ACCEPT, Client};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod artifact;
pub mod config;
pub mod filter;
pub mod parse;

pub use artifact::{read_artifact, Timestamp};
pub use config::FetchConfig;
pub use filter::{Accumulator, FetchSummary, Verdict};

/// Departments searched by default, in fetch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence)]
pub enum Prefix {
    Mech,
    Eng,
    Esse,
    Eecs,
    Tron,
    Civl,
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Mech => "mech",
                Self::Eng => "eng",
                Self::Esse => "esse",
                Self::Eecs => "eecs",
                Self::Tron => "tron",
                Self::Civl => "civl",
            }
        )
    }
}

/// One page of a prefix search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SearchQuery<'a> {
    pub limit: usize,
    pub skip: usize,
    pub status: &'static str,
    pub index: &'static str,
    pub q: &'a str,
}

impl<'a> SearchQuery<'a> {
    pub fn new(prefix: &'a str, limit: usize, skip: usize) -> Self {
        Self {
            limit,
            skip,
            status: "active",
            index: "courses_latest",
            q: prefix,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("response body is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of search result pages.
#[async_trait]
pub trait SearchApi {
    async fn search(&self, query: &SearchQuery<'_>) -> Result<Value, FetchError>;
}

/// Client for the Kuali curriculum search endpoint.
pub struct Kuali {
    client: Client,
    endpoint: String,
    token: String,
}

impl Kuali {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, endpoint, token))
    }

    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.token.clone())
    }
}

#[async_trait]
impl SearchApi for Kuali {
    async fn search(&self, query: &SearchQuery<'_>) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Pages through every active course matching `prefix`.
///
/// Stops on an empty or non-array page, on a failed request, or once `skip`
/// reaches `max_offset`. A failed request keeps the pages already fetched.
pub async fn fetch_courses_for_prefix<A>(
    api: &A,
    prefix: &str,
    page_size: usize,
    max_offset: usize,
) -> Vec<Value>
where
    A: SearchApi + ?Sized,
{
    let mut skip = 0;
    let mut courses = Vec::new();

    loop {
        let limit = page_size.min(max_offset.saturating_sub(skip));
        if limit == 0 {
            break;
        }

        let body = match api.search(&SearchQuery::new(prefix, limit, skip)).await {
            Ok(body) => body,
            Err(e) => {
                error!("error fetching courses for prefix '{prefix}': {e}");
                break;
            }
        };

        let page = match parse::page_records(body) {
            Some(page) if !page.is_empty() => page,
            Some(_) => break,
            None => {
                warn!("non-array page for prefix '{prefix}' at skip {skip}, stopping");
                break;
            }
        };

        skip += page.len();
        info!("fetched {} from prefix '{prefix}' (total: {skip})", page.len());
        courses.extend(page);
    }

    courses
}

/// Filters and deduplicates the courses of every configured prefix.
pub async fn collect_courses<A>(api: &A, config: &FetchConfig) -> Accumulator
where
    A: SearchApi + ?Sized,
{
    let mut accumulator = Accumulator::new(config.namespace.clone());

    for prefix in &config.prefixes {
        let courses =
            fetch_courses_for_prefix(api, prefix, config.page_size, config.max_offset).await;
        accumulator.extend(courses);
    }

    accumulator
}

/// Fetches every prefix and writes the filtered courses to a timestamped artifact.
///
/// Returns the artifact path together with the timestamp embedded in its name.
pub async fn fetch_all_prefix_courses<A>(
    api: &A,
    config: &FetchConfig,
) -> Result<(PathBuf, Timestamp)>
where
    A: SearchApi + ?Sized,
{
    let accumulator = collect_courses(api, config).await;
    info!(
        "filtered {} courses: {}",
        config.namespace,
        accumulator.summary()
    );

    let timestamp = Timestamp::now();
    let path = artifact::write_artifact(&config.output_dir, &timestamp, accumulator.courses())?;
    info!("saved to {}", path.display());

    Ok((path, timestamp))
}
