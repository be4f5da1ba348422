//! Read side of the exported collections: listing, stats, lookups and search.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document, Regex};
use mongodb::Database;
use thiserror::Error;

use crate::upload::CollectionName;

/// Results returned per collection by [`search`].
pub const SEARCH_LIMIT: i64 = 50;

const SEARCH_FIELDS: [&str; 3] = ["code", "title", "subjectCode"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid collection name {0:?}")]
    InvalidName(String),
    #[error("collection {0} not found")]
    NotFound(String),
    #[error("search query required")]
    EmptyQuery,
}

/// Queries the read side needs from the database.
#[async_trait]
pub trait CourseStore {
    async fn collection_names(&self) -> Result<Vec<String>>;
    async fn count(&self, collection: &str) -> Result<u64>;
    async fn count_with_outcomes(&self, collection: &str) -> Result<u64>;
    async fn subject_codes(&self, collection: &str) -> Result<Vec<String>>;
    async fn sample(&self, collection: &str) -> Result<Option<Document>>;
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>>;
    async fn search(&self, collection: &str, pattern: &str, limit: i64) -> Result<Vec<Document>>;
    async fn ping(&self) -> Result<()>;
}

/// Courses with a present, non-empty `outcomes` field.
pub fn outcomes_filter() -> Document {
    doc! { "outcomes": { "$exists": true, "$ne": [] } }
}

/// Case-insensitive match of `pattern` against code, title or subject code.
pub fn search_filter(pattern: &str) -> Document {
    let clauses: Vec<Bson> = SEARCH_FIELDS
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(
                *field,
                Regex {
                    pattern: pattern.to_owned(),
                    options: "i".to_owned(),
                },
            );
            Bson::Document(clause)
        })
        .collect();
    doc! { "$or": clauses }
}

#[async_trait]
impl CourseStore for Database {
    async fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.list_collection_names().await?)
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await?)
    }

    async fn count_with_outcomes(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collection::<Document>(collection)
            .count_documents(outcomes_filter())
            .await?)
    }

    async fn subject_codes(&self, collection: &str) -> Result<Vec<String>> {
        let values = self
            .collection::<Document>(collection)
            .distinct("subjectCode", doc! {})
            .await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(code) => Some(code),
                _ => None,
            })
            .collect())
    }

    async fn sample(&self, collection: &str) -> Result<Option<Document>> {
        Ok(self
            .collection::<Document>(collection)
            .find_one(doc! {})
            .await?)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        let cursor = self.collection::<Document>(collection).find(doc! {}).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn search(&self, collection: &str, pattern: &str, limit: i64) -> Result<Vec<Document>> {
        let cursor = self
            .collection::<Document>(collection)
            .find(search_filter(pattern))
            .limit(limit)
            .await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn ping(&self) -> Result<()> {
        self.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: CollectionName,
    pub document_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleCourse {
    pub code: Option<String>,
    pub title: Option<String>,
    pub subject_code: Option<String>,
    pub outcome_count: usize,
}

impl SampleCourse {
    fn from_document(course: &Document) -> Self {
        let text = |key: &str| course.get_str(key).ok().map(str::to_owned);
        Self {
            code: text("code"),
            title: text("title"),
            subject_code: text("subjectCode"),
            outcome_count: course.get_array("outcomes").map_or(0, Vec::len),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionStats {
    pub name: CollectionName,
    pub total_courses: u64,
    pub with_outcomes: u64,
    pub without_outcomes: u64,
    pub subject_codes: Vec<String>,
    pub sample: Option<SampleCourse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub collection: String,
    pub course: Document,
}

/// Export collections carrying `prefix`, oldest first, with their sizes.
pub async fn list_course_collections<S>(store: &S, prefix: &str) -> Result<Vec<CollectionSummary>>
where
    S: CourseStore + ?Sized,
{
    let mut names: Vec<CollectionName> = store
        .collection_names()
        .await?
        .iter()
        .filter_map(|name| name.parse::<CollectionName>().ok())
        .filter(|name| name.prefix() == prefix)
        .collect();
    names.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));

    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        let document_count = store.count(&name.to_string()).await?;
        summaries.push(CollectionSummary {
            name,
            document_count,
        });
    }
    Ok(summaries)
}

async fn existing<S>(store: &S, name: &str) -> Result<CollectionName>
where
    S: CourseStore + ?Sized,
{
    let parsed: CollectionName = name
        .parse()
        .map_err(|_| CatalogError::InvalidName(name.to_owned()))?;
    if !store.collection_names().await?.iter().any(|n| n == name) {
        return Err(CatalogError::NotFound(name.to_owned()).into());
    }
    Ok(parsed)
}

/// Every document of one export collection.
pub async fn collection_documents<S>(store: &S, name: &str) -> Result<Vec<Document>>
where
    S: CourseStore + ?Sized,
{
    existing(store, name).await?;
    store.find_all(name).await
}

pub async fn collection_stats<S>(store: &S, name: &str) -> Result<CollectionStats>
where
    S: CourseStore + ?Sized,
{
    let name = existing(store, name).await?;
    let collection = name.to_string();

    let total_courses = store.count(&collection).await?;
    let with_outcomes = store.count_with_outcomes(&collection).await?;
    let mut subject_codes = store.subject_codes(&collection).await?;
    subject_codes.sort();
    let sample = store
        .sample(&collection)
        .await?
        .map(|course| SampleCourse::from_document(&course));

    Ok(CollectionStats {
        name,
        total_courses,
        with_outcomes,
        without_outcomes: total_courses.saturating_sub(with_outcomes),
        subject_codes,
        sample,
    })
}

/// Searches one named collection, or every export carrying `prefix`.
pub async fn search<S>(
    store: &S,
    query: &str,
    collection: Option<&str>,
    prefix: &str,
) -> Result<Vec<SearchHit>>
where
    S: CourseStore + ?Sized,
{
    if query.trim().is_empty() {
        return Err(CatalogError::EmptyQuery.into());
    }

    let collections = match collection {
        Some(name) => vec![name.to_owned()],
        None => list_course_collections(store, prefix)
            .await?
            .into_iter()
            .map(|summary| summary.name.to_string())
            .collect(),
    };

    let mut hits = Vec::new();
    for collection in collections {
        for course in store.search(&collection, query, SEARCH_LIMIT).await? {
            hits.push(SearchHit {
                collection: collection.clone(),
                course,
            });
        }
    }
    Ok(hits)
}

pub async fn is_healthy<S>(store: &S) -> bool
where
    S: CourseStore + ?Sized,
{
    store.ping().await.is_ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// In-memory collections; search matches case-insensitive substrings.
    #[derive(Default)]
    struct Shelf {
        collections: BTreeMap<String, Vec<Document>>,
        down: bool,
    }

    impl Shelf {
        fn with(mut self, name: &str, courses: Vec<Document>) -> Self {
            self.collections.insert(name.to_owned(), courses);
            self
        }

        fn courses(&self, collection: &str) -> Result<&Vec<Document>> {
            self.collections
                .get(collection)
                .ok_or_else(|| anyhow::anyhow!("no collection {collection}"))
        }
    }

    #[async_trait]
    impl CourseStore for Shelf {
        async fn collection_names(&self) -> Result<Vec<String>> {
            Ok(self.collections.keys().rev().cloned().collect())
        }

        async fn count(&self, collection: &str) -> Result<u64> {
            Ok(self.courses(collection)?.len() as u64)
        }

        async fn count_with_outcomes(&self, collection: &str) -> Result<u64> {
            let with = self
                .courses(collection)?
                .iter()
                .filter(|c| c.get_array("outcomes").is_ok_and(|o| !o.is_empty()))
                .count();
            Ok(with as u64)
        }

        async fn subject_codes(&self, collection: &str) -> Result<Vec<String>> {
            let mut codes: Vec<String> = Vec::new();
            for course in self.courses(collection)? {
                if let Ok(code) = course.get_str("subjectCode") {
                    if !codes.iter().any(|c| c == code) {
                        codes.push(code.to_owned());
                    }
                }
            }
            Ok(codes)
        }

        async fn sample(&self, collection: &str) -> Result<Option<Document>> {
            Ok(self.courses(collection)?.first().cloned())
        }

        async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
            Ok(self.courses(collection)?.clone())
        }

        async fn search(
            &self,
            collection: &str,
            pattern: &str,
            limit: i64,
        ) -> Result<Vec<Document>> {
            let pattern = pattern.to_lowercase();
            Ok(self
                .courses(collection)?
                .iter()
                .filter(|course| {
                    SEARCH_FIELDS.iter().any(|field| {
                        course
                            .get_str(*field)
                            .is_ok_and(|value| value.to_lowercase().contains(&pattern))
                    })
                })
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn ping(&self) -> Result<()> {
            if self.down {
                anyhow::bail!("server selection timeout");
            }
            Ok(())
        }
    }

    fn shelf() -> Shelf {
        Shelf::default()
            .with(
                "courses_20261018_1430",
                vec![
                    doc! {
                        "code": "EECS 2011",
                        "title": "Data Structures",
                        "subjectCode": "LE/EECS",
                        "outcomes": ["analyse", "implement"],
                    },
                    doc! {
                        "code": "MECH 2202",
                        "title": "Dynamics",
                        "subjectCode": "LE/MECH",
                        "outcomes": [],
                    },
                    doc! { "code": "EECS 3101", "title": "Algorithms", "subjectCode": "LE/EECS" },
                ],
            )
            .with(
                "courses_20260901_0800",
                vec![doc! { "code": "CIVL 1000", "title": "Surveying", "subjectCode": "LE/CIVL" }],
            )
            .with("courses_backup", vec![doc! { "code": "X" }])
            .with("le_courses_20261018_1430", vec![])
            .with("system.views", vec![])
    }

    #[tokio::test]
    async fn lists_only_timestamped_exports_with_counts() {
        let listed = list_course_collections(&shelf(), "courses").await.unwrap();

        let names: Vec<String> = listed.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(names, ["courses_20260901_0800", "courses_20261018_1430"]);
        assert_eq!(listed[0].document_count, 1);
        assert_eq!(listed[1].document_count, 3);

        let other = list_course_collections(&shelf(), "le_courses").await.unwrap();
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn stats_split_courses_by_outcomes() {
        let stats = collection_stats(&shelf(), "courses_20261018_1430").await.unwrap();

        assert_eq!(stats.total_courses, 3);
        assert_eq!(stats.with_outcomes, 1);
        assert_eq!(stats.without_outcomes, 2);
        assert_eq!(stats.subject_codes, ["LE/EECS", "LE/MECH"]);
        assert_eq!(
            stats.sample,
            Some(SampleCourse {
                code: Some("EECS 2011".into()),
                title: Some("Data Structures".into()),
                subject_code: Some("LE/EECS".into()),
                outcome_count: 2,
            })
        );
    }

    #[tokio::test]
    async fn lookups_reject_bad_or_missing_names() {
        let err = collection_stats(&shelf(), "courses_backup").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::InvalidName("courses_backup".into()))
        );

        let err = collection_documents(&shelf(), "courses_20200101_0000")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::NotFound("courses_20200101_0000".into()))
        );

        let docs = collection_documents(&shelf(), "courses_20260901_0800").await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn search_spans_every_export_unless_one_is_named() {
        let hits = search(&shelf(), "eecs", None, "courses").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.collection == "courses_20261018_1430"));

        let hits = search(&shelf(), "SURVEY", None, "courses").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collection, "courses_20260901_0800");

        let hits = search(&shelf(), "surveying", Some("courses_20261018_1430"), "courses")
            .await
            .unwrap();
        assert!(hits.is_empty());

        let err = search(&shelf(), "  ", None, "courses").await.unwrap_err();
        assert_eq!(err.downcast_ref::<CatalogError>(), Some(&CatalogError::EmptyQuery));
    }

    #[tokio::test]
    async fn health_follows_ping() {
        assert!(is_healthy(&shelf()).await);
        let down = Shelf {
            down: true,
            ..Shelf::default()
        };
        assert!(!is_healthy(&down).await);
    }

    #[test]
    fn query_documents() {
        assert_eq!(
            outcomes_filter(),
            doc! { "outcomes": { "$exists": true, "$ne": [] } }
        );

        let filter = search_filter("eng");
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 3);
        let first = clauses[0].as_document().unwrap();
        assert_eq!(
            first.get("code"),
            Some(&Bson::RegularExpression(Regex {
                pattern: "eng".into(),
                options: "i".into(),
            }))
        );
    }
}
