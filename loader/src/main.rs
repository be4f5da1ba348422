use anyhow::{Context, Result};
use log::info;

use loader::catalog::{collection_stats, list_course_collections};
use loader::{upload_to_mongodb, DatabaseConfig};
use scraper::{fetch_all_prefix_courses, FetchConfig, Kuali};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let fetch_config = FetchConfig::from_env().context("invalid fetch configuration")?;
    let database_config = DatabaseConfig::from_env().context("invalid database configuration")?;
    log::debug!("{database_config:?}");

    let api = Kuali::from_config(&fetch_config)?;
    let (json_path, timestamp) = fetch_all_prefix_courses(&api, &fetch_config).await?;

    let upload = upload_to_mongodb(&json_path, &timestamp, &database_config).await?;

    // an empty export never creates its collection
    if upload.inserted > 0 {
        let stats = collection_stats(&upload.database, &upload.collection.to_string()).await?;
        info!(
            "{}: {} courses, {} with outcomes, {} without, {} subject codes",
            stats.name,
            stats.total_courses,
            stats.with_outcomes,
            stats.without_outcomes,
            stats.subject_codes.len()
        );
    }

    let exports = list_course_collections(&upload.database, &database_config.collection_prefix)
        .await?;
    for export in &exports {
        info!("  {} ({} documents)", export.name, export.document_count);
    }

    Ok(())
}
