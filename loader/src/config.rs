use scraper::config::{optional, required, ConfigError};

pub const DEFAULT_DATABASE: &str = "kuali";
pub const DEFAULT_COLLECTION_PREFIX: &str = "courses";

#[derive(Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
    pub collection_prefix: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            uri: required(&lookup, "MONGODB_URI")?,
            database: optional(&lookup, "MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            collection_prefix: optional(&lookup, "MONGODB_COLLECTION_PREFIX")
                .unwrap_or_else(|| DEFAULT_COLLECTION_PREFIX.to_owned()),
        })
    }
}

// the connection string carries credentials
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &"<redacted>")
            .field("database", &self.database)
            .field("collection_prefix", &self.collection_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_is_required() {
        let err = DatabaseConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MONGODB_URI")));
    }

    #[test]
    fn names_default_and_override() {
        let config = DatabaseConfig::from_lookup(|name| {
            (name == "MONGODB_URI").then(|| "mongodb://user:pw@localhost".to_owned())
        })
        .unwrap();
        assert_eq!(config.database, "kuali");
        assert_eq!(config.collection_prefix, "courses");
        assert!(!format!("{config:?}").contains("pw"));

        let config = DatabaseConfig::from_lookup(|name| match name {
            "MONGODB_URI" => Some("mongodb://localhost".to_owned()),
            "MONGODB_DATABASE" => Some("catalog".to_owned()),
            "MONGODB_COLLECTION_PREFIX" => Some("le".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.database, "catalog");
        assert_eq!(config.collection_prefix, "le");
    }
}
