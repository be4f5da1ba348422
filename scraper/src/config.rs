use std::path::PathBuf;

use enum_iterator::all;
use thiserror::Error;

use crate::Prefix;

pub const DEFAULT_API_URL: &str = "https://york-sbx.kuali.co/api/v0/cm/search";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_OFFSET: usize = 10_000;
pub const DEFAULT_NAMESPACE: &str = "LE/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("no search prefixes configured")]
    NoPrefixes,
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Reads a required variable through `lookup`, treating blank values as unset.
pub fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

pub fn optional<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn number<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Everything the fetch/filter phase needs, resolved once at start-up.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub endpoint: String,
    pub token: String,
    pub page_size: usize,
    pub max_offset: usize,
    pub prefixes: Vec<String>,
    pub namespace: String,
    pub output_dir: PathBuf,
}

impl FetchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = required(&lookup, "KUALI_TOKEN")?;

        let prefixes: Vec<String> = match optional(&lookup, "KUALI_PREFIXES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_owned)
                .collect(),
            None => all::<Prefix>().map(|prefix| prefix.to_string()).collect(),
        };
        if prefixes.is_empty() {
            return Err(ConfigError::NoPrefixes);
        }

        let output_dir = match optional(&lookup, "LE_COURSES_OUTPUT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join("Documents"),
        };

        Ok(Self {
            endpoint: optional(&lookup, "KUALI_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            token,
            page_size: number(&lookup, "KUALI_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_offset: number(&lookup, "KUALI_MAX_OFFSET", DEFAULT_MAX_OFFSET)?,
            prefixes,
            namespace: optional(&lookup, "KUALI_SUBJECT_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned()),
            output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = FetchConfig::from_lookup(lookup(&[
            ("KUALI_TOKEN", "secret"),
            ("LE_COURSES_OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, DEFAULT_API_URL);
        assert_eq!(config.token, "secret");
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.max_offset, 10_000);
        assert_eq!(config.prefixes, ["mech", "eng", "esse", "eecs", "tron", "civl"]);
        assert_eq!(config.namespace, "LE/");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn output_dir_defaults_to_home_documents() {
        let result = FetchConfig::from_lookup(lookup(&[("KUALI_TOKEN", "t")]));

        match dirs::home_dir() {
            Some(home) => {
                let config = result.unwrap();
                assert_eq!(config.output_dir, home.join("Documents"));
                assert!(config.output_dir.ends_with("Documents"));
            }
            None => assert!(matches!(result, Err(ConfigError::NoHomeDir))),
        }
    }

    #[test]
    fn token_is_required() {
        let err = FetchConfig::from_lookup(lookup(&[("KUALI_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("KUALI_TOKEN")));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = FetchConfig::from_lookup(lookup(&[
            ("KUALI_TOKEN", "t"),
            ("KUALI_API_URL", "http://localhost:9000/search"),
            ("KUALI_PAGE_SIZE", "50"),
            ("KUALI_MAX_OFFSET", "200"),
            ("KUALI_PREFIXES", "eecs, mech,,"),
            ("KUALI_SUBJECT_NAMESPACE", "SC/"),
            ("LE_COURSES_OUTPUT_DIR", "out"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000/search");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_offset, 200);
        assert_eq!(config.prefixes, ["eecs", "mech"]);
        assert_eq!(config.namespace, "SC/");
    }

    #[test]
    fn bad_numbers_and_empty_prefix_lists_are_rejected() {
        let err = FetchConfig::from_lookup(lookup(&[
            ("KUALI_TOKEN", "t"),
            ("KUALI_PAGE_SIZE", "lots"),
            ("LE_COURSES_OUTPUT_DIR", "out"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "KUALI_PAGE_SIZE", .. }));

        let err = FetchConfig::from_lookup(lookup(&[
            ("KUALI_TOKEN", "t"),
            ("KUALI_PREFIXES", " , "),
            ("LE_COURSES_OUTPUT_DIR", "out"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoPrefixes));
    }
}
