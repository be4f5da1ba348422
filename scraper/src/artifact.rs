use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";
const ARTIFACT_PREFIX: &str = "le_courses_";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid timestamp {0:?}, expected YYYYMMDD_HHMM")]
pub struct TimestampError(String);

/// Minute-resolution wall-clock stamp shared by the artifact and its collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimestampError(s.to_owned());

        let (date, time) = s.split_once('_').ok_or_else(invalid)?;
        if date.len() != 8 || time.len() != 4 {
            return Err(invalid());
        }
        if !date.chars().chain(time.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let field = |digits: &str| digits.parse::<u32>().map_err(|_| invalid());
        let year = date[..4].parse::<i32>().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, field(&date[4..6])?, field(&date[6..])?)
            .ok_or_else(invalid)?;
        NaiveTime::from_hms_opt(field(&time[..2])?, field(&time[2..])?, 0).ok_or_else(invalid)?;

        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn artifact_path(dir: &Path, timestamp: &Timestamp) -> PathBuf {
    dir.join(format!("{ARTIFACT_PREFIX}{timestamp}.json"))
}

/// Writes `courses` as a pretty-printed JSON array, creating `dir` if needed.
pub fn write_artifact(dir: &Path, timestamp: &Timestamp, courses: &[Value]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = artifact_path(dir, timestamp);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, courses)
        .with_context(|| format!("failed to serialize courses to {}", path.display()))?;
    writer.flush()?;

    Ok(path)
}

pub fn read_artifact(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}
