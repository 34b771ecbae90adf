//! CSV-backed historical game store
//!
//! Each history source is a CSV sheet with a header row and one game per row:
//!
//! ```text
//! team_one,score_one,team_two,score_two,date
//! "[1, 2, 3, 4]",2150,"[5, 6, 7, 8]",1875,03/14/2024
//! ```
//!
//! Teams are JSON lists of participant ids and dates are `MM/DD/YYYY`
//! (ISO `YYYY-MM-DD` is accepted as well). Sheets are read from a local
//! directory or downloaded from a CSV export URL.

use crate::config::HistorySettings;
use crate::error::{HistoryError, MatchmakingError, Result};
use crate::history::store::HistoricalGameStore;
use crate::types::{HistoricalGameRecord, ParticipantId};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the CSV sheets live
#[derive(Debug, Clone)]
pub enum CsvLocation {
    /// `<directory>/<source>.csv`
    Directory(PathBuf),
    /// A URL template containing `{source}`
    Url(String),
}

/// Historical game store reading CSV sheets
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    location: CsvLocation,
    client: reqwest::Client,
}

impl CsvHistoryStore {
    /// Read sheets from a local directory
    pub fn from_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            location: CsvLocation::Directory(directory.into()),
            client: reqwest::Client::new(),
        }
    }

    /// Download sheets from `template`, with `{source}` replaced by the key
    pub fn from_url_template(template: impl Into<String>, timeout: Duration) -> Result<Self> {
        let template = template.into();
        if !template.contains("{source}") {
            return Err(MatchmakingError::ConfigurationError {
                message: format!("History URL template has no {{source}}: {}", template),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MatchmakingError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            location: CsvLocation::Url(template),
            client,
        })
    }

    /// Build from settings; a directory takes precedence over a URL
    pub fn from_settings(settings: &HistorySettings) -> Result<Self> {
        match (&settings.directory, &settings.url_template) {
            (Some(directory), _) => Ok(Self::from_directory(directory.clone())),
            (None, Some(template)) => Self::from_url_template(
                template.clone(),
                settings.request_timeout(),
            ),
            (None, None) => Err(MatchmakingError::ConfigurationError {
                message: "No history directory or URL template configured".to_string(),
            }
            .into()),
        }
    }

    pub fn location(&self) -> &CsvLocation {
        &self.location
    }

    async fn read_file(
        &self,
        directory: &Path,
        source_key: &str,
    ) -> std::result::Result<Vec<u8>, HistoryError> {
        let path = directory.join(format!("{}.csv", source_key));
        debug!("Reading history sheet {}", path.display());

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HistoryError::Unrankable {
                source_key: source_key.to_string(),
                reason: format!("no history sheet at {}", path.display()),
            },
            _ => HistoryError::Unavailable {
                source_key: source_key.to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })
    }

    async fn download(
        &self,
        template: &str,
        source_key: &str,
    ) -> std::result::Result<Vec<u8>, HistoryError> {
        let url = template.replace("{source}", source_key);
        debug!("Downloading history sheet {}", url);

        let unavailable = |reason: String| HistoryError::Unavailable {
            source_key: source_key.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HistoryError::Unrankable {
                source_key: source_key.to_string(),
                reason: "history sheet not found".to_string(),
            });
        }
        if !status.is_success() {
            return Err(unavailable(format!("server responded with {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read body: {}", e)))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl HistoricalGameStore for CsvHistoryStore {
    async fn fetch(
        &self,
        source_key: &str,
    ) -> std::result::Result<Vec<HistoricalGameRecord>, HistoryError> {
        validate_source_key(source_key)?;

        let data = match &self.location {
            CsvLocation::Directory(directory) => self.read_file(directory, source_key).await?,
            CsvLocation::Url(template) => self.download(template, source_key).await?,
        };

        let games = parse_history_csv(&data, source_key);
        info!(
            "Loaded {} historical games from source '{}'",
            games.len(),
            source_key
        );
        Ok(games)
    }
}

fn validate_source_key(source_key: &str) -> std::result::Result<(), HistoryError> {
    let valid = !source_key.is_empty()
        && source_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(HistoryError::Unrankable {
            source_key: source_key.to_string(),
            reason: "source key may only contain letters, digits, '-' and '_'".to_string(),
        })
    }
}

/// Parse a history sheet, skipping malformed rows with a warning
pub fn parse_history_csv(data: &[u8], source_key: &str) -> Vec<HistoricalGameRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut games = Vec::new();
    for (index, result) in reader.records().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable row {} in '{}': {}", line, source_key, e);
                continue;
            }
        };

        match parse_row(&row) {
            Ok(game) => games.push(game),
            Err(reason) => {
                warn!("Skipping malformed row {} in '{}': {}", line, source_key, reason)
            }
        }
    }
    games
}

fn parse_row(row: &csv::StringRecord) -> std::result::Result<HistoricalGameRecord, String> {
    let field = |i: usize, name: &str| {
        row.get(i)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing {}", name))
    };

    let team_one = parse_team(field(0, "team one")?)?;
    let team_one_score = parse_score(field(1, "team one score")?)?;
    let team_two = parse_team(field(2, "team two")?)?;
    let team_two_score = parse_score(field(3, "team two score")?)?;
    let date = parse_date(field(4, "date")?)?;

    if !team_one.is_disjoint(&team_two) {
        return Err("a participant is on both teams".to_string());
    }
    if team_one_score == 0 && team_two_score == 0 {
        return Err("both scores are zero".to_string());
    }

    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date {}", date))?;

    Ok(HistoricalGameRecord {
        played_at: Utc.from_utc_datetime(&midnight),
        team_one,
        team_one_score,
        team_two,
        team_two_score,
    })
}

fn parse_team(value: &str) -> std::result::Result<BTreeSet<ParticipantId>, String> {
    let members: Vec<ParticipantId> =
        serde_json::from_str(value).map_err(|e| format!("invalid team '{}': {}", value, e))?;
    if members.is_empty() {
        return Err("empty team".to_string());
    }
    Ok(members.into_iter().collect())
}

fn parse_score(value: &str) -> std::result::Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("invalid score '{}'", value))
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use httpmock::prelude::*;

    const SHEET: &str = "team_one,score_one,team_two,score_two,date\n\
        \"[1, 2, 3, 4]\",2150,\"[5, 6, 7, 8]\",1875,03/14/2024\n\
        \"[1, 5, 3, 7]\",1400,\"[2, 6, 4, 8]\",1650,2024-03-15\n";

    #[test]
    fn test_parse_sheet() {
        let games = parse_history_csv(SHEET.as_bytes(), "league");
        assert_eq!(games.len(), 2);

        let first = &games[0];
        assert_eq!(first.team_one, [1, 2, 3, 4].into_iter().collect());
        assert_eq!(first.team_one_score, 2150);
        assert_eq!(first.team_two_score, 1875);
        assert_eq!(first.played_at.month(), 3);
        assert_eq!(first.played_at.day(), 14);
        assert_eq!(games[1].played_at.day(), 15);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let sheet = "team_one,score_one,team_two,score_two,date\n\
            \"[1, 2]\",10,\"[3, 4]\",5,01/02/2024\n\
            not-json,10,\"[3, 4]\",5,01/02/2024\n\
            \"[1, 2]\",ten,\"[3, 4]\",5,01/02/2024\n\
            \"[1, 2]\",10,\"[2, 4]\",5,01/02/2024\n\
            \"[1, 2]\",0,\"[3, 4]\",0,01/02/2024\n\
            \"[1, 2]\",10,\"[3, 4]\",5,yesterday\n\
            \"[1, 2]\",10,\"[3, 4]\"\n\
            \"[5, 6]\",7,\"[7, 8]\",9,01/03/2024\n";

        let games = parse_history_csv(sheet.as_bytes(), "league");
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].team_one, [5, 6].into_iter().collect());
    }

    #[tokio::test]
    async fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("league.csv"), SHEET).unwrap();
        let store = CsvHistoryStore::from_directory(dir.path());

        assert_eq!(store.fetch("league").await.unwrap().len(), 2);

        let missing = store.fetch("unknown").await.unwrap_err();
        assert!(!missing.is_retryable());

        let escape = store.fetch("../league").await.unwrap_err();
        assert!(!escape.is_retryable());
    }

    #[tokio::test]
    async fn test_url_store() {
        let server = MockServer::start_async().await;
        let sheet = server
            .mock_async(|when, then| {
                when.method(GET).path("/sheets/league/export");
                then.status(200).body(SHEET);
            })
            .await;
        let missing = server
            .mock_async(|when, then| {
                when.method(GET).path("/sheets/gone/export");
                then.status(404);
            })
            .await;
        let broken = server
            .mock_async(|when, then| {
                when.method(GET).path("/sheets/broken/export");
                then.status(503);
            })
            .await;

        let template = format!("{}/sheets/{{source}}/export", server.base_url());
        let store = CsvHistoryStore::from_url_template(template, Duration::from_secs(5)).unwrap();

        assert_eq!(store.fetch("league").await.unwrap().len(), 2);
        assert!(!store.fetch("gone").await.unwrap_err().is_retryable());
        assert!(store.fetch("broken").await.unwrap_err().is_retryable());

        sheet.assert_async().await;
        missing.assert_async().await;
        broken.assert_async().await;
    }

    #[test]
    fn test_from_settings() {
        let mut settings = HistorySettings::default();
        assert!(CsvHistoryStore::from_settings(&settings).is_err());

        settings.url_template = Some("https://example.com/{source}.csv".to_string());
        let store = CsvHistoryStore::from_settings(&settings).unwrap();
        assert!(matches!(store.location(), CsvLocation::Url(_)));

        settings.directory = Some(PathBuf::from("/tmp/history"));
        let store = CsvHistoryStore::from_settings(&settings).unwrap();
        assert!(matches!(store.location(), CsvLocation::Directory(_)));
    }
}
