//! Google Sheets values API reader.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sheets_parser::range::qualified;
use sheets_parser::{Cell, Grid, SheetSource};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    ApiKey(String),
    None,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base: String,
    auth: Auth,
}

impl GoogleSheetsClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent("sheets-sync/0.1")
            .build()?;

        let auth = match (&config.sheets_token, &config.api_key) {
            (Some(token), _) => Auth::Bearer(token.clone()),
            (None, Some(key)) => Auth::ApiKey(key.clone()),
            (None, None) => Auth::None,
        };
        if matches!(auth, Auth::None) {
            log::warn!("Neither GOOGLE_SHEETS_TOKEN nor GOOGLE_API_KEY is set; only public sheets will load");
        }

        Ok(Self {
            client,
            base: config.sheets_api_base.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn values_url(&self, spreadsheet_id: &str, sheet: &str, range: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base)
            .with_context(|| format!("Invalid SHEETS_API_BASE '{}'", self.base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("SHEETS_API_BASE cannot be a base URL: {}", self.base))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(spreadsheet_id)
            .push("values")
            .push(&qualified(sheet, range));
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");
        if let Auth::ApiKey(key) = &self.auth {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn get_range(&self, spreadsheet_id: &str, sheet: &str, range: &str) -> Result<Grid> {
        let url = self.values_url(spreadsheet_id, sheet, range)?;
        log::debug!("GET {}", url.path());

        let mut request = self.client.get(url);
        if let Auth::Bearer(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await.context("HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets API returned {}: {}", status, body);
        }

        let values: ValueRange = resp
            .json()
            .await
            .context("Failed to decode Sheets API response")?;
        Ok(to_grid(values))
    }
}

fn to_grid(values: ValueRange) -> Grid {
    values
        .values
        .iter()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> GoogleSheetsClient {
        let config = Config {
            db_url: None,
            sheets_api_base: "https://sheets.googleapis.com/v4".to_string(),
            sheets_token: None,
            api_key: api_key.map(str::to_string),
            batch_size: 500,
            http_timeout_secs: 5,
        };
        GoogleSheetsClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = client(None).values_url("1AbC", "Laba Rugi", "A1:BZ200").unwrap();
        assert_eq!(
            url.path(),
            "/v4/spreadsheets/1AbC/values/'Laba%20Rugi'!A1:BZ200"
        );
        let query = url.query().unwrap();
        assert!(query.contains("valueRenderOption=UNFORMATTED_VALUE"));
        assert!(query.contains("dateTimeRenderOption=FORMATTED_STRING"));
        assert!(!query.contains("key="));
    }

    #[test]
    fn test_values_url_carries_api_key() {
        let url = client(Some("k-123")).values_url("1AbC", "PL", "A1:B2").unwrap();
        assert!(url.query().unwrap().ends_with("key=k-123"));
    }

    #[test]
    fn test_response_to_grid() {
        let raw = r#"{"range":"PL!A1:C2","majorDimension":"ROWS","values":[["Nov 2025", 1500.5, ""],[true]]}"#;
        let values: ValueRange = serde_json::from_str(raw).unwrap();
        let grid = to_grid(values);
        assert_eq!(grid[0][0], Cell::Text("Nov 2025".to_string()));
        assert_eq!(grid[0][1], Cell::Number(1500.5));
        assert_eq!(grid[0][2], Cell::Empty);
        assert_eq!(grid[1][0], Cell::Bool(true));

        let empty: ValueRange = serde_json::from_str(r#"{"range":"PL!A1:C2"}"#).unwrap();
        assert!(to_grid(empty).is_empty());
    }
}
