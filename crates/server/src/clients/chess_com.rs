use reqwest::Client;
use serde_json::Value;

pub struct ChessComClient {
    client: Client,
}

impl ChessComClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("BlunderGym/1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap();
        Self { client }
    }

    /// Fetch the list of monthly archive URLs, newest first.
    pub async fn fetch_archives(&self, username: &str) -> Result<Vec<String>, String> {
        let url = format!(
            "https://api.chess.com/pub/player/{}/games/archives",
            username
        );

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Archives request error: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err("User not found".to_string());
        }

        if !resp.status().is_success() {
            return Err(format!("Archives HTTP {}", resp.status()));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("Archives JSON parse error: {e}"))?;

        let mut archives: Vec<String> = data["archives"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect();

        // The API lists oldest first; reverse so callers can stop early
        archives.reverse();
        Ok(archives)
    }

    /// Fetch one monthly archive as a multi-game PGN blob. Months that
    /// fail to load come back empty instead of failing the whole import.
    pub async fn fetch_archive_pgn(&self, archive_url: &str) -> Result<String, String> {
        // Rate limit
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let resp = self
            .client
            .get(format!("{archive_url}/pgn"))
            .send()
            .await
            .map_err(|e| format!("Request error: {e}"))?;

        if !resp.status().is_success() {
            return Ok(String::new());
        }

        resp.text()
            .await
            .map_err(|e| format!("Body read error: {e}"))
    }
}
