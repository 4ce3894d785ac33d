use reqwest::Client;

pub struct LichessClient {
    client: Client,
}

impl LichessClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("BlunderGym/1.0")
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap();
        Self { client }
    }

    /// Export the most recent games for a user as one multi-game PGN blob.
    pub async fn export_games(
        &self,
        username: &str,
        max_games: usize,
    ) -> Result<String, String> {
        let url = format!("https://lichess.org/api/games/user/{}", username);

        let params = [
            ("max", max_games.to_string()),
            ("moves", "true".to_string()),
            ("tags", "true".to_string()),
            ("clocks", "false".to_string()),
            ("evals", "false".to_string()),
            ("opening", "false".to_string()),
        ];

        // Rate limit
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", "application/x-chess-pgn")
            .send()
            .await
            .map_err(|e| format!("Request error: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err("User not found".to_string());
        }

        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }

        resp.text()
            .await
            .map_err(|e| format!("Body read error: {e}"))
    }
}
