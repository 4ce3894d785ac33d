use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub stockfish_path: String,
    pub host: String,
    pub port: u16,
    /// Target recall probability the scheduler plans intervals for.
    pub desired_retention: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            stockfish_path: env::var("STOCKFISH_PATH")
                .unwrap_or_else(|_| "stockfish".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            desired_retention: env::var("DESIRED_RETENTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.9),
        }
    }
}
