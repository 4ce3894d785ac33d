use std::sync::Arc;

use server::config;
use server::db;
use server::jobs::JobRegistry;
use server::routes;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();

    // Connect to Postgres
    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run schema migrations
    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let import_jobs: server::jobs::ImportJobs = Arc::new(JobRegistry::new());
    let analyze_jobs: server::jobs::AnalyzeJobs = Arc::new(JobRegistry::new());

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/healthz", get(routes::health::health_check))
        // Import
        .route("/api/import/lichess", post(routes::import::import_lichess))
        .route("/api/import/chesscom", post(routes::import::import_chesscom))
        .route("/api/import/pgn", post(routes::import::import_pgn))
        .route("/api/import/start", post(routes::import::start_import))
        .route(
            "/api/import/progress/{job_id}",
            get(routes::import::import_progress),
        )
        // Analysis
        .route("/api/analyze", post(routes::analyze::analyze))
        .route("/api/analyze/start", post(routes::analyze::start_analyze))
        .route(
            "/api/analyze/progress/{job_id}",
            get(routes::analyze::analyze_progress),
        )
        .route("/api/analyze/reset", post(routes::analyze::reset))
        .route("/api/games/{username}", get(routes::analyze::list_games))
        // Review
        .route("/api/review/next/{username}", get(routes::review::next_card))
        .route("/api/review/grade", post(routes::review::grade))
        .route(
            "/api/review/preview/{card_id}",
            get(routes::review::preview),
        )
        // Ad-hoc evaluation
        .route("/api/eval", post(routes::eval::eval))
        .route("/api/reply-lines", post(routes::eval::reply_lines))
        // Users & stats — reviews route before the parameterized username
        .route(
            "/api/stats/reviews/{username}",
            get(routes::stats::review_stats),
        )
        .route("/api/stats/{username}", get(routes::stats::user_stats))
        .route("/api/users", get(routes::stats::list_users))
        // Shared state
        .layer(Extension(pool))
        .layer(Extension(config.clone()))
        .layer(Extension(import_jobs))
        .layer(Extension(analyze_jobs))
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
