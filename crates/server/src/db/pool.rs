use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Imported games, one row per (source, username, source_game_id)
CREATE TABLE IF NOT EXISTS games (
    id             BIGSERIAL PRIMARY KEY,
    source         TEXT NOT NULL,
    source_game_id TEXT NOT NULL,
    username       TEXT NOT NULL,
    played_color   TEXT NOT NULL,
    result         TEXT,
    pgn            TEXT NOT NULL,
    analyzed       BOOLEAN NOT NULL DEFAULT FALSE,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(source, username, source_game_id)
);

CREATE INDEX IF NOT EXISTS idx_games_username_lower
    ON games (LOWER(username));

-- Decision points where the user was to move
CREATE TABLE IF NOT EXISTS positions (
    id           BIGSERIAL PRIMARY KEY,
    game_id      BIGINT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    ply          INTEGER NOT NULL,
    fen          TEXT NOT NULL,
    side_to_move TEXT NOT NULL,
    played_uci   TEXT NOT NULL,
    played_san   TEXT NOT NULL,
    best_cp      INTEGER NOT NULL,
    played_cp    INTEGER NOT NULL,
    loss_cp      INTEGER NOT NULL,
    is_blunder   BOOLEAN NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_positions_game_id
    ON positions (game_id);

-- Ranked engine alternatives for a position
CREATE TABLE IF NOT EXISTS candidate_lines (
    id             BIGSERIAL PRIMARY KEY,
    position_id    BIGINT NOT NULL REFERENCES positions(id) ON DELETE CASCADE,
    pv_rank        INTEGER NOT NULL,
    cp             INTEGER NOT NULL,
    first_move_uci TEXT NOT NULL,
    uci_line       TEXT NOT NULL,
    san_line       TEXT NOT NULL,
    is_acceptable  BOOLEAN NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_candidate_lines_position_id
    ON candidate_lines (position_id);

-- The opponent's actual reply to the played move
CREATE TABLE IF NOT EXISTS practical_responses (
    id                BIGSERIAL PRIMARY KEY,
    position_id       BIGINT NOT NULL REFERENCES positions(id) ON DELETE CASCADE,
    opponent_move_uci TEXT NOT NULL,
    opponent_move_san TEXT NOT NULL,
    cp_after          INTEGER
);

-- Spaced-repetition state, at most one card per position
CREATE TABLE IF NOT EXISTS cards (
    id             BIGSERIAL PRIMARY KEY,
    position_id    BIGINT NOT NULL UNIQUE REFERENCES positions(id) ON DELETE CASCADE,
    state          TEXT NOT NULL DEFAULT 'learning',
    step           INTEGER NOT NULL DEFAULT 0,
    due_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    stability      DOUBLE PRECISION NOT NULL DEFAULT 0.4,
    difficulty     DOUBLE PRECISION NOT NULL DEFAULT 5.0,
    reps           INTEGER NOT NULL DEFAULT 0,
    lapses         INTEGER NOT NULL DEFAULT 0,
    last_review_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_cards_due_at
    ON cards (due_at);

-- Append-only review log
CREATE TABLE IF NOT EXISTS reviews (
    id           BIGSERIAL PRIMARY KEY,
    card_id      BIGINT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    rating       INTEGER NOT NULL,
    reviewed_at  TIMESTAMPTZ NOT NULL,
    next_due_at  TIMESTAMPTZ NOT NULL,
    elapsed_days DOUBLE PRECISION NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_card_id
    ON reviews (card_id);
"#;
