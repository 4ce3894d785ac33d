use axum::{Extension, Json};
use chess_pgn::PlayedColor;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::check_range;

#[derive(Deserialize)]
pub struct EvalBody {
    pub fen: String,
    pub depth: Option<u32>,
    pub pov_side: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplyLinesBody {
    pub fen: String,
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub cp_window: Option<i32>,
    pub pov_side: Option<String>,
}

fn parse_pov(pov_side: Option<&str>) -> Result<Option<PlayedColor>, AppError> {
    match pov_side {
        None => Ok(None),
        Some("white") => Ok(Some(PlayedColor::White)),
        Some("black") => Ok(Some(PlayedColor::Black)),
        Some(_) => Err(AppError::BadRequest(
            "pov_side must be white or black".into(),
        )),
    }
}

/// POST /api/eval
/// One-off engine probe for a single FEN.
pub async fn eval(
    Extension(config): Extension<Config>,
    Json(body): Json<EvalBody>,
) -> Result<Json<JsonValue>, AppError> {
    let depth = check_range("depth", body.depth.unwrap_or(15), 4, 30)?;
    let pov = parse_pov(body.pov_side.as_deref())?;

    let cp = analysis::evaluate_fen(&config.stockfish_path, &body.fen, depth, pov).await?;
    Ok(Json(serde_json::json!({ "cp": cp })))
}

/// POST /api/reply-lines
/// Acceptable candidate lines for a FEN, for exploring alternatives from a
/// reviewed position.
pub async fn reply_lines(
    Extension(config): Extension<Config>,
    Json(body): Json<ReplyLinesBody>,
) -> Result<Json<JsonValue>, AppError> {
    let depth = check_range("depth", body.depth.unwrap_or(12), 4, 24)?;
    let multipv = check_range("multipv", body.multipv.unwrap_or(4), 1, 12)?;
    let cp_window = check_range("cp_window", body.cp_window.unwrap_or(30), 0, 300)?;
    let pov = parse_pov(body.pov_side.as_deref())?;

    let lines = analysis::reply_lines(
        &config.stockfish_path,
        &body.fen,
        depth,
        multipv,
        cp_window,
        pov,
    )
    .await?;

    let lines: Vec<JsonValue> = lines
        .into_iter()
        .map(|line| {
            serde_json::json!({
                "rank": line.rank,
                "cp": line.cp,
                "first_move_uci": line.first_move_uci,
                "first_move_san": line.first_move_san,
                "san_line": line.san_line,
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "lines": lines })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pov_parses_sides_and_rejects_garbage() {
        assert_eq!(parse_pov(None).unwrap(), None);
        assert_eq!(parse_pov(Some("white")).unwrap(), Some(PlayedColor::White));
        assert_eq!(parse_pov(Some("black")).unwrap(), Some(PlayedColor::Black));
        assert!(parse_pov(Some("both")).is_err());
        assert!(parse_pov(Some("White")).is_err());
    }
}
