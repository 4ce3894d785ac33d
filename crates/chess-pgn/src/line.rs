//! SAN rendering for engine lines (lists of UCI moves).

use shakmaty::{fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, Position};

/// Parse a FEN into a playable position, `None` when illegal.
pub fn position_from_fen(fen: &str) -> Option<Chess> {
    let parsed: Fen = fen.parse().ok()?;
    parsed.into_position::<Chess>(CastlingMode::Standard).ok()
}

/// Convert a single UCI move to SAN at a given position.
pub fn uci_to_san(pos: &Chess, uci_str: &str) -> Option<String> {
    let uci_move: UciMove = uci_str.parse().ok()?;
    let legal_move = uci_move.to_move(pos).ok()?;
    Some(San::from_move(pos, legal_move).to_string())
}

/// Render the first `max_plies` moves of a UCI line as space-separated SAN,
/// stopping at the first move that does not apply.
pub fn san_line(fen: &str, uci_moves: &[String], max_plies: usize) -> String {
    let mut pos = match position_from_fen(fen) {
        Some(p) => p,
        None => return String::new(),
    };

    let mut sans: Vec<String> = Vec::new();
    for uci_str in uci_moves.iter().take(max_plies) {
        let uci_move: UciMove = match uci_str.parse() {
            Ok(m) => m,
            Err(_) => break,
        };
        let mv = match uci_move.to_move(&pos) {
            Ok(m) => m,
            Err(_) => break,
        };
        sans.push(San::from_move(&pos, mv).to_string());
        pos.play_unchecked(mv);
    }
    sans.join(" ")
}
