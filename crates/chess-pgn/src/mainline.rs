//! Mainline replay — turns one game's movetext into per-ply records.

use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Visitor};
use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode, Position};

use crate::pgn::{PlayedColor, STANDARD_START_FEN};

/// One half-move of a game with the board context around it.
#[derive(Debug, Clone)]
pub struct PlyRecord {
    /// 1-based half-move index.
    pub ply: u32,
    /// FEN before the move was played.
    pub fen_before: String,
    /// FEN after the move was played.
    pub fen_after: String,
    /// Side that made the move.
    pub side_to_move: PlayedColor,
    pub uci: String,
    pub san: String,
}

/// Tags collected during header parsing.
#[derive(Default)]
struct GameTags {
    fen: Option<String>,
    setup: Option<String>,
}

/// State during movetext parsing.
struct ReplayState {
    board: Chess,
    ply: u32,
    records: Vec<PlyRecord>,
    valid: bool,
}

/// Visitor that replays the mainline move by move.
struct MainlineVisitor;

impl Visitor for MainlineVisitor {
    type Tags = GameTags;
    type Movetext = ReplayState;
    type Output = Option<Vec<PlyRecord>>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, GameTags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut GameTags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        match name {
            b"FEN" => tags.fen = Some(value.decode_utf8_lossy().into_owned()),
            b"SetUp" => tags.setup = Some(value.decode_utf8_lossy().into_owned()),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameTags) -> ControlFlow<Self::Output, ReplayState> {
        // Games from a non-standard start position cannot be replayed
        // from the default board.
        if tags.setup.as_deref() == Some("1") {
            if let Some(fen) = tags.fen {
                if fen != STANDARD_START_FEN {
                    return ControlFlow::Break(None);
                }
            }
        }

        ControlFlow::Continue(ReplayState {
            board: Chess::default(),
            ply: 0,
            records: Vec::new(),
            valid: true,
        })
    }

    fn san(&mut self, state: &mut ReplayState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if !state.valid {
            return ControlFlow::Continue(());
        }

        match san_plus.san.to_move(&state.board) {
            Ok(mv) => {
                let fen_before =
                    Fen::from_position(&state.board, EnPassantMode::Legal).to_string();
                let side_to_move = PlayedColor::from(state.board.turn());
                let uci = mv.to_uci(CastlingMode::Standard).to_string();

                state.board.play_unchecked(mv);
                let fen_after =
                    Fen::from_position(&state.board, EnPassantMode::Legal).to_string();

                state.ply += 1;
                state.records.push(PlyRecord {
                    ply: state.ply,
                    fen_before,
                    fen_after,
                    side_to_move,
                    uci,
                    san: san_plus.to_string(),
                });
            }
            Err(_) => state.valid = false,
        }

        ControlFlow::Continue(())
    }

    fn end_game(&mut self, state: ReplayState) -> Self::Output {
        if state.valid {
            Some(state.records)
        } else {
            None
        }
    }
}

/// Replay the mainline of a single-game PGN.
///
/// Returns `None` when the movetext cannot be replayed: an illegal move, a
/// non-standard start position, or no game in the input at all. A game with
/// zero moves is valid and yields an empty list.
pub fn parse_mainline(pgn: &str) -> Option<Vec<PlyRecord>> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut MainlineVisitor) {
        Ok(Some(records)) => records,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOLARS_MATE: &str = r#"[Event "Casual game"]
[White "alice"]
[Black "bob"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0"#;

    #[test]
    fn test_parse_mainline_records() {
        let records = parse_mainline(SCHOLARS_MATE).unwrap();
        assert_eq!(records.len(), 7);

        let first = &records[0];
        assert_eq!(first.ply, 1);
        assert_eq!(first.side_to_move, PlayedColor::White);
        assert_eq!(first.uci, "e2e4");
        assert_eq!(first.san, "e4");
        assert_eq!(first.fen_before, STANDARD_START_FEN);

        let second = &records[1];
        assert_eq!(second.ply, 2);
        assert_eq!(second.side_to_move, PlayedColor::Black);
        assert_eq!(second.fen_before, first.fen_after);

        // Mate suffix survives SAN rendering.
        assert_eq!(records[6].san, "Qxf7#");
    }

    #[test]
    fn test_parse_mainline_alternates_sides() {
        let records = parse_mainline(SCHOLARS_MATE).unwrap();
        for (i, rec) in records.iter().enumerate() {
            let expected = if i % 2 == 0 {
                PlayedColor::White
            } else {
                PlayedColor::Black
            };
            assert_eq!(rec.side_to_move, expected);
            assert_eq!(rec.ply as usize, i + 1);
        }
    }

    #[test]
    fn test_parse_mainline_illegal_move() {
        // Ke7 is blocked by black's own pawn on move one.
        let illegal = "[Event \"x\"]\n\n1. e4 Ke7 *";
        assert!(parse_mainline(illegal).is_none());

        // The same move is fine once the e-pawn has advanced.
        let legal = "[Event \"x\"]\n\n1. e4 e5 2. Ke2 Ke7 *";
        assert!(parse_mainline(legal).is_some());
    }

    #[test]
    fn test_parse_mainline_empty_movetext() {
        let records = parse_mainline("[Event \"x\"]\n[Result \"*\"]\n\n*").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_mainline_nonstandard_setup() {
        let pgn = r#"[Event "odds game"]
[SetUp "1"]
[FEN "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN1 w Qkq - 0 1"]

1. e4 *"#;
        assert!(parse_mainline(pgn).is_none());
    }

    #[test]
    fn test_parse_mainline_no_game() {
        assert!(parse_mainline("").is_none());
    }

    #[test]
    fn test_parse_mainline_castling_uci() {
        let pgn = "[Event \"x\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O *";
        let records = parse_mainline(pgn).unwrap();
        assert_eq!(records[6].san, "O-O");
        assert_eq!(records[6].uci, "e1g1");
    }
}
