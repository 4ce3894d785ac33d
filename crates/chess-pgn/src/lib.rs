//! PGN handling for imported games: splitting export blobs, header
//! extraction, mainline replay, and SAN rendering of engine lines.

pub mod line;
pub mod mainline;
pub mod pgn;

pub use line::{position_from_fen, san_line, uci_to_san};
pub use mainline::{parse_mainline, PlyRecord};
pub use pgn::{
    color_and_outcome, extract_header, game_id_from_url, split_games, GameOutcome, PlayedColor,
    STANDARD_START_FEN,
};
