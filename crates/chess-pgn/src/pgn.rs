//! PGN blob utilities — lightweight regex-based header parsing.

use regex::Regex;

/// FEN of the standard starting position. Games set up from any other
/// position cannot be replayed from a default board.
pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Which seat the user occupied in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayedColor {
    White,
    Black,
}

impl PlayedColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayedColor::White => "white",
            PlayedColor::Black => "black",
        }
    }

    /// Parse the stored form; anything other than "white" reads as black.
    pub fn from_db(value: &str) -> Self {
        if value == "white" {
            PlayedColor::White
        } else {
            PlayedColor::Black
        }
    }
}

impl From<shakmaty::Color> for PlayedColor {
    fn from(color: shakmaty::Color) -> Self {
        if color.is_white() {
            PlayedColor::White
        } else {
            PlayedColor::Black
        }
    }
}

/// Outcome of a game from the user's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
    Unknown,
}

impl GameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOutcome::Win => "win",
            GameOutcome::Loss => "loss",
            GameOutcome::Draw => "draw",
            GameOutcome::Unknown => "unknown",
        }
    }
}

/// Split a multi-game export blob into individual PGN strings.
pub fn split_games(blob: &str) -> Vec<&str> {
    let blob = blob.trim();
    if blob.is_empty() {
        return Vec::new();
    }

    // A new game starts at a blank line followed by an [Event tag.
    let re = Regex::new(r"\n\n\[Event ").unwrap();

    let mut games: Vec<&str> = Vec::new();
    let mut start = 0;
    for m in re.find_iter(blob) {
        games.push(blob[start..m.start()].trim());
        start = m.start() + 2; // past the blank line, keeping "[Event"
    }
    games.push(blob[start..].trim());
    games.retain(|g| !g.is_empty());
    games
}

/// Extract a string value from a PGN header (e.g. White, Site, Link).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Last path segment of a game URL header value, e.g. the `abcd1234` of
/// `https://lichess.org/abcd1234`.
pub fn game_id_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Derive the user's seat and result from a game's headers. A user who does
/// not match the White header is assumed to have played black, since exports
/// are requested per user.
pub fn color_and_outcome(pgn: &str, username: &str) -> (PlayedColor, GameOutcome) {
    let white = extract_header(pgn, "White").unwrap_or_default();
    let color = if white.eq_ignore_ascii_case(username) {
        PlayedColor::White
    } else {
        PlayedColor::Black
    };

    let result = extract_header(pgn, "Result").unwrap_or_default();
    let outcome = match result.as_str() {
        "1-0" => {
            if color == PlayedColor::White {
                GameOutcome::Win
            } else {
                GameOutcome::Loss
            }
        }
        "0-1" => {
            if color == PlayedColor::Black {
                GameOutcome::Win
            } else {
                GameOutcome::Loss
            }
        }
        "1/2-1/2" => GameOutcome::Draw,
        _ => GameOutcome::Unknown,
    };

    (color, outcome)
}
