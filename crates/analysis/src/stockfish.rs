//! Stockfish engine wrapper using UCI protocol (async I/O)

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::debug;

use crate::error::AnalysisError;

/// Score reported for a single fixed-depth search
#[derive(Debug, Clone, Copy)]
pub struct EvalResult {
    /// Centipawn score from the side to move's perspective
    pub cp: Option<i32>,
    /// Mate in N moves (positive = side to move mates)
    pub mate: Option<i32>,
}

/// A single PV line from multi-PV analysis
#[derive(Debug, Clone)]
pub struct PvLine {
    /// Principal variation moves in UCI notation
    pub pv: Vec<String>,
    /// Centipawn score
    pub cp: Option<i32>,
    /// Mate in N
    pub mate: Option<i32>,
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str) -> Result<Self, AnalysisError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = process.stdin.take().unwrap();
        let stdout = BufReader::new(process.stdout.take().unwrap());

        let mut engine = Self {
            process,
            stdin,
            stdout,
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        // Configure for analysis
        engine.send("setoption name Threads value 1").await?;
        engine.send("setoption name Hash value 256").await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnalysisError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnalysisError> {
        let mut line = String::new();
        loop {
            line.clear();
            self.stdout
                .read_line(&mut line)
                .await
                .map_err(|e| AnalysisError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if trimmed == expected {
                return Ok(());
            }
        }
    }

    /// Run a fixed-depth search and return the final reported score
    pub async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvalResult, AnalysisError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut result = EvalResult {
            cp: None,
            mate: None,
        };

        let mut line = String::new();
        loop {
            line.clear();
            self.stdout
                .read_line(&mut line)
                .await
                .map_err(|e| AnalysisError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
            let trimmed = line.trim();

            // Terminal positions report a score with no pv, so key off the
            // score token rather than requiring a line
            if trimmed.starts_with("info") && trimmed.contains(" score ") {
                if let Some(cp) = parse_cp(trimmed) {
                    result.cp = Some(cp);
                    result.mate = None;
                }
                if let Some(mate) = parse_mate(trimmed) {
                    result.mate = Some(mate);
                    result.cp = None;
                }
            } else if trimmed.starts_with("bestmove") {
                break;
            }
        }

        Ok(result)
    }

    /// Run a fixed-depth search with multiple PV lines
    pub async fn evaluate_multipv(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<Vec<PvLine>, AnalysisError> {
        self.send(&format!("setoption name MultiPV value {multipv}"))
            .await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut lines: Vec<PvLine> = vec![
            PvLine {
                pv: vec![],
                cp: None,
                mate: None
            };
            multipv as usize
        ];
        let mut line = String::new();

        loop {
            line.clear();
            self.stdout
                .read_line(&mut line)
                .await
                .map_err(|e| AnalysisError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" pv ") {
                // Parse multipv index (1-based)
                let pv_idx = parse_multipv_index(trimmed).unwrap_or(1) - 1;
                if (pv_idx as usize) < lines.len() {
                    let entry = &mut lines[pv_idx as usize];
                    entry.cp = parse_cp(trimmed);
                    entry.mate = parse_mate(trimmed);
                    entry.pv = parse_pv(trimmed);
                }
            } else if trimmed.starts_with("bestmove") {
                break;
            }
        }

        // Reset MultiPV to 1
        self.send("setoption name MultiPV value 1").await?;

        Ok(lines)
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// The token following `keyword`, if any
fn token_after<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let mut parts = line.split_whitespace();
    while let Some(part) = parts.next() {
        if part == keyword {
            return parts.next();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    token_after(line, "cp").and_then(|v| v.parse().ok())
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    token_after(line, "mate").and_then(|v| v.parse().ok())
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    token_after(line, "multipv").and_then(|v| v.parse().ok())
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|part| *part != "pv")
        .skip(1)
        .take_while(|part| !part.starts_with("bmc") && *part != "string")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_cp(line), Some(35));
        assert_eq!(parse_mate(line), None);
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate 3 nodes 100000 pv e2e4";
        assert_eq!(parse_mate(line), Some(3));
        assert_eq!(parse_cp(line), None);
    }

    #[test]
    fn test_parse_negative_mate() {
        let line = "info depth 12 multipv 2 score mate -2 pv f7f6";
        assert_eq!(parse_mate(line), Some(-2));
    }

    #[test]
    fn test_parse_multipv_index() {
        let line = "info depth 12 multipv 3 score cp -40 pv g8f6 b1c3";
        assert_eq!(parse_multipv_index(line), Some(3));
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 g1f3";
        let pv = parse_pv(line);
        assert_eq!(pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_parse_pv_stops_at_trailing_keywords() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 string rest ignored";
        assert_eq!(parse_pv(line), vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn test_terminal_info_line_has_score_but_no_pv() {
        let line = "info depth 0 score mate 0";
        assert!(line.contains(" score "));
        assert_eq!(parse_mate(line), Some(0));
        assert!(parse_pv(line).is_empty());
    }
}
