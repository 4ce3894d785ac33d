//! Integration tests: the full pure path from an imported game to a graded
//! card — mainline replay, blunder classification, card eligibility, and
//! the first scheduling decision — with engine output stubbed in.

use analysis::{blunder, Candidate};
use chess_pgn::{parse_mainline, PlayedColor};
use chrono::{DateTime, Duration, Utc};
use review_core::{CardSnapshot, CardState, CardThresholds, Rating, Scheduler};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bob walks into the scholar's mate; 3... Nf6 is his losing decision.
const SCHOLARS_MATE: &str = r#"[Event "Casual game"]
[Site "https://lichess.org/abcd1234"]
[White "alice"]
[Black "bob"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0"#;

fn cand(rank: i32, cp: i32, pv: &[&str]) -> Candidate {
    Candidate {
        rank,
        cp,
        pv: pv.iter().map(|m| m.to_string()).collect(),
    }
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T18:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Game → decision points
// ---------------------------------------------------------------------------

#[test]
fn user_decision_points_follow_the_played_color() {
    let records = parse_mainline(SCHOLARS_MATE).unwrap();

    let bobs_moves: Vec<_> = records
        .iter()
        .filter(|rec| rec.side_to_move == PlayedColor::Black)
        .collect();
    assert_eq!(bobs_moves.len(), 3);
    assert_eq!(bobs_moves[2].san, "Nf6");
    assert_eq!(bobs_moves[2].uci, "g8f6");
    // The board before his mistake has black to move.
    assert!(bobs_moves[2].fen_before.contains(" b "));
}

#[test]
fn opening_skip_suppresses_early_decision_points() {
    let records = parse_mainline(SCHOLARS_MATE).unwrap();
    let skip = 2;

    let mut analyzed = Vec::new();
    let mut seen = 0;
    for rec in &records {
        if rec.side_to_move != PlayedColor::Black {
            continue;
        }
        seen += 1;
        if seen <= skip {
            continue;
        }
        analyzed.push(rec);
    }

    // Only the third black move survives the skip window.
    assert_eq!(analyzed.len(), 1);
    assert_eq!(analyzed[0].san, "Nf6");
}

// ---------------------------------------------------------------------------
// Candidates → verdict
// ---------------------------------------------------------------------------

#[test]
fn losing_defense_is_flagged_as_blunder() {
    let records = parse_mainline(SCHOLARS_MATE).unwrap();
    let decision = &records[5]; // 3... Nf6
    assert_eq!(decision.uci, "g8f6");

    // Stubbed engine view of the position after 3. Bc4, black to move:
    // g6 holds, Qe7 is passive but playable, Nf6 allows mate in one.
    let candidates = vec![
        cand(1, -30, &["g7g6", "h5f3", "g8f6"]),
        cand(2, -75, &["d8e7", "b1c3", "g8f6"]),
        cand(3, -99_999, &["g8f6", "h5f7"]),
    ];

    let best_cp = candidates[0].cp;
    let played_cp = blunder::played_cp_from_candidates(&candidates, &decision.uci).unwrap();
    assert_eq!(played_cp, -99_999);

    let (loss_cp, is_blunder) = blunder::classify(best_cp, played_cp, 200);
    assert_eq!(loss_cp, best_cp - played_cp);
    assert!(is_blunder);

    // Only the top move sits inside a 50cp window of the best.
    let lines = blunder::candidate_lines(&decision.fen_before, &candidates, 50);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].is_acceptable);
    assert!(!lines[1].is_acceptable);
    assert!(!lines[2].is_acceptable);
    assert_eq!(lines[2].first_move_uci, "g8f6");
}

#[test]
fn played_move_outside_candidates_uses_negated_reply_score() {
    let candidates = vec![cand(1, 40, &["e2e4"]), cand(2, 25, &["d2d4"])];
    assert_eq!(blunder::played_cp_from_candidates(&candidates, "a2a4"), None);

    // The pipeline then scores the position after the move from the
    // opponent's side and flips it: +130 for the opponent is -130 for us.
    let opponent_view = 130;
    let played_cp = -opponent_view;
    let (loss_cp, is_blunder) = blunder::classify(40, played_cp, 120);
    assert_eq!(loss_cp, 170);
    assert!(is_blunder);
}

// ---------------------------------------------------------------------------
// Verdict → card → first grade
// ---------------------------------------------------------------------------

#[test]
fn blunder_in_lost_position_earns_no_card() {
    let thresholds = CardThresholds::default();

    // Down a rook already: even a 300cp loss is not worth drilling.
    let (loss_cp, is_blunder) = blunder::classify(-500, -800, 200);
    assert!(is_blunder);
    assert!(!thresholds.is_reviewable(loss_cp, -500, -800));

    // The same loss from a level position qualifies.
    let (loss_cp, _) = blunder::classify(20, -280, 200);
    assert!(thresholds.is_reviewable(loss_cp, 20, -280));

    // Comfortably winning before and after gets pruned too.
    let (loss_cp, is_blunder) = blunder::classify(900, 500, 200);
    assert!(is_blunder);
    assert!(!thresholds.is_reviewable(loss_cp, 900, 500));
}

#[test]
fn fresh_card_failed_on_first_sight_comes_back_within_minutes() {
    // A qualifying position gets a card due immediately.
    let card = CardSnapshot::new(now());
    assert_eq!(card.state, CardState::Learning);
    assert_eq!(card.due_at, now());
    assert_eq!(card.reps, 0);

    // The user fails it on first sight.
    let out = Scheduler::default().review(&card, Rating::Again, now());
    assert_eq!(out.state, CardState::Learning);
    assert_eq!(out.step, 0);
    assert_eq!(out.lapses, 1);
    assert_eq!(out.reps, 1);
    assert!(out.due_at > now());
    assert!(out.due_at - now() < Duration::hours(1));
}

#[test]
fn mate_scale_scores_survive_the_whole_path() {
    let thresholds = CardThresholds::default();

    // Missing a mate in two from a winning position: best is near the
    // sentinel, the played move keeps a normal advantage. The winning
    // prune drops it, matching "both sides of the move were winning".
    let (loss_cp, is_blunder) = blunder::classify(99_998, 450, 200);
    assert!(is_blunder);
    assert!(!thresholds.is_reviewable(loss_cp, 99_998, 450));

    // Walking into a forced mate from equality is the strongest card.
    let (loss_cp, is_blunder) = blunder::classify(10, -99_997, 200);
    assert!(is_blunder);
    assert!(thresholds.is_reviewable(loss_cp, 10, -99_997));
}
