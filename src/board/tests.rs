use super::*;
use std::str::FromStr;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[test]
fn new_matches_startpos_fen() {
    let from_new = Board::new();
    let from_fen = Board::from_str(START_FEN).unwrap();
    assert_eq!(from_new, from_fen);
}

#[test]
fn zobrist_matches_full_recompute_on_startpos() {
    let board = Board::new();
    assert_eq!(board.zobrist, board.compute_zobrist_full());
}

#[test]
fn king_square_finds_the_correct_square() {
    let board = Board::new();
    assert_eq!(board.king_square(Color::White).index(), 4);
    assert_eq!(board.king_square(Color::Black).index(), 60);
}

#[test]
fn validate_accepts_startpos() {
    let board = Board::new();
    assert!(board.validate().is_ok());
}

#[test]
fn validate_rejects_overlapping_bitboards() {
    let mut board = Board::new_empty();
    board.set_bb(Color::White, Piece::Rook, 1);
    board.set_bb(Color::White, Piece::Knight, 1);
    assert!(board.validate().is_err());
}

#[test]
fn repetition_count_starts_at_one_for_the_current_position() {
    let board = Board::new();
    assert_eq!(board.repetition_count(), 1);
    assert!(!board.is_threefold());
}

#[test]
fn repetition_count_includes_matching_history_entries() {
    let mut board = Board::new();
    board.history.push(board.zobrist);
    board.history.push(board.zobrist);
    assert_eq!(board.repetition_count(), 3);
    assert!(board.is_threefold());
}

#[test]
fn color_opposite_round_trips() {
    assert_eq!(Color::White.opposite(), Color::Black);
    assert_eq!(Color::Black.opposite(), Color::White);
    assert_eq!(!Color::White, Color::Black);
}

#[test]
fn display_matches_to_fen() {
    let board = Board::new();
    assert_eq!(board.to_string(), board.to_fen());
}
