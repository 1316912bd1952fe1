use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::square::Square;

impl Board {
    /// Serializes the board to Forsyth-Edwards Notation.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(64);

        for rank in (0..8).rev() {
            let mut empty = 0u32;
            for file in 0..8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        let idx = (color as usize) * 6 + (piece as usize);
                        fen.push(PC_TO_CHAR[idx]);
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank != 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        let mut rights = String::new();
        if self.has_castling(CASTLE_WK) {
            rights.push('K');
        }
        if self.has_castling(CASTLE_WQ) {
            rights.push('Q');
        }
        if self.has_castling(CASTLE_BK) {
            rights.push('k');
        }
        if self.has_castling(CASTLE_BQ) {
            rights.push('q');
        }
        fen.push_str(if rights.is_empty() { "-" } else { &rights });

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));

        fen
    }

    /// Parses Forsyth-Edwards Notation, replacing the board's current state.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!("FEN requires at least 4 fields: {fen}"));
        }

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN board must have 8 ranks: {fen}"));
        }

        let mut piece_bbs = [[0u64; 6]; 2];
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top;
            let mut file = 0usize;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as usize;
                } else {
                    if file >= 8 {
                        return Err(format!("rank overflow in FEN: {fen}"));
                    }
                    if !ch.is_ascii() {
                        return Err(format!("invalid FEN piece glyph: {ch}"));
                    }
                    let (piece, color) = CHAR_TO_PC[ch as usize]
                        .ok_or_else(|| format!("invalid FEN piece glyph: {ch}"))?;
                    piece_bbs[color as usize][piece as usize] |= 1u64 << (rank * 8 + file);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(format!("rank does not sum to 8 files: {rank_str}"));
            }
        }

        let mut board = Board::new_empty();
        const COLORS: [Color; 2] = [Color::White, Color::Black];
        const PIECES: [Piece; 6] = [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ];
        for &color in &COLORS {
            for &piece in &PIECES {
                board.set_bb(color, piece, piece_bbs[color as usize][piece as usize]);
            }
        }

        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid side to move: {other}")),
        };

        board.castling_rights = 0;
        if fields[2] != "-" {
            for ch in fields[2].chars() {
                match ch {
                    'K' => board.castling_rights |= CASTLE_WK,
                    'Q' => board.castling_rights |= CASTLE_WQ,
                    'k' => board.castling_rights |= CASTLE_BK,
                    'q' => board.castling_rights |= CASTLE_BQ,
                    other => return Err(format!("invalid castling glyph: {other}")),
                }
            }
        }

        board.en_passant = if fields[3] == "-" {
            None
        } else {
            Some(fields[3].parse::<Square>()?)
        };

        board.halfmove_clock = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        board.fullmove_number = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        board.refresh_zobrist();
        board.history.clear();

        *self = board;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn startpos_round_trips() {
        let board = Board::from_str(START_FEN).unwrap();
        assert_eq!(board.to_fen(), START_FEN);
    }

    #[test]
    fn en_passant_square_round_trips() {
        let fen = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1";
        let board = Board::from_str(fen).unwrap();
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn missing_castling_rights_serialize_as_dash() {
        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        let board = Board::from_str(fen).unwrap();
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn rejects_malformed_board_field() {
        assert!(Board::from_str("bad fen string w KQkq - 0 1").is_err());
    }
}
