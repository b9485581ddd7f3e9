//! Applying and taking back moves.
//!
//! `apply` trusts its caller: the move must be legal (or at least
//! pseudo-legal) on this board. It buffers exactly one level of undo
//! state; `undo` after `undo`, or before any `apply`, is an error.

use crate::model::{
    Board, Color, EMPTY, Move, Piece,
    mailbox::Wing,
    square::*,
};
use crate::error::{Error, Result};

impl Board {
    /// Apply a move in place. No legality check is performed.
    pub fn apply(&mut self, m: &Move) {
        if m.is_null {
            self.turn = self.turn.opp();
            self.prev_ep_target = self.ep_target;
            self.ep_target = 0;
            self.last_was_null = true;
            self.undo_available = true;
            if self.turn == Color::WHITE {
                self.fullmove_number += 1;
            }
            self.invalidate_caches();
            return;
        }

        self.last_was_null = false;
        self.turn = self.turn.opp();
        self.prev_ep_target = self.ep_target;
        self.prev_castling_rights = self.castling_rights;
        self.prev_halfmove_clock = self.halfmove_clock;
        self.ep_target = 0;
        if self.turn == Color::WHITE {
            self.fullmove_number += 1;
        }
        self.old_board = self.board;

        let from = m.from as usize;
        let to = m.to as usize;
        let mover_cell = self.board[from];
        let mover_kind = self.piece_kind(m.from);
        let color = self.piece_color(m.from);
        let target_cell = self.board[to];

        // piece list: captured piece goes first, then the mover leaves
        // its origin
        if target_cell != EMPTY {
            self.remove_from_piece_list(color.opp(), target_cell & 0x07, m.to);
        }
        self.remove_from_piece_list(color, mover_kind, m.from);

        if mover_kind == Piece::PAWN as u8 || target_cell != EMPTY {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        // double pawn push opens an en-passant window behind the pawn
        if mover_kind == Piece::PAWN as u8 {
            if m.to as i32 - m.from as i32 == 20 {
                self.ep_target = m.from + 10;
            }
            if m.to as i32 - m.from as i32 == -20 {
                self.ep_target = m.from - 10;
            }
        }

        // en-passant capture: a pawn arriving diagonally on an empty
        // square takes the pawn beside it
        if mover_kind == Piece::PAWN as u8 && target_cell == EMPTY {
            let delta = m.to as i32 - m.from as i32;
            if color == Color::WHITE && (delta == 9 || delta == 11) {
                self.board[to - 10] = EMPTY;
                self.remove_from_piece_list(Color::BLACK, Piece::PAWN as u8, m.to - 10);
            }
            if color == Color::BLACK && (delta == -9 || delta == -11) {
                self.board[to + 10] = EMPTY;
                self.remove_from_piece_list(Color::WHITE, Piece::PAWN as u8, m.to + 10);
            }
        }

        match m.promotion {
            Some(promoted) => {
                self.board[to] = promoted.cell(color);
                self.add_to_piece_list(color, promoted as u8, m.to);
            }
            None => {
                self.board[to] = mover_cell;
                self.add_to_piece_list(color, mover_kind, m.to);
            }
        }
        self.board[from] = EMPTY;

        // castling also moves the rook and burns that side's rights
        if mover_kind == Piece::KING as u8 {
            match (color, m.from, m.to) {
                (Color::WHITE, E1, G1) => {
                    self.board[F1 as usize] = self.board[H1 as usize];
                    self.board[H1 as usize] = EMPTY;
                    self.set_castle(Color::WHITE, Wing::KING, false);
                    self.remove_from_piece_list(Color::WHITE, Piece::ROOK as u8, H1);
                    self.add_to_piece_list(Color::WHITE, Piece::ROOK as u8, F1);
                }
                (Color::WHITE, E1, C1) => {
                    self.board[D1 as usize] = self.board[A1 as usize];
                    self.board[A1 as usize] = EMPTY;
                    self.set_castle(Color::WHITE, Wing::QUEEN, false);
                    self.remove_from_piece_list(Color::WHITE, Piece::ROOK as u8, A1);
                    self.add_to_piece_list(Color::WHITE, Piece::ROOK as u8, D1);
                }
                (Color::BLACK, E8, G8) => {
                    self.board[F8 as usize] = self.board[H8 as usize];
                    self.board[H8 as usize] = EMPTY;
                    self.set_castle(Color::BLACK, Wing::KING, false);
                    self.remove_from_piece_list(Color::BLACK, Piece::ROOK as u8, H8);
                    self.add_to_piece_list(Color::BLACK, Piece::ROOK as u8, F8);
                }
                (Color::BLACK, E8, C8) => {
                    self.board[D8 as usize] = self.board[A8 as usize];
                    self.board[A8 as usize] = EMPTY;
                    self.set_castle(Color::BLACK, Wing::QUEEN, false);
                    self.remove_from_piece_list(Color::BLACK, Piece::ROOK as u8, A8);
                    self.add_to_piece_list(Color::BLACK, Piece::ROOK as u8, D8);
                }
                _ => {}
            }
        }

        // rights are lost by moving the king, moving a rook off its
        // home square, or anything landing on a rook home square
        // (which means the rook was just captured or long gone)
        if mover_kind == Piece::KING as u8 {
            match color {
                Color::WHITE if m.from == E1 => {
                    if m.to != G1 {
                        self.set_castle(Color::WHITE, Wing::KING, false);
                    }
                    if m.to != C1 {
                        self.set_castle(Color::WHITE, Wing::QUEEN, false);
                    }
                }
                Color::BLACK if m.from == E8 => {
                    if m.to != G8 {
                        self.set_castle(Color::BLACK, Wing::KING, false);
                    }
                    if m.to != C8 {
                        self.set_castle(Color::BLACK, Wing::QUEEN, false);
                    }
                }
                _ => {}
            }
        }
        if mover_kind == Piece::ROOK as u8 {
            match m.from {
                A1 => self.set_castle(Color::WHITE, Wing::QUEEN, false),
                H1 => self.set_castle(Color::WHITE, Wing::KING, false),
                A8 => self.set_castle(Color::BLACK, Wing::QUEEN, false),
                H8 => self.set_castle(Color::BLACK, Wing::KING, false),
                _ => {}
            }
        }
        match m.to {
            A1 => self.set_castle(Color::WHITE, Wing::QUEEN, false),
            H1 => self.set_castle(Color::WHITE, Wing::KING, false),
            A8 => self.set_castle(Color::BLACK, Wing::QUEEN, false),
            H8 => self.set_castle(Color::BLACK, Wing::KING, false),
            _ => {}
        }

        self.undo_available = true;
        self.invalidate_caches();
    }

    /// Take back the last applied move. Only one level is buffered.
    pub fn undo(&mut self) -> Result<()> {
        if !self.undo_available {
            return Err(Error::IllegalOperation(
                "apply must precede undo".to_string(),
            ));
        }
        if self.last_was_null {
            self.turn = self.turn.opp();
            self.ep_target = self.prev_ep_target;
            self.prev_ep_target = 0;
            self.last_was_null = false;
            if self.turn == Color::BLACK {
                self.fullmove_number -= 1;
            }
        } else {
            self.board = self.old_board;
            self.ep_target = self.prev_ep_target;
            self.prev_ep_target = 0;
            self.castling_rights = self.prev_castling_rights;
            self.halfmove_clock = self.prev_halfmove_clock;
            self.prev_halfmove_clock = 0;
            self.turn = self.turn.opp();
            if self.turn == Color::BLACK {
                self.fullmove_number -= 1;
            }
        }
        self.undo_available = false;
        self.init_piece_list();
        self.invalidate_caches();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Game;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    #[test]
    fn apply_undo_round_trip() {
        let start = Board::startpos();
        for m in start.legal_moves() {
            let mut b = start.clone();
            b.apply(&m);
            assert!(b.is_consistent(), "inconsistent after {m:?}");
            b.undo().unwrap();
            assert_eq!(b, start, "undo mismatch after {m:?}");
        }
    }

    #[test]
    fn undo_twice_is_refused() {
        let mut b = Board::startpos();
        assert!(b.undo().is_err());
        b.apply(&Move::new(E2, E4));
        b.undo().unwrap();
        assert!(matches!(b.undo(), Err(Error::IllegalOperation(_))));
    }

    #[test]
    fn null_move_toggles_and_restores() {
        let mut b = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        let before = b.clone();
        b.apply(&Move::null());
        assert_eq!(b.turn, Color::BLACK);
        assert!(b.last_was_null);
        assert_eq!(b.ep_target(), None);
        b.undo().unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn en_passant_capture_removes_the_passed_pawn() {
        let mut b = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        b.apply(&Move::new(E5, D6));
        assert_eq!(b.piece_at(D6), crate::model::WHITE_PAWN);
        assert_eq!(b.piece_at(D5), EMPTY);
        assert!(b.piece_squares(Color::BLACK, Piece::PAWN).is_empty());
        assert_eq!(b.halfmove_clock, 0);
    }

    #[test]
    fn castling_moves_the_rook_too() {
        let mut b = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        b.apply(&Move::new(E1, G1));
        assert_eq!(b.piece_at(G1), crate::model::WHITE_KING);
        assert_eq!(b.piece_at(F1), crate::model::WHITE_ROOK);
        assert_eq!(b.piece_at(H1), EMPTY);
        assert!(!b.can_castle(Color::WHITE, Wing::KING));
        assert!(!b.can_castle(Color::WHITE, Wing::QUEEN));
        assert!(b.can_castle(Color::BLACK, Wing::KING));

        b.apply(&Move::new(E8, C8));
        assert_eq!(b.piece_at(C8), crate::model::BLACK_KING);
        assert_eq!(b.piece_at(D8), crate::model::BLACK_ROOK);
        assert!(!b.can_castle(Color::BLACK, Wing::QUEEN));
    }

    #[test]
    fn capturing_a_rook_burns_the_right() {
        let mut b = board("r3k3/8/8/8/8/8/8/R3K2R b Qq - 0 1");
        // black rook grabs a1
        b.apply(&Move::new(A8, A1));
        assert!(!b.can_castle(Color::WHITE, Wing::QUEEN));
        assert!(!b.can_castle(Color::BLACK, Wing::QUEEN));
    }

    #[test]
    fn promotion_replaces_the_pawn() {
        let mut b = board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        b.apply(&Move::promoting(A7, A8, Piece::QUEEN));
        assert_eq!(b.piece_at(A8), crate::model::WHITE_QUEEN);
        assert!(b.piece_squares(Color::WHITE, Piece::PAWN).is_empty());
        assert_eq!(b.piece_squares(Color::WHITE, Piece::QUEEN), &[A8]);
    }

    #[test]
    fn clocks_follow_the_rules() {
        let mut b = Board::startpos();
        b.apply(&Move::new(G1, F3));
        assert_eq!(b.halfmove_clock, 1);
        assert_eq!(b.fullmove_number, 1);
        b.apply(&Move::new(G8, F6));
        assert_eq!(b.halfmove_clock, 2);
        assert_eq!(b.fullmove_number, 2);
        b.apply(&Move::new(E2, E4));
        assert_eq!(b.halfmove_clock, 0);
        assert_eq!(b.ep_target(), Some(E3));
    }

    #[test]
    fn randomized_walk_stays_consistent() {
        use rand::{Rng, SeedableRng, rngs::SmallRng};
        let mut rng = SmallRng::from_seed(*b"3.141592653589793238462643383279");
        for _ in 0..20 {
            let mut game = Game::new();
            for _ in 0..60 {
                let board = game.current_board().clone();
                let legals = board.legal_moves();
                if legals.is_empty() {
                    break;
                }
                let m = legals[rng.random_range(0..legals.len())];
                let mut probe = board.clone();
                probe.apply(&m);
                assert!(probe.is_consistent(), "after {m:?} on\n{board}");
                probe.undo().unwrap();
                assert_eq!(probe, board);
                game.apply_move(m);
            }
        }
    }
}
