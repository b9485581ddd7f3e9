//! Rendering moves in standard algebraic notation.
//!
//! The move handed in must be legal on the board; SAN has no spelling
//! for anything else. Check and mate suffixes are evaluated on a
//! throwaway copy so the board's one-shot undo buffer stays intact.

use crate::model::{Board, Color, Move, Piece, file_of, rank_of, square_name};

impl Board {
    /// Standard algebraic notation of a legal move.
    pub fn san(&self, m: &Move) -> String {
        if m.is_null {
            return "--".to_string();
        }

        let mut probe = self.clone();
        probe.apply(m);
        let is_mate = probe.is_checkmate();
        let is_check = probe.is_check();

        let mut out = String::new();
        if let Some((_, wing)) = self.castle_wing(m) {
            out.push_str(match wing {
                crate::model::mailbox::Wing::KING => "O-O",
                crate::model::mailbox::Wing::QUEEN => "O-O-O",
            });
        } else {
            let Some((color, kind)) = self.piece(m.from) else {
                return out;
            };
            if kind != Piece::PAWN {
                out.push(kind.letter());
                self.push_disambiguation(m, color, kind, &mut out);
            }

            let takes_ep =
                kind == Piece::PAWN && self.ep_target != 0 && m.to == self.ep_target;
            if !self.is_empty(m.to) || takes_ep {
                if kind == Piece::PAWN {
                    out.push((b'a' + file_of(m.from)) as char);
                }
                out.push('x');
            }
            out.push_str(&square_name(m.to));
            if let Some(p) = m.promotion {
                out.push('=');
                out.push(p.letter());
            }
        }

        if is_mate {
            out.push('#');
        } else if is_check {
            out.push('+');
        }
        out
    }

    /// Origin coordinates when another piece of the same kind could
    /// also legally reach the destination.
    ///
    /// File disambiguation is preferred; a competitor leaving from the
    /// same file forces the rank; with both kinds of clash the full
    /// origin square is spelled out.
    fn push_disambiguation(&self, m: &Move, color: Color, kind: Piece, out: &mut String) {
        if self.piece_squares(color, kind).len() <= 1 {
            return;
        }
        let legals = self.legal_moves_filtered(m.to, kind);
        let mut file_clash = false;
        let mut rank_clash = false;
        for other in legals.iter().filter(|o| o.from != m.from) {
            if file_of(other.from) != file_of(m.from) {
                file_clash = true;
            } else {
                rank_clash = true;
            }
        }
        if !file_clash && !rank_clash {
            return;
        }
        let file = (b'a' + file_of(m.from)) as char;
        let rank = (b'1' + rank_of(m.from)) as char;
        if file_clash && !rank_clash {
            out.push(file);
        } else if rank_clash && !file_clash {
            out.push(rank);
        } else {
            out.push(file);
            out.push(rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::square::*;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    #[test]
    fn plain_moves() {
        let b = Board::startpos();
        assert_eq!(b.san(&Move::new(E2, E4)), "e4");
        assert_eq!(b.san(&Move::new(G1, F3)), "Nf3");
        assert_eq!(b.san(&Move::null()), "--");
    }

    #[test]
    fn captures() {
        let b = board("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        assert_eq!(b.san(&Move::new(E4, D5)), "exd5");
        let b = board("4k3/8/8/3r4/8/8/8/3RK3 w - - 0 1");
        assert_eq!(b.san(&Move::new(D1, D5)), "Rxd5");
    }

    #[test]
    fn en_passant_capture_is_spelled_like_a_capture() {
        let b = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        assert_eq!(b.san(&Move::new(E5, D6)), "exd6");
    }

    #[test]
    fn castling() {
        let b = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(b.san(&Move::new(E1, G1)), "O-O");
        assert_eq!(b.san(&Move::new(E1, C1)), "O-O-O");
    }

    #[test]
    fn file_disambiguation() {
        let b = board("4k3/8/8/R6R/8/8/8/4K3 w - - 0 1");
        assert_eq!(b.san(&Move::new(A5, B5)), "Rab5");
        assert_eq!(b.san(&Move::new(H5, B5)), "Rhb5");
    }

    #[test]
    fn rank_disambiguation() {
        let b = board("4k3/8/8/8/R7/8/R7/4K3 w - - 0 1");
        assert_eq!(b.san(&Move::new(A4, A3)), "R4a3");
        assert_eq!(b.san(&Move::new(A2, A3)), "R2a3");
    }

    #[test]
    fn full_disambiguation_with_three_queens() {
        let b = board("4k3/8/8/8/Q2Q4/8/8/Q3K3 w - - 0 1");
        // a4, d4 and a1 all reach d1
        assert_eq!(b.san(&Move::new(A4, D1)), "Qa4d1");
    }

    #[test]
    fn pinned_competitor_needs_no_disambiguation() {
        // the e5 knight is pinned to its king and cannot legally reach
        // f3, so the d2 knight needs no origin hint
        let b = board("4k3/4r3/8/4N3/8/8/3N4/4K3 w - - 0 1");
        assert_eq!(b.san(&Move::new(D2, F3)), "Nf3");
    }

    #[test]
    fn promotions() {
        let b = board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(b.san(&Move::promoting(A7, A8, Piece::QUEEN)), "a8=Q+");
        assert_eq!(b.san(&Move::promoting(A7, A8, Piece::KNIGHT)), "a8=N");
        let b = board("3r2k1/4P3/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(b.san(&Move::promoting(E7, D8, Piece::QUEEN)), "exd8=Q+");
    }

    #[test]
    fn mate_suffix() {
        let b = board("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        assert_eq!(b.san(&Move::new(A1, A8)), "Ra8#");
    }
}
