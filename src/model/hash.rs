//! Polyglot hashing.
//!
//! Two related values are derived from the same random table. The
//! *position hash* covers piece placement only and is what the game
//! tree compares when looking for a position. The *Zobrist key* is the
//! full Polyglot book key: placement plus castling rights, a guarded
//! en-passant term, and the side to move. Both are computed lazily and
//! cached until the board mutates.

use crate::model::{
    BLACK_PAWN, Board, Color, EMPTY, WHITE_PAWN, file_of, rank_of,
    mailbox::Wing,
    polyglot::{POLYGLOT_RANDOM, RANDOM_CASTLE, RANDOM_EN_PASSANT, RANDOM_TURN},
    square::*,
};

/// Polyglot piece ordering: black pawn, white pawn, black knight, ...
/// white king.
fn polyglot_kind(cell: u8) -> usize {
    let kind = (cell & 0x07) as usize;
    let white = cell & 0x80 == 0;
    (kind - 1) * 2 + usize::from(white)
}

impl Board {
    fn placement_hash(&self) -> u64 {
        let mut hash = 0;
        for idx in A1..=H8 {
            let cell = self.board[idx as usize];
            if cell == EMPTY || self.is_offboard(idx) {
                continue;
            }
            let offset = 64 * polyglot_kind(cell)
                + 8 * rank_of(idx) as usize
                + file_of(idx) as usize;
            hash ^= POLYGLOT_RANDOM[offset];
        }
        hash
    }

    /// Placement-only hash, cached.
    pub fn pos_hash(&mut self) -> u64 {
        if let Some(h) = self.pos_hash_cache {
            return h;
        }
        let h = self.placement_hash();
        self.pos_hash_cache = Some(h);
        h
    }

    /// The Polyglot book key, cached.
    ///
    /// The en-passant file is XORed in only when a pawn of the side to
    /// move actually stands next to the target and could capture; a
    /// double push with nobody there leaves the key untouched, exactly
    /// as Polyglot defines it.
    pub fn zobrist(&mut self) -> u64 {
        if let Some(h) = self.zobrist_cache {
            return h;
        }
        let mut hash = self.placement_hash();

        if let Some(ep) = self.ep_target() {
            let reachable = match self.turn {
                Color::WHITE => {
                    self.piece_at((ep as i32 - 11) as u8) == WHITE_PAWN
                        || self.piece_at((ep as i32 - 9) as u8) == WHITE_PAWN
                }
                Color::BLACK => {
                    self.piece_at(ep + 11) == BLACK_PAWN || self.piece_at(ep + 9) == BLACK_PAWN
                }
            };
            if reachable {
                hash ^= POLYGLOT_RANDOM[RANDOM_EN_PASSANT + file_of(ep) as usize];
            }
        }

        let rights = [
            (Color::WHITE, Wing::KING),
            (Color::WHITE, Wing::QUEEN),
            (Color::BLACK, Wing::KING),
            (Color::BLACK, Wing::QUEEN),
        ];
        for (i, (color, wing)) in rights.into_iter().enumerate() {
            if self.can_castle(color, wing) {
                hash ^= POLYGLOT_RANDOM[RANDOM_CASTLE + i];
            }
        }

        if self.turn == Color::WHITE {
            hash ^= POLYGLOT_RANDOM[RANDOM_TURN];
        }

        self.zobrist_cache = Some(hash);
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Move;

    fn key(fen: &str) -> u64 {
        Board::from_fen(fen).unwrap().zobrist()
    }

    /// Reference keys published with the Polyglot book format.
    #[test]
    fn polyglot_reference_keys() {
        assert_eq!(
            key("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            0x463B96181691FC9C
        );
        assert_eq!(
            key("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"),
            0x823C9B50FD114196
        );
        assert_eq!(
            key("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2"),
            0x0756B94461C50FB0
        );
        assert_eq!(
            key("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2"),
            0x662FAFB965DB29D4
        );
        assert_eq!(
            key("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"),
            0x22A48B5A8E47FF78
        );
        // after 1.a4 b5 2.h4 b4 3.c4 the en-passant term counts, black
        // really can take on c3
        assert_eq!(
            key("rnbqkbnr/p1pppppp/8/8/PpP4P/8/1P1PPPP1/RNBQKBNR b KQkq c3 0 3"),
            0x3C8123EA7B067637
        );
        assert_eq!(
            key("rnbqkbnr/p1pppppp/8/8/P6P/R1p5/1P1PPPP1/1NBQKBNR b Kkq - 0 4"),
            0x5C3F9B829B279560
        );
    }

    #[test]
    fn hashes_follow_position_equality() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let mut a = Board::from_fen(fen).unwrap();
        let mut b = Board::from_fen(fen).unwrap();
        assert_eq!(a.zobrist(), b.zobrist());
        assert_eq!(a.pos_hash(), b.pos_hash());
        let mut start = Board::startpos();
        assert_ne!(a.zobrist(), start.zobrist());
        assert_ne!(a.pos_hash(), start.pos_hash());
    }

    #[test]
    fn caches_invalidate_on_mutation() {
        let mut b = Board::startpos();
        let before = b.zobrist();
        b.apply(&Move::new(G1, F3));
        let after = b.zobrist();
        assert_ne!(before, after);
        b.undo().unwrap();
        assert_eq!(b.zobrist(), before);
    }

    #[test]
    fn ep_term_needs_a_capturer() {
        // 1.e4 against a closed sleeve: no black pawn can take on e3,
        // so the key must equal the same position without the ep field
        let with_ep = key("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        let without =
            key("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        assert_eq!(with_ep, without);
    }
}
