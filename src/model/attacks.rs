//! Attack detection over the mailbox.
//!
//! `ATTACK_TABLE` is indexed by the absolute difference of two mailbox
//! indices and answers, as a bitmask, which piece kinds could possibly
//! reach across that distance. It is a pure geometry filter: a hit
//! still has to be confirmed by generating the candidate's moves, but
//! a miss rules the pair out with a single table read.

use crate::model::{Board, Color, Piece, square::*};

const ATK_KNIGHT: u8 = 1 << 0;
const ATK_BISHOP: u8 = 1 << 1;
const ATK_ROOK: u8 = 1 << 2;
const ATK_QUEEN: u8 = 1 << 3;
const ATK_KING: u8 = 1 << 4;

/// Which piece kinds can span a given |mailbox distance|.
#[rustfmt::skip]
pub(crate) const ATTACK_TABLE: [u8; 78] = [
    0x00, 0x1C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x01, 0x1A,
    0x1C, 0x1A, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x01,
    0x0C, 0x01, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00,
    0x0C, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00,
    0x0C, 0x00, 0x00, 0x00, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00,
    0x0C, 0x00, 0x00, 0x00, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00,
    0x0C, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00,
    0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A,
];

/// Knight jumps.
pub(crate) const KNIGHT_DIRS: [i32; 8] = [-21, -12, 8, 19, 21, 12, -8, -19];
/// Diagonal rays.
pub(crate) const BISHOP_DIRS: [i32; 4] = [9, 11, -11, -9];
/// Orthogonal rays.
pub(crate) const ROOK_DIRS: [i32; 4] = [10, -10, 1, -1];
/// All eight directions, shared by queen and king.
pub(crate) const QUEEN_DIRS: [i32; 8] = [9, 11, -11, -9, 10, -10, 1, -1];

/// Forward push direction for each color's pawns.
#[inline]
pub(crate) fn pawn_push(color: Color) -> i32 {
    match color {
        Color::WHITE => 10,
        Color::BLACK => -10,
    }
}

/// Capture directions for each color's pawns.
#[inline]
pub(crate) fn pawn_captures(color: Color) -> [i32; 2] {
    match color {
        Color::WHITE => [9, 11],
        Color::BLACK => [-9, -11],
    }
}

fn table_mask(kind: Piece) -> u8 {
    match kind {
        Piece::KNIGHT => ATK_KNIGHT,
        Piece::BISHOP => ATK_BISHOP,
        Piece::ROOK => ATK_ROOK,
        Piece::QUEEN => ATK_QUEEN,
        Piece::KING => ATK_KING,
        Piece::PAWN => 0,
    }
}

impl Board {
    /// Whether `idx` is attacked by any piece of `by`.
    ///
    /// Pawns are checked directly on the two capture diagonals; every
    /// other piece goes through the distance table and, on a hit, a
    /// confirmation run of its pseudo-legal moves. En-passant captures
    /// are not modeled here, they cannot give check by themselves.
    pub fn is_attacked(&self, idx: u8, by: Color) -> bool {
        assert!(!self.is_offboard(idx), "is_attacked on fringe square {idx}");

        // A white pawn attacks from one rank below, a black one from
        // one rank above.
        let pawn_origin = match by {
            Color::WHITE => [-9, -11],
            Color::BLACK => [9, 11],
        };
        let pawn_cell = Piece::PAWN.cell(by);
        for d in pawn_origin {
            let from = (idx as i32 + d) as usize;
            if self.board[from] == pawn_cell {
                return true;
            }
        }

        for from in A1..=H8 {
            if from == idx || self.is_offboard(from) || self.is_empty(from) {
                continue;
            }
            if self.piece_color(from) != by {
                continue;
            }
            let Some((_, kind)) = self.piece(from) else { continue };
            if kind == Piece::PAWN {
                continue;
            }
            let distance = (idx as i32 - from as i32).unsigned_abs() as usize;
            if ATTACK_TABLE[distance] & table_mask(kind) == 0 {
                continue;
            }
            let reach = self.pseudo_legal_moves_filtered(Some(from), Some(idx), Some(kind), false, by);
            if !reach.is_empty() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Board;

    #[test]
    fn initial_position_attacks() {
        let b = Board::startpos();
        // d3 is hit by the c2 and e2 pawns
        assert!(b.is_attacked(D3, Color::WHITE));
        // f3 is reachable by the g1 knight
        assert!(b.is_attacked(F3, Color::WHITE));
        // e4 is nobody's square yet
        assert!(!b.is_attacked(E4, Color::WHITE));
        assert!(!b.is_attacked(E4, Color::BLACK));
        // black's knight covers f6, nothing of black's reaches e2
        assert!(b.is_attacked(F6, Color::BLACK));
        assert!(!b.is_attacked(E2, Color::BLACK));
    }

    #[test]
    fn sliders_stop_at_blockers() {
        let b = Board::from_fen("4k3/8/8/8/8/8/4p3/4R2K w - - 0 1").unwrap();
        // the rook reaches the enemy pawn on e2 but not past it
        assert!(b.is_attacked(E2, Color::WHITE));
        assert!(!b.is_attacked(E3, Color::WHITE));
        // along the first rank nothing blocks until h1
        assert!(b.is_attacked(G1, Color::WHITE));
        // nobody reaches f2
        assert!(!b.is_attacked(F2, Color::WHITE));
    }

    #[test]
    fn pawn_attack_diagonals() {
        let b = Board::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        assert!(b.is_attacked(D5, Color::WHITE));
        assert!(b.is_attacked(F5, Color::WHITE));
        assert!(!b.is_attacked(E5, Color::WHITE));
        assert!(b.is_attacked(E4, Color::BLACK));
        assert!(b.is_attacked(C4, Color::BLACK));
    }
}
