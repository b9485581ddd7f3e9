//! Pseudo-legal and legal move generation.
//!
//! One filtered generator covers every caller: full enumeration for
//! perft, destination-and-kind queries for SAN rendering, and the PGN
//! reader's disambiguation probes. Legality is pseudo-legality plus
//! "your own king survives", checked on a throwaway copy so a board
//! shared immutably can still answer legality questions.

use crate::model::{
    Board, Color, Move, Piece,
    attacks::{BISHOP_DIRS, KNIGHT_DIRS, QUEEN_DIRS, ROOK_DIRS, pawn_captures, pawn_push},
    mailbox::Wing,
    square::*,
};

const ALL_KINDS: [Piece; 6] = [
    Piece::PAWN,
    Piece::KNIGHT,
    Piece::BISHOP,
    Piece::ROOK,
    Piece::QUEEN,
    Piece::KING,
];

const PROMOTION_ORDER: [Piece; 4] = [Piece::QUEEN, Piece::ROOK, Piece::BISHOP, Piece::KNIGHT];

#[inline]
fn keep(to: Option<u8>, idx: u8) -> bool {
    to.is_none_or(|t| t == idx)
}

impl Board {
    /// Every pseudo-legal move for the side to move, castling included.
    pub fn pseudo_legal_moves(&self) -> Vec<Move> {
        self.pseudo_legal_moves_filtered(None, None, None, true, self.turn)
    }

    /// The one move generator everything else narrows.
    ///
    /// `from`, `to` and `kind` each restrict the output when present;
    /// castling moves are produced only when `with_castles` is set
    /// (and never pass the `from` filter, they are keyed on `to`).
    pub fn pseudo_legal_moves_filtered(
        &self,
        from: Option<u8>,
        to: Option<u8>,
        kind: Option<Piece>,
        with_castles: bool,
        color: Color,
    ) -> Vec<Move> {
        let mut moves = Vec::new();
        let kinds: &[Piece] = match kind {
            Some(ref k) => std::slice::from_ref(k),
            None => &ALL_KINDS,
        };
        for &k in kinds {
            for &origin in self.piece_squares(color, k) {
                if from.is_some_and(|f| f != origin) {
                    continue;
                }
                match k {
                    Piece::PAWN => self.gen_pawn(origin, to, color, &mut moves),
                    Piece::KNIGHT => self.gen_steps(origin, to, color, &KNIGHT_DIRS, &mut moves),
                    Piece::KING => self.gen_steps(origin, to, color, &QUEEN_DIRS, &mut moves),
                    Piece::BISHOP => self.gen_rays(origin, to, color, &BISHOP_DIRS, &mut moves),
                    Piece::ROOK => self.gen_rays(origin, to, color, &ROOK_DIRS, &mut moves),
                    Piece::QUEEN => self.gen_rays(origin, to, color, &QUEEN_DIRS, &mut moves),
                }
            }
        }
        if with_castles {
            self.gen_castles(to, color, &mut moves);
        }
        moves
    }

    fn push_pawn(&self, from: u8, target: u8, color: Color, moves: &mut Vec<Move>) {
        let promotion_row = match color {
            Color::WHITE => 9,
            Color::BLACK => 2,
        };
        if target / 10 == promotion_row {
            for p in PROMOTION_ORDER {
                moves.push(Move::promoting(from, target, p));
            }
        } else {
            moves.push(Move::new(from, target));
        }
    }

    fn gen_pawn(&self, from: u8, to: Option<u8>, color: Color, moves: &mut Vec<Move>) {
        // diagonal captures
        for d in pawn_captures(color) {
            let target = (from as i32 + d) as u8;
            if !self.is_offboard(target)
                && !self.is_empty(target)
                && self.piece_color(target) != color
                && keep(to, target)
            {
                self.push_pawn(from, target, color, moves);
            }
        }
        // single and double push
        let push = pawn_push(color);
        let one_up = (from as i32 + push) as u8;
        if !self.is_offboard(one_up) && self.is_empty(one_up) {
            if keep(to, one_up) {
                self.push_pawn(from, one_up, color, moves);
            }
            let start_row = match color {
                Color::WHITE => 3,
                Color::BLACK => 8,
            };
            let two_up = (from as i32 + 2 * push) as u8;
            if from / 10 == start_row && self.is_empty(two_up) && keep(to, two_up) {
                moves.push(Move::new(from, two_up));
            }
        }
        // en-passant capture
        if self.ep_target != 0 && keep(to, self.ep_target) {
            for d in pawn_captures(color) {
                if self.ep_target as i32 - from as i32 == d {
                    moves.push(Move::new(from, self.ep_target));
                }
            }
        }
    }

    fn gen_steps(&self, from: u8, to: Option<u8>, color: Color, dirs: &[i32], moves: &mut Vec<Move>) {
        for &d in dirs {
            let target = (from as i32 + d) as u8;
            if self.is_offboard(target) {
                continue;
            }
            if (self.is_empty(target) || self.piece_color(target) != color) && keep(to, target) {
                moves.push(Move::new(from, target));
            }
        }
    }

    fn gen_rays(&self, from: u8, to: Option<u8>, color: Color, dirs: &[i32], moves: &mut Vec<Move>) {
        for &d in dirs {
            let mut target = (from as i32 + d) as u8;
            while !self.is_offboard(target) {
                if self.is_empty(target) {
                    if keep(to, target) {
                        moves.push(Move::new(from, target));
                    }
                } else {
                    if self.piece_color(target) != color && keep(to, target) {
                        moves.push(Move::new(from, target));
                    }
                    break;
                }
                target = (target as i32 + d) as u8;
            }
        }
    }

    /// Castling preconditions checked here: rights flag, king and rook
    /// on their home squares, empty path. Path safety belongs to the
    /// legality filter.
    fn gen_castles(&self, to: Option<u8>, color: Color, moves: &mut Vec<Move>) {
        use crate::model::{BLACK_KING, BLACK_ROOK, WHITE_KING, WHITE_ROOK};
        match color {
            Color::WHITE => {
                if self.can_castle(Color::WHITE, Wing::KING)
                    && self.piece_at(E1) == WHITE_KING
                    && self.piece_at(H1) == WHITE_ROOK
                    && self.is_empty(F1)
                    && self.is_empty(G1)
                    && keep(to, G1)
                {
                    moves.push(Move::new(E1, G1));
                }
                if self.can_castle(Color::WHITE, Wing::QUEEN)
                    && self.piece_at(E1) == WHITE_KING
                    && self.piece_at(A1) == WHITE_ROOK
                    && self.is_empty(D1)
                    && self.is_empty(C1)
                    && self.is_empty(B1)
                    && keep(to, C1)
                {
                    moves.push(Move::new(E1, C1));
                }
            }
            Color::BLACK => {
                if self.can_castle(Color::BLACK, Wing::KING)
                    && self.piece_at(E8) == BLACK_KING
                    && self.piece_at(H8) == BLACK_ROOK
                    && self.is_empty(F8)
                    && self.is_empty(G8)
                    && keep(to, G8)
                {
                    moves.push(Move::new(E8, G8));
                }
                if self.can_castle(Color::BLACK, Wing::QUEEN)
                    && self.piece_at(E8) == BLACK_KING
                    && self.piece_at(A8) == BLACK_ROOK
                    && self.is_empty(D8)
                    && self.is_empty(C8)
                    && self.is_empty(B8)
                    && keep(to, C8)
                {
                    moves.push(Move::new(E8, C8));
                }
            }
        }
    }

    /// Which castling this move performs on the current board, if any.
    pub(crate) fn castle_wing(&self, m: &Move) -> Option<(Color, Wing)> {
        use crate::model::{BLACK_KING, WHITE_KING};
        if m.is_null {
            return None;
        }
        if self.piece_at(m.from) == WHITE_KING && m.from == E1 {
            if m.to == G1 {
                return Some((Color::WHITE, Wing::KING));
            }
            if m.to == C1 {
                return Some((Color::WHITE, Wing::QUEEN));
            }
        }
        if self.piece_at(m.from) == BLACK_KING && m.from == E8 {
            if m.to == G8 {
                return Some((Color::BLACK, Wing::KING));
            }
            if m.to == C8 {
                return Some((Color::BLACK, Wing::QUEEN));
            }
        }
        None
    }

    /// Whether a pseudo-legal move is actually legal.
    ///
    /// Applies the move to a copy and checks the mover's king. For
    /// castling the squares the king starts on and passes over are
    /// probed with attack queries first; the landing square falls out
    /// of the ordinary post-apply check.
    pub fn is_pseudo_legal_move_legal(&self, m: &Move) -> bool {
        if m.is_null {
            return false;
        }
        let mover = self.piece_color(m.from);
        if let Some((color, wing)) = self.castle_wing(m) {
            let transit: &[u8] = match (color, wing) {
                (Color::WHITE, Wing::KING) => &[E1, F1],
                (Color::WHITE, Wing::QUEEN) => &[E1, D1],
                (Color::BLACK, Wing::KING) => &[E8, F8],
                (Color::BLACK, Wing::QUEEN) => &[E8, D8],
            };
            let enemy = color.opp();
            if transit.iter().any(|&sq| self.is_attacked(sq, enemy)) {
                return false;
            }
        }
        let mut probe = self.clone();
        probe.apply(m);
        match probe.king_square(mover) {
            Some(king) => !probe.is_attacked(king, mover.opp()),
            None => false,
        }
    }

    /// Filter a pseudo-legal batch down to the legal ones.
    pub fn legals_from_pseudos(&self, pseudos: &[Move]) -> Vec<Move> {
        pseudos
            .iter()
            .filter(|m| self.is_pseudo_legal_move_legal(m))
            .copied()
            .collect()
    }

    /// All legal moves for the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.legals_from_pseudos(&self.pseudo_legal_moves())
    }

    /// Legal moves of one piece kind into one destination square.
    pub fn legal_moves_filtered(&self, to: u8, kind: Piece) -> Vec<Move> {
        let pseudos = self.pseudo_legal_moves_filtered(None, Some(to), Some(kind), false, self.turn);
        self.legals_from_pseudos(&pseudos)
    }

    /// Legal moves originating on one square.
    pub fn legal_moves_from(&self, from: u8) -> Vec<Move> {
        let pseudos = self.pseudo_legal_moves_filtered(Some(from), None, None, true, self.turn);
        self.legals_from_pseudos(&pseudos)
    }

    /// Full legality check for an arbitrary move: it must come out of
    /// the generator and pass the legality filter.
    pub fn is_legal_move(&self, m: &Move) -> bool {
        if m.is_null {
            return false;
        }
        let pseudos =
            self.pseudo_legal_moves_filtered(Some(m.from), Some(m.to), None, true, self.turn);
        pseudos.contains(m) && self.is_pseudo_legal_move_legal(m)
    }

    /// Whether this move is a pawn reaching the last rank, regardless
    /// of the promotion piece stored on it.
    pub fn move_promotes(&self, m: &Move) -> bool {
        if m.is_null || self.piece_kind(m.from) != Piece::PAWN as u8 {
            return false;
        }
        let row = m.to / 10;
        match self.piece_color(m.from) {
            Color::WHITE => row == 9,
            Color::BLACK => row == 2,
        }
    }

    pub fn is_legal_and_promotes(&self, m: &Move) -> bool {
        self.move_promotes(m) && self.is_legal_move(m)
    }

    /// Whether the side to move stands in check.
    pub fn is_check(&self) -> bool {
        match self.king_square(self.turn) {
            Some(king) => self.is_attacked(king, self.turn.opp()),
            None => false,
        }
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && self.legal_moves().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_moves_from_the_start() {
        let b = Board::startpos();
        assert_eq!(b.pseudo_legal_moves().len(), 20);
        assert_eq!(b.legal_moves().len(), 20);
    }

    #[test]
    fn filters_narrow_the_generator() {
        let b = Board::startpos();
        let knight_moves =
            b.pseudo_legal_moves_filtered(None, None, Some(Piece::KNIGHT), false, Color::WHITE);
        assert_eq!(knight_moves.len(), 4);
        let to_f3 = b.pseudo_legal_moves_filtered(None, Some(F3), None, false, Color::WHITE);
        assert_eq!(to_f3.len(), 2); // Ng1-f3 and f2-f3
        let from_e2 = b.pseudo_legal_moves_filtered(Some(E2), None, None, false, Color::WHITE);
        assert_eq!(from_e2.len(), 2);
    }

    #[test]
    fn pinned_piece_may_not_move() {
        // the e4 knight shields the white king from the e8 rook
        let b = Board::from_fen("4r1k1/8/8/8/4N3/8/8/4K3 w - - 0 1").unwrap();
        let knight = b.legal_moves_from(E4);
        assert!(knight.is_empty());
        assert!(!b.legal_moves().is_empty());
    }

    #[test]
    fn check_evasion_only() {
        let b = Board::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        assert!(b.is_check());
        let legals = b.legal_moves();
        // taking the queen is forced: every quiet king move stays covered
        assert_eq!(legals.len(), 1);
        assert_eq!(legals[0], Move::new(E1, E2));
    }

    #[test]
    fn castling_generation_and_path_rules() {
        let b = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let legals = b.legal_moves();
        assert!(legals.contains(&Move::new(E1, G1)));
        assert!(legals.contains(&Move::new(E1, C1)));

        // a rook covering f1 forbids kingside castling but not queenside
        let b = Board::from_fen("4k3/8/8/8/8/8/5r2/R3K2R w KQ - 0 1").unwrap();
        let legals = b.legal_moves();
        assert!(!legals.contains(&Move::new(E1, G1)));
        assert!(legals.contains(&Move::new(E1, C1)));

        // while in check, no castling at all
        let b = Board::from_fen("4k3/8/8/8/8/8/4r3/R3K2R w KQ - 0 1").unwrap();
        let legals = b.legal_moves();
        assert!(!legals.contains(&Move::new(E1, G1)));
        assert!(!legals.contains(&Move::new(E1, C1)));
    }

    #[test]
    fn en_passant_is_generated() {
        let b = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let legals = b.legal_moves();
        assert!(legals.contains(&Move::new(E5, D6)));
    }

    #[test]
    fn promotion_fans_out_to_four_moves() {
        let b = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let promos: Vec<Move> = b
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == A7)
            .collect();
        assert_eq!(promos.len(), 4);
        assert!(promos.iter().all(|m| m.promotion.is_some()));
        assert!(b.move_promotes(&Move::new(A7, A8)));
    }

    #[test]
    fn mate_and_stalemate() {
        let mate = Board::from_fen("4k3/8/8/8/8/8/5PPP/r3K2R w - - 0 1").unwrap();
        assert!(mate.is_check());
        // back-rank style: the a1 rook pins the king which cannot step up
        let fools_mate =
            Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(fools_mate.is_checkmate());
        let stale = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(stale.is_stalemate());
        assert!(!stale.is_checkmate());
    }
}
