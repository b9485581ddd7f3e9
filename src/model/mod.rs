use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumIter, FromRepr};

pub mod attacks;
pub mod game;
pub mod hash;
pub mod mailbox;
pub mod movegen;
pub mod moving;
pub mod perft;
pub mod polyglot;

pub use game::{EcoInfo, Game, GameNode, GameResult, NodeId, NodePool};
pub use mailbox::Board;

/// The 10x12 mailbox square layout.
///
/// Ranks 1-8 live in rows 2-9 and files a-h in columns 1-8; the index
/// of (file f, rank r), both zero-based, is `(r + 2) * 10 + (f + 1)`.
/// The surrounding border rows and columns hold the `FRINGE` sentinel,
/// so ray and knight walks detect the edge of the board with a single
/// cell read instead of a range check.
#[rustfmt::skip]
pub mod square {
    pub const A1: u8 = 21; pub const B1: u8 = 22; pub const C1: u8 = 23; pub const D1: u8 = 24;
    pub const E1: u8 = 25; pub const F1: u8 = 26; pub const G1: u8 = 27; pub const H1: u8 = 28;
    pub const A2: u8 = 31; pub const B2: u8 = 32; pub const C2: u8 = 33; pub const D2: u8 = 34;
    pub const E2: u8 = 35; pub const F2: u8 = 36; pub const G2: u8 = 37; pub const H2: u8 = 38;
    pub const A3: u8 = 41; pub const B3: u8 = 42; pub const C3: u8 = 43; pub const D3: u8 = 44;
    pub const E3: u8 = 45; pub const F3: u8 = 46; pub const G3: u8 = 47; pub const H3: u8 = 48;
    pub const A4: u8 = 51; pub const B4: u8 = 52; pub const C4: u8 = 53; pub const D4: u8 = 54;
    pub const E4: u8 = 55; pub const F4: u8 = 56; pub const G4: u8 = 57; pub const H4: u8 = 58;
    pub const A5: u8 = 61; pub const B5: u8 = 62; pub const C5: u8 = 63; pub const D5: u8 = 64;
    pub const E5: u8 = 65; pub const F5: u8 = 66; pub const G5: u8 = 67; pub const H5: u8 = 68;
    pub const A6: u8 = 71; pub const B6: u8 = 72; pub const C6: u8 = 73; pub const D6: u8 = 74;
    pub const E6: u8 = 75; pub const F6: u8 = 76; pub const G6: u8 = 77; pub const H6: u8 = 78;
    pub const A7: u8 = 81; pub const B7: u8 = 82; pub const C7: u8 = 83; pub const D7: u8 = 84;
    pub const E7: u8 = 85; pub const F7: u8 = 86; pub const G7: u8 = 87; pub const H7: u8 = 88;
    pub const A8: u8 = 91; pub const B8: u8 = 92; pub const C8: u8 = 93; pub const D8: u8 = 94;
    pub const E8: u8 = 95; pub const F8: u8 = 96; pub const G8: u8 = 97; pub const H8: u8 = 98;
}

/// Index of (file, rank), both in 0..8.
#[inline]
pub const fn square_at(file: u8, rank: u8) -> u8 {
    (rank + 2) * 10 + file + 1
}

/// Zero-based file of a playable mailbox index.
#[inline]
pub const fn file_of(idx: u8) -> u8 {
    idx % 10 - 1
}

/// Zero-based rank of a playable mailbox index.
#[inline]
pub const fn rank_of(idx: u8) -> u8 {
    idx / 10 - 2
}

/// Algebraic name of a playable square, e.g. `e4`.
pub fn square_name(idx: u8) -> String {
    let mut s = String::with_capacity(2);
    s.push((b'a' + file_of(idx)) as char);
    s.push((b'1' + rank_of(idx)) as char);
    s
}

// Cell encoding: bits 0..2 hold the piece kind, bit 7 the color.
pub const EMPTY: u8 = 0x00;
pub const FRINGE: u8 = 0xFF;
pub const BLACK_BIT: u8 = 0x80;

pub const WHITE_PAWN: u8 = 0x01;
pub const WHITE_KNIGHT: u8 = 0x02;
pub const WHITE_BISHOP: u8 = 0x03;
pub const WHITE_ROOK: u8 = 0x04;
pub const WHITE_QUEEN: u8 = 0x05;
pub const WHITE_KING: u8 = 0x06;

pub const BLACK_PAWN: u8 = 0x81;
pub const BLACK_KNIGHT: u8 = 0x82;
pub const BLACK_BISHOP: u8 = 0x83;
pub const BLACK_ROOK: u8 = 0x84;
pub const BLACK_QUEEN: u8 = 0x85;
pub const BLACK_KING: u8 = 0x86;

/// Piece kind held in a cell's low bits; 0 marks an empty cell.
#[inline]
pub const fn kind_of(cell: u8) -> u8 {
    cell & 0x07
}

/// FEN symbol for an occupied cell.
pub fn symbol_of(cell: u8) -> char {
    let c = match kind_of(cell) {
        1 => 'p',
        2 => 'n',
        3 => 'b',
        4 => 'r',
        5 => 'q',
        6 => 'k',
        _ => '?',
    };
    if cell & BLACK_BIT == 0 { c.to_ascii_uppercase() } else { c }
}

/// Cell value for a FEN symbol, `None` when the char names no piece.
pub fn cell_of_symbol(c: char) -> Option<u8> {
    let kind = match c.to_ascii_lowercase() {
        'p' => 1,
        'n' => 2,
        'b' => 3,
        'r' => 4,
        'q' => 5,
        'k' => 6,
        _ => return None,
    };
    if c.is_ascii_lowercase() { Some(kind | BLACK_BIT) } else { Some(kind) }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    WHITE = 0,
    BLACK = 1,
}

impl Color {
    #[inline]
    pub fn opp(self) -> Self {
        match self {
            Self::WHITE => Self::BLACK,
            Self::BLACK => Self::WHITE,
        }
    }

    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }
}

#[allow(non_camel_case_types)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    FromRepr, EnumIter, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Piece {
    PAWN = 1,
    KNIGHT = 2,
    BISHOP = 3,
    ROOK = 4,
    QUEEN = 5,
    KING = 6,
}

impl Piece {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }

    /// Upper-case letter of the piece; pawns render as `P` here even
    /// though SAN leaves them out.
    pub fn letter(self) -> char {
        match self {
            Self::PAWN => 'P',
            Self::KNIGHT => 'N',
            Self::BISHOP => 'B',
            Self::ROOK => 'R',
            Self::QUEEN => 'Q',
            Self::KING => 'K',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(Self::PAWN),
            'N' => Some(Self::KNIGHT),
            'B' => Some(Self::BISHOP),
            'R' => Some(Self::ROOK),
            'Q' => Some(Self::QUEEN),
            'K' => Some(Self::KING),
            _ => None,
        }
    }

    /// Cell value of this piece in the given color.
    #[inline]
    pub fn cell(self, color: Color) -> u8 {
        match color {
            Color::WHITE => self as u8,
            Color::BLACK => self as u8 | BLACK_BIT,
        }
    }
}

/// One half-move, identified by its squares alone.
///
/// A null move carries no squares and only toggles the side to move;
/// it appears in annotated PGN as `--` and in UCI form as `0000`.
/// Whether a move captures, castles, or takes en passant is not stored
/// here: the board it is applied to decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub promotion: Option<Piece>,
    pub is_null: bool,
}

impl Move {
    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to, promotion: None, is_null: false }
    }

    pub fn promoting(from: u8, to: u8, piece: Piece) -> Self {
        Self { from, to, promotion: Some(piece), is_null: false }
    }

    pub fn null() -> Self {
        Self { from: 0, to: 0, promotion: None, is_null: true }
    }
}

#[test]
fn square_layout_round_trips() {
    assert_eq!(square_at(0, 0), square::A1);
    assert_eq!(square_at(7, 7), square::H8);
    assert_eq!(square_at(4, 3), square::E4);
    for idx in [square::A1, square::E4, square::H8, square::C7] {
        assert_eq!(square_at(file_of(idx), rank_of(idx)), idx);
    }
    assert_eq!(square_name(square::G1), "g1");
    assert_eq!(square_name(square::A8), "a8");
}

#[test]
fn value_types_survive_serde() {
    let m = Move::promoting(square::E7, square::E8, Piece::QUEEN);
    let json = serde_json::to_string(&m).unwrap();
    let back: Move = serde_json::from_str(&json).unwrap();
    assert_eq!(m, back);
    assert_eq!(
        serde_json::to_string(&GameResult::Draw).unwrap(),
        "\"Draw\""
    );
}

#[test]
fn cell_symbols_round_trip() {
    for (cell, sym) in [
        (WHITE_PAWN, 'P'),
        (WHITE_KING, 'K'),
        (BLACK_QUEEN, 'q'),
        (BLACK_PAWN, 'p'),
    ] {
        assert_eq!(symbol_of(cell), sym);
        assert_eq!(cell_of_symbol(sym), Some(cell));
    }
    assert_eq!(cell_of_symbol('x'), None);
}
