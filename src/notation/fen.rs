//! # Forsyth-Edwards Notation
//!
//! A FEN line is six whitespace-separated fields: piece placement
//! (eight `/`-separated ranks, a8 first, digits run-length encoding
//! the empty squares), side to move (`w`/`b`), castling rights (`-`
//! or a `KQkq` subset, upper case first), the en-passant target
//! square (`-` when none), the halfmove clock, and the fullmove
//! number. Plenty of real-world FENs drop the two clocks, so a
//! four-field form is accepted with the clocks defaulting to 0 and 1.
//!
//! Parsing is syntax first, semantics second: the grammar below
//! rejects malformed fields with a message naming the field, then
//! [`Board::from_fen`] checks the en-passant rank against the side to
//! move and runs the full consistency check before handing the board
//! out.

use std::sync::LazyLock;

use chumsky::{error::Rich, prelude::*};
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{
    Board, Color, EMPTY, cell_of_symbol, rank_of,
    mailbox::Wing,
    square_at, square_name, symbol_of,
};
use crate::notation::{PExtra, Parsable, parse_str, square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling-field shape: `-`, or up to two white letters followed by
/// up to two black letters. The file letters of X-FEN are tolerated
/// on input, though only `KQkq` rights are honored.
static FEN_CASTLES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(-|[KQABCDEFGH]{0,2}[kqabcdefgh]{0,2})$").unwrap());

/// Syntactic payload of a FEN line, before semantic validation.
#[derive(Debug, Clone)]
pub struct FenRecord {
    /// Eight ranks, a8-rank first, each expanded to eight cells.
    rows: Vec<Vec<u8>>,
    turn: Color,
    castling: String,
    ep: Option<u8>,
    halfmove: u32,
    fullmove: u32,
}

fn expand_row(row: &str) -> std::result::Result<Vec<u8>, String> {
    let mut cells = Vec::with_capacity(8);
    let mut previous_was_digit = false;
    for c in row.chars() {
        if let Some(d) = c.to_digit(10) {
            if previous_was_digit {
                return Err("two consecutive digits in a rank".to_string());
            }
            previous_was_digit = true;
            for _ in 0..d {
                cells.push(EMPTY);
            }
        } else {
            previous_was_digit = false;
            match cell_of_symbol(c) {
                Some(cell) => cells.push(cell),
                None => return Err(format!("'{c}' names no piece")),
            }
        }
    }
    if cells.len() != 8 {
        return Err(format!("rank covers {} squares instead of 8", cells.len()));
    }
    Ok(cells)
}

fn fen_row<'s>() -> impl Parser<'s, &'s str, Vec<u8>, PExtra<'s>> {
    one_of("12345678pnbrqkPNBRQK")
        .repeated()
        .at_least(1)
        .at_most(8)
        .collect::<String>()
        .try_map(|row: String, span| expand_row(&row).map_err(|msg| Rich::custom(span, msg)))
        .labelled("board rank")
}

fn fen_placement<'s>() -> impl Parser<'s, &'s str, Vec<Vec<u8>>, PExtra<'s>> {
    fen_row()
        .separated_by(just('/'))
        .exactly(8)
        .collect::<Vec<_>>()
        .labelled("piece placement")
}

fn fen_turn<'s>() -> impl Parser<'s, &'s str, Color, PExtra<'s>> {
    choice((just('w').to(Color::WHITE), just('b').to(Color::BLACK))).labelled("side to move")
}

fn fen_castling<'s>() -> impl Parser<'s, &'s str, String, PExtra<'s>> {
    one_of("KQkqABCDEFGHabcdefgh-")
        .repeated()
        .at_least(1)
        .at_most(4)
        .collect::<String>()
        .try_map(|s: String, span| {
            if FEN_CASTLES_REGEX.is_match(&s) {
                Ok(s)
            } else {
                Err(Rich::custom(span, "castling encoding is invalid"))
            }
        })
        .labelled("castling rights")
}

fn fen_ep<'s>() -> impl Parser<'s, &'s str, Option<u8>, PExtra<'s>> {
    choice((just('-').to(None), square().map(Some))).labelled("en-passant square")
}

fn fen_int<'s>() -> impl Parser<'s, &'s str, u32, PExtra<'s>> {
    text::int(10)
        .try_map(|s: &str, span| {
            s.parse::<u32>()
                .map_err(|_| Rich::custom(span, "clock is not a valid number"))
        })
        .labelled("move clock")
}

fn sp<'s>() -> impl Parser<'s, &'s str, (), PExtra<'s>> {
    text::whitespace().at_least(1)
}

impl Parsable for FenRecord {
    fn parser<'s>() -> impl Parser<'s, &'s str, Self, PExtra<'s>> {
        group((
            fen_placement(),
            sp().ignore_then(fen_turn()),
            sp().ignore_then(fen_castling()),
            sp().ignore_then(fen_ep()),
            sp().ignore_then(fen_int()).or_not(),
            sp().ignore_then(fen_int()).or_not(),
        ))
        .map(|(rows, turn, castling, ep, halfmove, fullmove)| FenRecord {
            rows,
            turn,
            castling,
            ep,
            halfmove: halfmove.unwrap_or(0),
            fullmove: fullmove.unwrap_or(1),
        })
    }
}

impl Board {
    /// Build a board from a FEN line, validating both the syntax and
    /// the resulting position.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let record: FenRecord = parse_str(fen.trim())?;

        let mut board = Board::new();
        for (i, row) in record.rows.iter().enumerate() {
            let rank = 7 - i as u8;
            for (f, &cell) in row.iter().enumerate() {
                board.board[square_at(f as u8, rank) as usize] = cell;
            }
        }
        board.turn = record.turn;
        for c in record.castling.chars() {
            match c {
                'K' => board.set_castle(Color::WHITE, Wing::KING, true),
                'Q' => board.set_castle(Color::WHITE, Wing::QUEEN, true),
                'k' => board.set_castle(Color::BLACK, Wing::KING, true),
                'q' => board.set_castle(Color::BLACK, Wing::QUEEN, true),
                _ => {}
            }
        }
        if let Some(ep) = record.ep {
            // the target sits behind the pawn that just double-pushed
            let expected_rank = match record.turn {
                Color::WHITE => 5,
                Color::BLACK => 2,
            };
            if rank_of(ep) != expected_rank {
                return Err(Error::Parse(format!(
                    "fen: en-passant square {} does not fit the side to move",
                    square_name(ep)
                )));
            }
            board.ep_target = ep;
        }
        board.halfmove_clock = record.halfmove;
        board.fullmove_number = record.fullmove;
        board.init_piece_list();

        if !board.is_consistent() {
            return Err(Error::InconsistentPosition(
                "position from fen fails the consistency check".to_string(),
            ));
        }
        Ok(board)
    }

    /// Render the position as a six-field FEN line.
    pub fn fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let cell = self.board[square_at(file, rank) as usize];
                if cell == EMPTY {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        out.push(char::from_digit(empty_run, 10).unwrap_or('0'));
                        empty_run = 0;
                    }
                    out.push(symbol_of(cell));
                }
            }
            if empty_run > 0 {
                out.push(char::from_digit(empty_run, 10).unwrap_or('0'));
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.turn {
            Color::WHITE => 'w',
            Color::BLACK => 'b',
        });

        out.push(' ');
        let rights: String = [
            (Color::WHITE, Wing::KING, 'K'),
            (Color::WHITE, Wing::QUEEN, 'Q'),
            (Color::BLACK, Wing::KING, 'k'),
            (Color::BLACK, Wing::QUEEN, 'q'),
        ]
        .iter()
        .filter(|(c, w, _)| self.can_castle(*c, *w))
        .map(|&(_, _, letter)| letter)
        .collect();
        if rights.is_empty() {
            out.push('-');
        } else {
            out.push_str(&rights);
        }

        out.push(' ');
        match self.ep_target() {
            Some(ep) => out.push_str(&square_name(ep)),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::square::*;

    #[test]
    fn startpos_round_trips() {
        let b = Board::from_fen(STARTING_FEN).unwrap();
        assert_eq!(b, Board::startpos());
        assert_eq!(b.fen(), STARTING_FEN);
    }

    #[test]
    fn positions_round_trip() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
            "8/3K4/2p5/p2b2r1/5k2/8/8/1q6 b - - 1 67",
        ] {
            let b = Board::from_fen(fen).unwrap();
            assert_eq!(b.fen(), fen, "round trip of {fen}");
            assert_eq!(Board::from_fen(&b.fen()).unwrap(), b);
        }
    }

    #[test]
    fn four_field_form_defaults_the_clocks() {
        let b = Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -")
            .unwrap();
        assert_eq!(b.halfmove_clock, 0);
        assert_eq!(b.fullmove_number, 1);
        // five fields: halfmove present, fullmove defaulted
        let b = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 17").unwrap();
        assert_eq!(b.halfmove_clock, 17);
        assert_eq!(b.fullmove_number, 1);
    }

    #[test]
    fn structural_rejects() {
        // seven ranks
        assert!(Board::from_fen("8/8/8/8/8/8/4K2k w - - 0 1").is_err());
        // consecutive digits
        assert!(Board::from_fen("44/8/8/8/8/8/8/4K2k w - - 0 1").is_err());
        // rank does not sum to 8
        assert!(Board::from_fen("7/8/8/8/8/8/8/4K2k w - - 0 1").is_err());
        // bad piece letter
        assert!(Board::from_fen("4x3/8/8/8/8/8/8/4K2k w - - 0 1").is_err());
        // bad side to move
        assert!(Board::from_fen("8/8/8/8/8/8/8/4K2k x - - 0 1").is_err());
        // lowercase before uppercase in castling
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w kK - 0 1").is_err());
        // garbage clock
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - x 1").is_err());
    }

    #[test]
    fn semantic_rejects() {
        // en-passant rank contradicts the side to move
        assert!(Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d3 0 2").is_err());
        // two white kings
        assert!(matches!(
            Board::from_fen("4k3/8/8/8/8/8/8/3KK3 w - - 0 1"),
            Err(Error::InconsistentPosition(_))
        ));
        // adjacent kings
        assert!(Board::from_fen("8/8/8/8/3kK3/8/8/8 w - - 0 1").is_err());
        // side not to move in check
        assert!(Board::from_fen("4k3/4R3/8/8/8/8/8/4K3 w - - 0 1").is_err());
        // nine pawns
        assert!(Board::from_fen("4k3/8/8/8/8/P7/PPPPPPPP/4K3 w - - 0 1").is_err());
        // ten queens cannot come from eight pawns
        assert!(Board::from_fen("4k3/8/8/8/8/QQQQQQQQ/QQ6/4K3 w - - 0 1").is_err());
        // castling right without the rook at home
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1").is_err());
    }

    #[test]
    fn ep_square_is_kept_verbatim() {
        let b = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
            .unwrap();
        assert_eq!(b.ep_target(), Some(E3));
        assert!(b.fen().contains(" e3 "));
    }
}
