//! The UCI move form: origin square, destination square, optional
//! promotion letter. `0000` is the null move. Engines emit lowercase
//! promotion letters; both cases are accepted on input.

use std::fmt;

use chumsky::prelude::*;

use crate::error::Result;
use crate::model::{Move, Piece, square_name};
use crate::notation::{PExtra, Parsable, parse_str, square};

impl Parsable for Move {
    fn parser<'s>() -> impl Parser<'s, &'s str, Self, PExtra<'s>> {
        let promotion = one_of("nbrqNBRQ").map(|c: char| match c.to_ascii_uppercase() {
            'N' => Piece::KNIGHT,
            'B' => Piece::BISHOP,
            'R' => Piece::ROOK,
            _ => Piece::QUEEN,
        });
        choice((
            just("0000").to(Move::null()),
            group((square(), square(), promotion.or_not())).map(|(from, to, promo)| {
                match promo {
                    Some(p) => Move::promoting(from, to, p),
                    None => Move::new(from, to),
                }
            }),
        ))
        .labelled("uci move")
    }
}

impl Move {
    /// Parse a UCI move string such as `g1f3`, `e7e8q`, or `0000`.
    pub fn from_uci(uci: &str) -> Result<Self> {
        parse_str(uci.trim())
    }

    /// Render the move in UCI form.
    pub fn uci(&self) -> String {
        if self.is_null {
            return "0000".to_string();
        }
        let mut out = square_name(self.from);
        out.push_str(&square_name(self.to));
        if let Some(p) = self.promotion {
            out.push(p.letter().to_ascii_lowercase());
        }
        out
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::square::*;

    #[test]
    fn uci_round_trips() {
        for s in ["g1f3", "e2e4", "a7a8q", "h2h1n", "0000"] {
            let m = Move::from_uci(s).unwrap();
            assert_eq!(m.uci(), s, "round trip of {s}");
        }
        assert_eq!(Move::from_uci("g1f3").unwrap(), Move::new(G1, F3));
        assert_eq!(
            Move::from_uci("e7e8Q").unwrap(),
            Move::promoting(E7, E8, Piece::QUEEN)
        );
        assert!(Move::from_uci("0000").unwrap().is_null);
    }

    #[test]
    fn uci_rejects_garbage() {
        for s in ["", "e2", "e2e9", "i2e4", "e2e4x", "e2e4qq", "00", "こんにちは"] {
            assert!(Move::from_uci(s).is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn display_matches_uci() {
        let m = Move::promoting(E7, E8, Piece::ROOK);
        assert_eq!(format!("{m}"), "e7e8r");
    }
}
