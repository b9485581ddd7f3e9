//! String notations.
//!
//! FEN and the UCI move form are parsed with combinators behind one
//! small [`Parsable`] trait; SAN rendering lives in [`san`] next to
//! them. The PGN movetext tokenizer is deliberately *not* here: it is
//! a hand-rolled character classifier in [`crate::pgn`], because the
//! notation found in real databases is too messy for a grammar.

pub mod coordinate;
pub mod fen;
pub mod san;

use chumsky::{error::Rich, extra, prelude::*};

use crate::error::{Error, Result};
use crate::model::square_at;

pub(crate) type PExtra<'s> = extra::Err<Rich<'s, char>>;

/// A value with a canonical string grammar.
pub trait Parsable: Sized {
    fn parser<'s>() -> impl Parser<'s, &'s str, Self, PExtra<'s>>;
}

/// Run a [`Parsable`] grammar over an entire input string.
pub(crate) fn parse_str<T: Parsable>(input: &str) -> Result<T> {
    T::parser()
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let msg = errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Error::Parse(msg)
        })
}

/// Zero-based file from its letter.
pub(crate) fn board_file<'s>() -> impl Parser<'s, &'s str, u8, PExtra<'s>> {
    one_of('a'..='h').map(|c: char| c as u8 - b'a')
}

/// Zero-based rank from its digit.
pub(crate) fn board_rank<'s>() -> impl Parser<'s, &'s str, u8, PExtra<'s>> {
    one_of('1'..='8').map(|c: char| c as u8 - b'1')
}

/// A square in algebraic coordinates, as a mailbox index.
pub(crate) fn square<'s>() -> impl Parser<'s, &'s str, u8, PExtra<'s>> {
    board_file()
        .then(board_rank())
        .map(|(f, r)| square_at(f, r))
}

#[test]
fn square_parser_round_trips() {
    use crate::model::square_name;
    for idx in [21u8, 28, 55, 91, 98, 64] {
        let name = square_name(idx);
        let parsed = square()
            .then_ignore(end())
            .parse(&name)
            .into_result()
            .unwrap_or_else(|_| panic!("unable to parse {name}"));
        assert_eq!(parsed, idx);
    }
    assert!(square().then_ignore(end()).parse("i9").has_errors());
}
