//! The movetext tokenizer.
//!
//! PGN movetext from real databases is too irregular for a grammar,
//! so this is a hand-written character classifier: skip spaces and
//! dots, look at the next character, decide. Move tokens are then
//! parsed in place and resolved against the current position through
//! the move engine, which is the only way SAN can be resolved at all
//! (its meaning depends on whose turn it is and what is pinned).
//!
//! Two failure grades matter. A token that never looked like a move
//! is *malformed*: the classifier steps over it and scanning goes on,
//! which is how stray text inside damaged files is survived. A token
//! that read like a move but matches no unique legal move is
//! *unresolvable*: that is a real contradiction with the position,
//! and the caller abandons the rest of the game.

use crate::model::{
    BLACK_KING, BLACK_PAWN, Board, Color, Game, Move, NodeId, Piece, WHITE_KING, WHITE_PAWN,
    file_of, rank_of, square::*, square_at,
};
use crate::pgn::nag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    PawnMove,
    PieceMove(Piece),
    Castle,
    OpenVariation,
    CloseVariation,
    Nag,
    OpenComment,
    ResWhiteWin,
    ResBlackWin,
    ResDraw,
    ResUndefined,
    Check,
    NullMove,
    Eol,
}

#[derive(Debug)]
pub(crate) enum SanError {
    /// Not a move token after all; the index has stepped past it.
    Malformed,
    /// Shaped like a move but no unique legal move matches it.
    Unresolvable(String),
}

/// Skip filler, classify the next token. Leaves `idx` on the token's
/// first character (except for filler, which is consumed).
pub(crate) fn next_token(chars: &[char], idx: &mut usize) -> Token {
    let n = chars.len();
    while *idx < n {
        let c = chars[*idx];
        if c == ' ' || c == '.' {
            *idx += 1;
            continue;
        }
        if c.is_ascii_digit() {
            if c == '1' && *idx + 2 < n {
                if chars[*idx + 1] == '-' && chars[*idx + 2] == '0' {
                    return Token::ResWhiteWin;
                }
                if chars[*idx + 1] == '/'
                    && *idx + 6 < n
                    && chars[*idx..*idx + 7] == ['1', '/', '2', '-', '1', '/', '2']
                {
                    return Token::ResDraw;
                }
            }
            // irregular castling spelled with zeros
            if c == '0' && *idx + 2 < n && chars[*idx + 1] == '-' {
                if chars[*idx + 2] == '1' {
                    return Token::ResBlackWin;
                }
                if chars[*idx + 2] == '0' {
                    return Token::Castle;
                }
            }
            // a move number; step over digit by digit
            *idx += 1;
            continue;
        }
        match c {
            'a'..='h' => return Token::PawnMove,
            'O' => return Token::Castle,
            'R' => return Token::PieceMove(Piece::ROOK),
            'N' => return Token::PieceMove(Piece::KNIGHT),
            'B' => return Token::PieceMove(Piece::BISHOP),
            'Q' => return Token::PieceMove(Piece::QUEEN),
            'K' => return Token::PieceMove(Piece::KING),
            '+' => return Token::Check,
            '(' => return Token::OpenVariation,
            ')' => return Token::CloseVariation,
            '$' | '!' | '?' => return Token::Nag,
            '{' => return Token::OpenComment,
            '*' => return Token::ResUndefined,
            '-' if *idx + 1 < n && chars[*idx + 1] == '-' => return Token::NullMove,
            _ => {}
        }
        // nothing usable; keep looking
        *idx += 1;
    }
    Token::Eol
}

/// Append a move below the cursor and advance the cursor onto it.
pub(crate) fn emit(game: &mut Game, cursor: &mut NodeId, m: Move) {
    let mut board = game.node(*cursor).board().clone();
    board.apply(&m);
    *cursor = game.append_child(*cursor, m, board);
}

#[inline]
fn is_file(c: char) -> bool {
    c.is_ascii_lowercase() && ('a'..='h').contains(&c)
}

#[inline]
fn is_rank(c: char) -> bool {
    ('1'..='8').contains(&c)
}

fn promotion_at(chars: &[char], idx: usize) -> Option<Piece> {
    if idx + 1 < chars.len() && chars[idx] == '=' {
        Piece::from_letter(chars[idx + 1]).filter(|p| {
            matches!(p, Piece::KNIGHT | Piece::BISHOP | Piece::ROOK | Piece::QUEEN)
        })
    } else {
        None
    }
}

/// `[file][x[file]][rank][=Piece]`. The origin square is inferred
/// from the position: captures come from the adjacent rank, pushes
/// from the nearest own pawn backward along the file.
pub(crate) fn parse_pawn_move(
    game: &mut Game,
    cursor: &mut NodeId,
    chars: &[char],
    idx: &mut usize,
) -> Result<(), SanError> {
    let n = chars.len();
    let board = game.node(*cursor).board().clone();
    let col = chars[*idx] as u8 - b'a';

    if *idx + 1 < n && chars[*idx + 1] == 'x' {
        // capture like exd4, origin rank adjacent to the target rank
        if *idx + 3 >= n || !is_file(chars[*idx + 2]) || !is_rank(chars[*idx + 3]) {
            *idx += 2;
            return Err(SanError::Malformed);
        }
        let col_to = chars[*idx + 2] as u8 - b'a';
        let row_to = chars[*idx + 3] as u8 - b'1';
        let row_from = match board.turn {
            Color::WHITE if row_to >= 1
                && board.piece_at(square_at(col, row_to - 1)) == WHITE_PAWN =>
            {
                row_to - 1
            }
            Color::BLACK if row_to <= 6
                && board.piece_at(square_at(col, row_to + 1)) == BLACK_PAWN =>
            {
                row_to + 1
            }
            _ => {
                *idx += 4;
                return Err(SanError::Unresolvable(format!(
                    "no {}-file pawn can capture on {}{}",
                    (b'a' + col) as char,
                    (b'a' + col_to) as char,
                    row_to + 1
                )));
            }
        };
        let from = square_at(col, row_from);
        let to = square_at(col_to, row_to);
        let m = match promotion_at(chars, *idx + 4) {
            Some(p) => {
                *idx += 6;
                Move::promoting(from, to, p)
            }
            None => {
                *idx += 4;
                Move::new(from, to)
            }
        };
        emit(game, cursor, m);
        return Ok(());
    }

    // plain advance like e4 or e8=Q
    if *idx + 1 >= n || !is_rank(chars[*idx + 1]) {
        *idx += 2;
        return Err(SanError::Malformed);
    }
    let row_to = chars[*idx + 1] as u8 - b'1';
    let mut row_from: i32 = -1;
    match board.turn {
        Color::WHITE => {
            let mut r = row_to as i32 - 1;
            while r >= 1 {
                if board.piece_at(square_at(col, r as u8)) == WHITE_PAWN {
                    row_from = r;
                    break;
                }
                r -= 1;
            }
        }
        Color::BLACK => {
            let mut r = row_to as i32 + 1;
            while r <= 7 {
                if board.piece_at(square_at(col, r as u8)) == BLACK_PAWN {
                    row_from = r;
                    break;
                }
                r += 1;
            }
        }
    }
    if row_from < 0 {
        *idx += 2;
        return Err(SanError::Unresolvable(format!(
            "no pawn behind {}{}",
            (b'a' + col) as char,
            row_to + 1
        )));
    }
    let from = square_at(col, row_from as u8);
    let to = square_at(col, row_to);
    let m = match promotion_at(chars, *idx + 2) {
        Some(p) => {
            *idx += 4;
            Move::promoting(from, to, p)
        }
        None => {
            *idx += 2;
            Move::new(from, to)
        }
    };
    emit(game, cursor, m);
    Ok(())
}

/// `X[disambig]?[x]?[file][rank]`. Gather the coordinate characters
/// of the token, take the last file+rank pair as the destination, and
/// let any earlier file or rank narrow the candidates.
pub(crate) fn parse_piece_move(
    game: &mut Game,
    cursor: &mut NodeId,
    kind: Piece,
    chars: &[char],
    idx: &mut usize,
) -> Result<(), SanError> {
    *idx += 1; // past the piece letter
    let mut files: Vec<u8> = Vec::new();
    let mut ranks: Vec<u8> = Vec::new();
    while *idx < chars.len() {
        let c = chars[*idx];
        if c == 'x' {
            *idx += 1;
        } else if is_file(c) {
            files.push(c as u8 - b'a');
            *idx += 1;
        } else if is_rank(c) {
            ranks.push(c as u8 - b'1');
            *idx += 1;
        } else {
            break;
        }
    }
    if files.is_empty() || ranks.is_empty() || files.len() > 2 || ranks.len() > 2 {
        return Err(SanError::Malformed);
    }
    let to = square_at(files[files.len() - 1], ranks[ranks.len() - 1]);
    let from_file = if files.len() == 2 { Some(files[0]) } else { None };
    let from_rank = if ranks.len() == 2 { Some(ranks[0]) } else { None };
    create_piece_move(game, cursor, kind, to, from_file, from_rank)
}

/// Resolve through the engine: pseudo-legal candidates into the
/// destination, narrowed by the disambiguation characters; when more
/// than one survives, legality decides.
fn create_piece_move(
    game: &mut Game,
    cursor: &mut NodeId,
    kind: Piece,
    to: u8,
    from_file: Option<u8>,
    from_rank: Option<u8>,
) -> Result<(), SanError> {
    let board: Board = game.node(*cursor).board().clone();
    let pseudos = board.pseudo_legal_moves_filtered(None, Some(to), Some(kind), false, board.turn);
    let candidates: Vec<Move> = pseudos
        .into_iter()
        .filter(|m| from_file.is_none_or(|f| file_of(m.from) == f))
        .filter(|m| from_rank.is_none_or(|r| rank_of(m.from) == r))
        .collect();
    let chosen = if candidates.len() == 1 {
        candidates[0]
    } else {
        let legals = board.legals_from_pseudos(&candidates);
        if legals.len() == 1 {
            legals[0]
        } else {
            return Err(SanError::Unresolvable(format!(
                "{} candidate {:?} moves into {}",
                legals.len(),
                kind,
                crate::model::square_name(to)
            )));
        }
    };
    emit(game, cursor, chosen);
    Ok(())
}

/// `O-O`, `O-O-O`, and the zero spellings `0-0` / `0-0-0`.
pub(crate) fn parse_castle_move(
    game: &mut Game,
    cursor: &mut NodeId,
    chars: &[char],
    idx: &mut usize,
) -> Result<(), SanError> {
    let long_forms: [[char; 5]; 2] = [['O', '-', 'O', '-', 'O'], ['0', '-', '0', '-', '0']];
    let short_forms: [[char; 3]; 2] = [['O', '-', 'O'], ['0', '-', '0']];

    let tail = &chars[*idx..];
    let (kingside, len) = if long_forms.iter().any(|f| tail.starts_with(&f[..])) {
        (false, 5)
    } else if short_forms.iter().any(|f| tail.starts_with(&f[..])) {
        (true, 3)
    } else {
        *idx += 1;
        return Err(SanError::Malformed);
    };

    let board = game.node(*cursor).board().clone();
    let (king_home, king_cell, to_square) = match (board.turn, kingside) {
        (Color::WHITE, true) => (E1, WHITE_KING, G1),
        (Color::WHITE, false) => (E1, WHITE_KING, C1),
        (Color::BLACK, true) => (E8, BLACK_KING, G8),
        (Color::BLACK, false) => (E8, BLACK_KING, C8),
    };
    if board.piece_at(king_home) != king_cell {
        *idx += len;
        return Err(SanError::Unresolvable(
            "castling without the king on its home square".to_string(),
        ));
    }
    *idx += len;
    emit(game, cursor, Move::new(king_home, to_square));
    Ok(())
}

/// `$n` plus the `!`/`?` shorthand forms. Never fails; anything that
/// is not a NAG after all is just stepped over.
pub(crate) fn parse_nag(game: &mut Game, cursor: NodeId, chars: &[char], idx: &mut usize) {
    let n = chars.len();
    let c = chars[*idx];
    if c == '$' {
        let mut end = *idx + 1;
        while end < n && chars[end].is_ascii_digit() {
            end += 1;
        }
        let digits: String = chars[*idx + 1..end].iter().collect();
        match digits.parse::<u16>() {
            Ok(nr) => {
                game.node_mut(cursor).add_nag(nr);
                *idx = end;
            }
            Err(_) => *idx += 1,
        }
        return;
    }
    let pair: Option<[char; 2]> = if *idx + 1 < n {
        Some([chars[*idx], chars[*idx + 1]])
    } else {
        None
    };
    let (code, consumed) = match pair {
        Some(['?', '?']) => (nag::BLUNDER, 2),
        Some(['!', '!']) => (nag::BRILLIANT_MOVE, 2),
        Some(['!', '?']) => (nag::SPECULATIVE_MOVE, 2),
        Some(['?', '!']) => (nag::DUBIOUS_MOVE, 2),
        _ if c == '?' => (nag::MISTAKE, 1),
        _ if c == '!' => (nag::GOOD_MOVE, 1),
        _ => {
            *idx += 1;
            return;
        }
    };
    game.node_mut(cursor).add_nag(code);
    *idx += consumed;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(line: &str) -> Vec<Token> {
        let chars: Vec<char> = line.chars().collect();
        let mut idx = 0;
        let mut out = Vec::new();
        loop {
            let t = next_token(&chars, &mut idx);
            if t == Token::Eol {
                break;
            }
            out.push(t);
            // step over the token the way the reader's handlers would
            match t {
                Token::PawnMove | Token::PieceMove(_) | Token::Castle | Token::Nag => {
                    // crude skip: consume until filler
                    while idx < chars.len() && !" .()".contains(chars[idx]) {
                        idx += 1;
                    }
                }
                Token::ResDraw => idx += 7,
                Token::ResWhiteWin | Token::ResBlackWin => idx += 3,
                Token::NullMove => idx += 2,
                _ => idx += 1,
            }
        }
        out
    }

    #[test]
    fn classification() {
        assert_eq!(
            tokens_of("1. e4 e5 2. Nf3"),
            vec![
                Token::PawnMove,
                Token::PawnMove,
                Token::PieceMove(Piece::KNIGHT)
            ]
        );
        assert_eq!(
            tokens_of("12... Qxd4 ( Rb1 ) {"),
            vec![
                Token::PieceMove(Piece::QUEEN),
                Token::OpenVariation,
                Token::PieceMove(Piece::ROOK),
                Token::CloseVariation,
                Token::OpenComment,
            ]
        );
        assert_eq!(tokens_of("+"), vec![Token::Check]);
        assert_eq!(tokens_of("1-0"), vec![Token::ResWhiteWin]);
        assert_eq!(tokens_of("0-1"), vec![Token::ResBlackWin]);
        assert_eq!(tokens_of("1/2-1/2"), vec![Token::ResDraw]);
        assert_eq!(tokens_of("*"), vec![Token::ResUndefined]);
        assert_eq!(tokens_of("0-0-0"), vec![Token::Castle]);
        assert_eq!(tokens_of("--"), vec![Token::NullMove]);
        assert_eq!(tokens_of("$14"), vec![Token::Nag]);
    }
}
