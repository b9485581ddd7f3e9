//! # Reading PGN
//!
//! Portable Game Notation as found in the wild: millions of games per
//! file, encodings mixed between UTF-8 and Latin-1, comments spanning
//! lines, variations nesting, and no shortage of damaged movetext.
//! The reader is built for that reality:
//!
//! - [`PgnReader::detect_encoding`] sniffs a file by attempting a
//!   UTF-8 decode of its first few kilobytes; any hard failure means
//!   Latin-1. Those two cover the databases that matter.
//! - [`PgnReader::scan_offsets`] runs over a multi-gigabyte file once
//!   and records the byte offset of every game's first tag line, so
//!   individual games can be loaded lazily.
//! - [`PgnReader::read_game`] parses one game into a [`Game`] tree,
//!   resolving every SAN token against the move engine. A game that
//!   goes wrong mid-movetext is logged and returned as far as it got;
//!   the stream stays usable for the next game.

pub mod lexer;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Board, Game, GameResult, Move, NodeId};
use lexer::{SanError, Token};

/// Numeric annotation glyph values the reader assigns for the
/// shorthand suffixes; the rest of the standard set is listed for
/// callers that want to attach them.
pub mod nag {
    pub const NULL: u16 = 0;
    pub const GOOD_MOVE: u16 = 1;
    pub const MISTAKE: u16 = 2;
    pub const BRILLIANT_MOVE: u16 = 3;
    pub const BLUNDER: u16 = 4;
    pub const SPECULATIVE_MOVE: u16 = 5;
    pub const DUBIOUS_MOVE: u16 = 6;
    pub const FORCED_MOVE: u16 = 7;
    pub const DRAWISH_POSITION: u16 = 10;
    pub const UNCLEAR_POSITION: u16 = 13;
    pub const WHITE_MODERATE_ADVANTAGE: u16 = 16;
    pub const BLACK_MODERATE_ADVANTAGE: u16 = 17;
    pub const WHITE_DECISIVE_ADVANTAGE: u16 = 18;
    pub const BLACK_DECISIVE_ADVANTAGE: u16 = 19;
    pub const WHITE_ZUGZWANG: u16 = 22;
    pub const BLACK_ZUGZWANG: u16 = 23;
    pub const WHITE_HAS_ATTACK: u16 = 40;
    pub const BLACK_HAS_ATTACK: u16 = 41;
    pub const WHITE_MODERATE_COUNTERPLAY: u16 = 132;
    pub const BLACK_MODERATE_COUNTERPLAY: u16 = 133;
}

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[([A-Za-z0-9]+)\s+"(.*)"\]"#).unwrap());

/// The two encodings real PGN databases come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgnEncoding {
    Utf8,
    Latin1,
}

fn decode(bytes: &[u8], encoding: PgnEncoding) -> String {
    match encoding {
        PgnEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        PgnEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Byte stream adapter producing decoded lines.
pub struct PgnLines<R> {
    inner: R,
    encoding: PgnEncoding,
    buf: Vec<u8>,
}

impl<R: BufRead> PgnLines<R> {
    pub fn new(inner: R, encoding: PgnEncoding) -> Self {
        Self { inner, encoding, buf: Vec::new() }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(decode(&self.buf, self.encoding)))
    }
}

/// The seven-tag roster plus ECO, as scanned straight off a file
/// without materializing the game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnHeader {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub eco: String,
}

/// Streaming PGN parser. One instance can read any number of games;
/// the only state it keeps between tokens is the variation stack.
pub struct PgnReader {
    stack: Vec<NodeId>,
}

impl Default for PgnReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PgnReader {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Sniff a file's encoding from up to 40x100 raw bytes.
    ///
    /// An invalid byte sequence anywhere in the sample classifies the
    /// file as Latin-1; a sequence merely cut off by the end of the
    /// sample does not count against UTF-8.
    pub fn detect_encoding(path: &Path) -> io::Result<PgnEncoding> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; 40 * 100];
        let mut filled = 0;
        loop {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
            if filled == buf.len() {
                break;
            }
        }
        match std::str::from_utf8(&buf[..filled]) {
            Ok(_) => Ok(PgnEncoding::Utf8),
            Err(e) if e.error_len().is_none() => Ok(PgnEncoding::Utf8),
            Err(e) => {
                log::debug!("classifying {} as latin-1: {e}", path.display());
                Ok(PgnEncoding::Latin1)
            }
        }
    }

    /// Byte offsets of every game's first tag line.
    ///
    /// Scanning is byte-level, so it works for both encodings: the
    /// characters that matter (`[`, `%`, `{`, `}`) are ASCII in each.
    /// Tag lines inside `{...}` comments do not start games.
    pub fn scan_offsets(path: &Path) -> io::Result<Vec<u64>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut offsets = Vec::new();
        let mut buf = Vec::new();
        let mut in_comment = false;
        let mut game_pos: Option<u64> = None;
        let mut pos: u64 = 0;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            let line_start = pos;
            pos += n as u64;
            let line = &buf[..];

            if line.starts_with(b"%") {
                continue;
            }
            if !in_comment && line.starts_with(b"[") {
                if game_pos.is_none() {
                    game_pos = Some(line_start);
                }
                continue;
            }
            let open = line.iter().rposition(|&b| b == b'{');
            let close = line.iter().rposition(|&b| b == b'}');
            if (!in_comment && open.is_some()) || (in_comment && close.is_some()) {
                in_comment = open > close;
            }
            if let Some(start) = game_pos.take() {
                offsets.push(start);
            }
        }
        if let Some(start) = game_pos.take() {
            offsets.push(start);
        }
        log::debug!("indexed {} games in {}", offsets.len(), path.display());
        Ok(offsets)
    }

    /// Scan just the header tags of the game starting at `offset`.
    pub fn read_header_at(
        path: &Path,
        offset: u64,
        encoding: PgnEncoding,
    ) -> io::Result<PgnHeader> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut lines = PgnLines::new(BufReader::new(file), encoding);
        let mut header = PgnHeader::default();
        let mut found = false;
        while let Some(line) = lines.next_line()? {
            if line.starts_with('%') || line.trim().is_empty() {
                if found {
                    break;
                }
                continue;
            }
            match TAG_REGEX.captures(&line) {
                Some(caps) => {
                    found = true;
                    let value = caps[2].to_string();
                    match &caps[1] {
                        "Event" => header.event = value,
                        "Site" => header.site = value,
                        "Date" => header.date = value,
                        "Round" => header.round = value,
                        "White" => header.white = value,
                        "Black" => header.black = value,
                        "Result" => header.result = value,
                        "ECO" => header.eco = value,
                        _ => {}
                    }
                }
                None => {
                    if found {
                        break;
                    }
                }
            }
        }
        Ok(header)
    }

    /// Parse one game from an in-memory string.
    pub fn read_game_from_string(&mut self, pgn: &str) -> io::Result<Game> {
        let mut lines = PgnLines::new(io::Cursor::new(pgn.as_bytes()), PgnEncoding::Utf8);
        self.read_game(&mut lines)
    }

    /// Parse the game starting at a scanned byte offset.
    pub fn read_game_at(
        &mut self,
        path: &Path,
        offset: u64,
        encoding: PgnEncoding,
    ) -> io::Result<Game> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut lines = PgnLines::new(BufReader::new(file), encoding);
        self.read_game(&mut lines)
    }

    /// Parse one game from a line stream positioned at its first tag
    /// line (or directly at movetext for header-less fragments).
    ///
    /// Failures inside the movetext never propagate: the offending
    /// token is logged and the partially populated game is returned,
    /// self-consistent as far as it was built.
    pub fn read_game<R: BufRead>(&mut self, lines: &mut PgnLines<R>) -> io::Result<Game> {
        let mut game = Game::new();
        self.stack.clear();
        self.stack.push(game.root_id());
        let mut cursor = game.root_id();
        let mut starting_fen: Option<String> = None;

        let mut line = match lines.next_line()? {
            Some(l) => l,
            None => return Ok(game),
        };

        // header phase: tag lines, with blank and escape lines skipped
        loop {
            if line.starts_with('%') || line.trim().is_empty() {
                match lines.next_line()? {
                    Some(l) => {
                        line = l;
                        continue;
                    }
                    None => return Ok(game),
                }
            }
            if !line.starts_with('[') {
                break;
            }
            let Some(caps) = TAG_REGEX.captures(&line) else { break };
            let (tag, value) = (caps[1].to_string(), caps[2].to_string());
            // the FEN tag is positional, not descriptive; it replaces
            // the root board instead of landing in the header map
            if tag == "FEN" {
                starting_fen = Some(value);
            } else {
                game.set_header(&tag, &value);
            }
            match lines.next_line()? {
                Some(l) => line = l,
                None => {
                    line = String::new();
                    break;
                }
            }
        }

        if let Some(fen) = starting_fen {
            match Board::from_fen(&fen) {
                Ok(board) => {
                    let root = game.root_id();
                    game.node_mut(root).set_board(board);
                }
                Err(e) => {
                    log::warn!("game dropped, starting FEN {fen:?} rejected: {e}");
                    return Ok(game);
                }
            }
        }

        // body phase
        'lines: loop {
            if line.starts_with('%') {
                match lines.next_line()? {
                    Some(l) => {
                        line = l;
                        continue;
                    }
                    None => break,
                }
            }
            if line.trim().is_empty() {
                break;
            }

            let mut chars: Vec<char> = line.chars().collect();
            let mut idx = 0usize;
            while idx < chars.len() {
                let token_start = idx;
                match lexer::next_token(&chars, &mut idx) {
                    Token::Eol => break,
                    Token::ResWhiteWin => {
                        game.set_result(GameResult::WhiteWins);
                        idx += 3;
                    }
                    Token::ResBlackWin => {
                        game.set_result(GameResult::BlackWins);
                        idx += 3;
                    }
                    Token::ResDraw => {
                        game.set_result(GameResult::Draw);
                        idx += 7;
                    }
                    Token::ResUndefined => {
                        game.set_result(GameResult::Undefined);
                        idx += 1;
                    }
                    Token::Check => idx += 1,
                    Token::NullMove => {
                        lexer::emit(&mut game, &mut cursor, Move::null());
                        idx += 2;
                    }
                    Token::PawnMove => {
                        if self.san_failed(
                            lexer::parse_pawn_move(&mut game, &mut cursor, &chars, &mut idx),
                            &chars,
                            token_start,
                        ) {
                            return Ok(game);
                        }
                    }
                    Token::PieceMove(kind) => {
                        if self.san_failed(
                            lexer::parse_piece_move(&mut game, &mut cursor, kind, &chars, &mut idx),
                            &chars,
                            token_start,
                        ) {
                            return Ok(game);
                        }
                    }
                    Token::Castle => {
                        if self.san_failed(
                            lexer::parse_castle_move(&mut game, &mut cursor, &chars, &mut idx),
                            &chars,
                            token_start,
                        ) {
                            return Ok(game);
                        }
                    }
                    Token::OpenVariation => {
                        // a variation restarts from the position before
                        // the cursor's move; at the root there is no
                        // such position and the paren is ignored
                        if cursor != game.root_id() {
                            self.stack.push(cursor);
                            if let Some(parent) = game.node(cursor).parent() {
                                cursor = parent;
                            }
                        }
                        idx += 1;
                    }
                    Token::CloseVariation => {
                        if self.stack.len() > 1 {
                            if let Some(back) = self.stack.pop() {
                                cursor = back;
                            }
                        }
                        idx += 1;
                    }
                    Token::Nag => lexer::parse_nag(&mut game, cursor, &chars, &mut idx),
                    Token::OpenComment => {
                        let rest = &chars[idx + 1..];
                        if let Some(end) = rest.iter().position(|&c| c == '}') {
                            let text: String = rest[..end].iter().collect();
                            game.node_mut(cursor).set_comment(text);
                            idx = idx + 1 + end + 1;
                        } else {
                            // multi-line comment: accumulate until the
                            // closing brace, joining fragments with \n
                            let mut fragments: Vec<String> = vec![rest.iter().collect()];
                            loop {
                                match lines.next_line()? {
                                    None => {
                                        game.node_mut(cursor).set_comment(fragments.join("\n"));
                                        break 'lines;
                                    }
                                    Some(l) if l.trim().is_empty() => {
                                        game.node_mut(cursor).set_comment(fragments.join("\n"));
                                        line = l;
                                        continue 'lines;
                                    }
                                    Some(l) => {
                                        let lchars: Vec<char> = l.chars().collect();
                                        match lchars.iter().position(|&c| c == '}') {
                                            Some(end) => {
                                                let tail: String =
                                                    lchars[..end].iter().collect();
                                                fragments.push(tail.trim_start().to_string());
                                                game.node_mut(cursor)
                                                    .set_comment(fragments.join("\n"));
                                                chars = lchars;
                                                idx = end + 1;
                                                break;
                                            }
                                            None => fragments.push(l.trim().to_string()),
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            match lines.next_line()? {
                Some(l) => line = l,
                None => break,
            }
        }
        Ok(game)
    }

    /// Handle a SAN parse outcome; `true` means the game is abandoned.
    fn san_failed(&self, outcome: Result<(), SanError>, chars: &[char], start: usize) -> bool {
        match outcome {
            Ok(()) => false,
            Err(SanError::Malformed) => {
                let context: String = chars[start..chars.len().min(start + 8)].iter().collect();
                log::debug!("skipping stray movetext near {context:?}");
                false
            }
            Err(SanError::Unresolvable(reason)) => {
                let context: String = chars[start..chars.len().min(start + 8)].iter().collect();
                let full: String = chars.iter().collect();
                log::warn!("abandoning game at token {context:?} ({reason}) in line {full:?}");
                true
            }
        }
    }
}
