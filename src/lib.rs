//! A chess game-model library.
//!
//! Three tightly coupled pieces make up the crate: a mailbox board
//! with full move generation, application, and hashing
//! ([`model::Board`]); a variation-bearing game tree with headers and
//! annotations ([`model::Game`]); and a streaming, damage-tolerant
//! PGN reader ([`pgn::PgnReader`]) that resolves SAN against the move
//! engine token by token. FEN and the UCI move form round-trip
//! through [`notation`].
//!
//! ```
//! use rookery::model::Board;
//! use rookery::pgn::PgnReader;
//!
//! let mut game = PgnReader::new()
//!     .read_game_from_string("1. e4 e5 2. Nf3 Nc6 3. Bb5")
//!     .unwrap();
//! game.go_to_end();
//! assert_eq!(
//!     game.current_board().fen(),
//!     "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"
//! );
//! assert_eq!(Board::startpos().legal_moves().len(), 20);
//! ```

pub mod error;
pub mod model;
pub mod notation;
pub mod pgn;

pub use crate::error::{Error, Result};
pub use crate::model::{Board, Color, Game, GameNode, GameResult, Move, Piece};
pub use crate::pgn::{PgnEncoding, PgnReader};
