use thiserror::Error;

/// Everything that can go wrong inside the model.
///
/// Move generation never fails structurally (it returns an empty list),
/// and the PGN reader recovers from bad movetext on its own, so this
/// enum covers the remaining surface: notation parsing, position
/// validation, and misuse of stateful operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed FEN, UCI, or SAN input.
    #[error("parse error: {0}")]
    Parse(String),

    /// A position that violates the board invariants (king counts,
    /// pawn ranks, castling rights vs. placement, and so on).
    #[error("inconsistent position: {0}")]
    InconsistentPosition(String),

    /// An operation called in a state that cannot honor it, such as
    /// `undo` without a preceding `apply`.
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// Reached an impossible branch. Seeing this is a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
