use crate::segment::SegmentKey;
use thiserror::Error;

/// Ways a token stream can break the exact-coverage contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("token {index} has zero length")]
    ZeroLengthToken { index: usize },
    #[error("tokens cover {actual} characters but the segments hold {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Failure of a single decoration pass. The pass yields no ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecorateError {
    #[error("lexer contract violated: {0}")]
    LexerContractViolation(#[from] ContractViolation),
    #[error("ran out of segments while placing token {token_index} ({remaining} characters left)")]
    SegmentExhausted { token_index: usize, remaining: usize },
    #[error("segment key {0} appears more than once")]
    DuplicateKey(SegmentKey),
}
