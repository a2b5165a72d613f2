//! Decoration ranges for segmented text.
//!
//! An editor keeps its document as an ordered list of keyed text segments.
//! Highlighting lexes the concatenated text once per change; [`projector`]
//! maps every typed token back to `(segment key, offset)` coordinates so the
//! editor can style its own nodes without flattening them.

pub mod ansi;
pub mod config;
pub mod decoration;
pub mod error;
pub mod grammar;
pub mod logging;
pub mod projector;
pub mod segment;
pub mod theme;
pub mod token;
pub mod tokenizer;

pub use error::{ContractViolation, DecorateError};
pub use projector::{decorate, project, DecorationRange};
pub use segment::{Segment, SegmentKey, Snapshot};
pub use token::{Content, Token};
pub use tokenizer::{Lexer, Tokenizer};
