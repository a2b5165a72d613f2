//! Projection of flat token spans onto segment coordinates.
//!
//! Tokens are produced over the concatenation of all segment texts. Walking
//! them in order alongside the segments turns each typed token's flat span
//! into a [`DecorationRange`] addressed by segment key and in-segment offset.
//!
//! Boundary rule: a token that ends exactly where a segment ends keeps that
//! segment as its focus, with `focus_offset == segment.len()`. The next token
//! then starts at that same position and only moves on to the following
//! segment because its available length there is zero.

use crate::error::{ContractViolation, DecorateError};
use crate::segment::{Segment, SegmentKey, Snapshot};
use crate::token::Token;
use crate::tokenizer::Lexer;
use serde::Serialize;

/// Styling instruction for a half-open character span, possibly crossing
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecorationRange {
    pub anchor_key: SegmentKey,
    pub anchor_offset: usize,
    pub focus_key: SegmentKey,
    pub focus_offset: usize,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Walk position. Owned by a single pass and moved through each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    /// Index of the segment the previous token ended in.
    segment: usize,
    /// Offset within that segment.
    offset: usize,
    flat_pos: usize,
}

/// Where one token landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    start_segment: usize,
    start_offset: usize,
    end_segment: usize,
    end_offset: usize,
}

impl Cursor {
    fn start() -> Self {
        Self {
            segment: 0,
            offset: 0,
            flat_pos: 0,
        }
    }

    fn step(
        self,
        segments: &[Segment],
        token_index: usize,
        len: usize,
    ) -> Result<(Self, Placement), DecorateError> {
        let start_segment = self.segment;
        let start_offset = self.offset;

        let mut end_segment = start_segment;
        let mut remaining = len;
        let mut available = match segments.get(start_segment) {
            Some(segment) => segment.len().saturating_sub(start_offset),
            None => 0,
        };
        let mut end_offset = start_offset + remaining;

        while available < remaining {
            end_segment += 1;
            let Some(next) = segments.get(end_segment) else {
                return Err(DecorateError::SegmentExhausted {
                    token_index,
                    remaining: remaining - available,
                });
            };
            remaining -= available;
            available = next.len();
            end_offset = remaining;
        }

        let cursor = Self {
            segment: end_segment,
            offset: end_offset,
            flat_pos: self.flat_pos + len,
        };
        let placement = Placement {
            start_segment,
            start_offset,
            end_segment,
            end_offset,
        };
        Ok((cursor, placement))
    }
}

/// Projects `tokens` onto `segments`, one range per top-level typed token.
///
/// Fails without output if a token is empty, if the tokens run past the last
/// segment, or if they stop short of the total text length.
pub fn project(
    segments: &[Segment],
    tokens: &[Token],
) -> Result<Vec<DecorationRange>, DecorateError> {
    let (cursor, ranges) = tokens.iter().enumerate().try_fold(
        (Cursor::start(), Vec::new()),
        |(cursor, mut ranges), (index, token)| -> Result<_, DecorateError> {
            let len = token.len();
            if len == 0 {
                return Err(ContractViolation::ZeroLengthToken { index }.into());
            }
            let (cursor, placement) = cursor.step(segments, index, len)?;
            if let Token::Typed { kind, alias, .. } = token {
                ranges.push(DecorationRange {
                    anchor_key: segments[placement.start_segment].key.clone(),
                    anchor_offset: placement.start_offset,
                    focus_key: segments[placement.end_segment].key.clone(),
                    focus_offset: placement.end_offset,
                    tag: kind.clone(),
                    alias: alias.clone(),
                });
            }
            Ok((cursor, ranges))
        },
    )?;

    let expected: usize = segments.iter().map(Segment::len).sum();
    if cursor.flat_pos != expected {
        return Err(ContractViolation::LengthMismatch {
            expected,
            actual: cursor.flat_pos,
        }
        .into());
    }
    Ok(ranges)
}

/// Runs one complete decoration pass over a captured snapshot.
pub fn decorate<L>(snapshot: &Snapshot, lexer: &L) -> Result<Vec<DecorationRange>, DecorateError>
where
    L: Lexer + ?Sized,
{
    let _span = tracing::debug_span!("decorate", segments = snapshot.segments().len()).entered();

    let result = snapshot.validate_keys().and_then(|()| {
        let tokens = lexer.tokenize(snapshot.text());
        tracing::trace!(tokens = tokens.len(), "tokenized");
        project(snapshot.segments(), &tokens)
    });

    match &result {
        Ok(ranges) => tracing::debug!(ranges = ranges.len(), "decoration pass complete"),
        Err(err) => tracing::warn!(error = %err, "decoration pass failed"),
    }
    result
}
