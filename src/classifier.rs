//! Response classification
//!
//! Classification is a pure function of the block, the expected response and
//! the observed response. A missing observation means the response window
//! expired.

use crate::types::{BlockType, ErrorType, Response};

/// Outcome of classifying a single response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_correct: bool,
    pub error_type: ErrorType,
}

impl Classification {
    fn correct() -> Self {
        Self {
            is_correct: true,
            error_type: ErrorType::None,
        }
    }

    fn wrong(error_type: ErrorType) -> Self {
        Self {
            is_correct: false,
            error_type,
        }
    }
}

/// Classify a response for the given block
pub fn classify(block: BlockType, expected: Response, observed: Option<Response>) -> Classification {
    match block {
        BlockType::SustainedAttention => classify_sustained_attention(expected, observed),
        BlockType::Stroop => classify_stroop(expected, observed),
    }
}

/// Go/No-Go classification
///
/// A timeout counts as `no_click`. Any observed input other than `no_click`
/// is treated as a click.
pub fn classify_sustained_attention(expected: Response, observed: Option<Response>) -> Classification {
    let clicked = !matches!(observed, None | Some(Response::NoClick));

    match (expected, clicked) {
        (Response::Click, true) => Classification::correct(),
        (Response::Click, false) => Classification::wrong(ErrorType::Omission),
        (_, true) => Classification::wrong(ErrorType::Commission),
        (_, false) => Classification::correct(),
    }
}

/// Stroop classification against the rendered color, never the word
pub fn classify_stroop(expected: Response, observed: Option<Response>) -> Classification {
    match observed {
        None => Classification::wrong(ErrorType::Omission),
        Some(answer) if answer == expected => Classification::correct(),
        Some(_) => Classification::wrong(ErrorType::Conflict),
    }
}
