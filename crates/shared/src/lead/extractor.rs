//! Locates the structured block a provider appends once every field is known
//! and separates it from the text shown to the visitor.
//!
//! Candidate discovery is an ordered chain of [`MatchStrategy`] variants; the
//! first strategy that finds a candidate wins, and a candidate that fails to
//! parse is a miss rather than an error.

use std::ops::Range;

use serde_json::Value;
use tracing::{debug, warn};

use super::record::{CollectedRecord, RecordGap};
use super::schema::LeadSchema;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// First triple-backtick block, optionally tagged `json`.
    Fenced,
    /// First `{` preceding the quoted marker key, greedily up to the last `}`.
    LooseBrace,
}

pub const MATCH_CHAIN: [MatchStrategy; 2] = [MatchStrategy::Fenced, MatchStrategy::LooseBrace];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub strategy: MatchStrategy,
    /// Byte range of the whole match inside the reply, fences included.
    pub span: Range<usize>,
    pub body: &'a str,
}

impl MatchStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fenced => "fenced",
            Self::LooseBrace => "loose_brace",
        }
    }

    pub fn find<'a>(self, reply: &'a str, marker_key: &str) -> Option<Candidate<'a>> {
        match self {
            Self::Fenced => find_fenced(reply),
            Self::LooseBrace => find_loose_brace(reply, marker_key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionMiss {
    NoCandidate,
    MalformedJson(MatchStrategy),
    MissingMarker(MatchStrategy),
    Incomplete(RecordGap),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Incomplete {
        reason: ExtractionMiss,
    },
    Complete {
        record: CollectedRecord,
        visible_text: String,
        strategy: MatchStrategy,
    },
}

impl ExtractionResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

pub fn extract(reply: &str, schema: &LeadSchema) -> ExtractionResult {
    let Some(candidate) = MATCH_CHAIN
        .iter()
        .find_map(|strategy| strategy.find(reply, &schema.marker_key))
    else {
        debug!("no structured block found in provider reply");
        return ExtractionResult::Incomplete {
            reason: ExtractionMiss::NoCandidate,
        };
    };

    let strategy = candidate.strategy;
    let parsed = match serde_json::from_str::<Value>(candidate.body.trim()) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(
                strategy = strategy.as_str(),
                "structured block candidate is not valid json: {err}"
            );
            return ExtractionResult::Incomplete {
                reason: ExtractionMiss::MalformedJson(strategy),
            };
        }
    };

    let Some(payload) = parsed
        .get(schema.marker_key.as_str())
        .and_then(Value::as_object)
    else {
        debug!(
            strategy = strategy.as_str(),
            marker_key = %schema.marker_key,
            "structured block has no marker payload"
        );
        return ExtractionResult::Incomplete {
            reason: ExtractionMiss::MissingMarker(strategy),
        };
    };

    let record = match CollectedRecord::from_payload(schema, payload) {
        Ok(record) => record,
        Err(gap) => {
            debug!(strategy = strategy.as_str(), ?gap, "structured block is incomplete");
            return ExtractionResult::Incomplete {
                reason: ExtractionMiss::Incomplete(gap),
            };
        }
    };

    let mut visible_text = String::with_capacity(reply.len());
    visible_text.push_str(&reply[..candidate.span.start]);
    visible_text.push_str(&reply[candidate.span.end..]);

    ExtractionResult::Complete {
        record,
        visible_text: visible_text.trim().to_string(),
        strategy,
    }
}

fn find_fenced(reply: &str) -> Option<Candidate<'_>> {
    let open = reply.find(FENCE)?;
    let mut body_start = open + FENCE.len();

    let after_open = &reply[body_start..];
    if after_open
        .get(..JSON_TAG.len())
        .is_some_and(|tag| tag.eq_ignore_ascii_case(JSON_TAG))
    {
        body_start += JSON_TAG.len();
    }

    let close = body_start + reply[body_start..].find(FENCE)?;
    Some(Candidate {
        strategy: MatchStrategy::Fenced,
        span: open..close + FENCE.len(),
        body: reply[body_start..close].trim(),
    })
}

fn find_loose_brace<'a>(reply: &'a str, marker_key: &str) -> Option<Candidate<'a>> {
    let quoted_marker = format!("\"{marker_key}\"");
    let open = reply.find('{')?;
    let marker_at = open + reply[open..].find(&quoted_marker)?;
    let close = reply.rfind('}')?;
    if close < marker_at + quoted_marker.len() {
        return None;
    }

    Some(Candidate {
        strategy: MatchStrategy::LooseBrace,
        body: &reply[open..=close],
        span: widen_over_stray_fences(reply, open, close + 1),
    })
}

/// Extends a brace span over an unmatched fence opener (with optional `json`
/// tag) right before it and a fence right after it, so neither is left in the
/// visible text.
fn widen_over_stray_fences(reply: &str, start: usize, end: usize) -> Range<usize> {
    let before = reply[..start].trim_end();
    let mut widened_start = start;
    if let Some(untagged) = before.strip_suffix(FENCE) {
        widened_start = untagged.len();
    } else if let Some(tag_at) = before.len().checked_sub(JSON_TAG.len()) {
        let untagged = before
            .get(tag_at..)
            .filter(|tag| tag.eq_ignore_ascii_case(JSON_TAG))
            .and_then(|_| before[..tag_at].strip_suffix(FENCE));
        if let Some(untagged) = untagged {
            widened_start = untagged.len();
        }
    }

    let after = &reply[end..];
    let trailing = after.trim_start();
    let widened_end = if trailing.starts_with(FENCE) {
        end + (after.len() - trailing.len()) + FENCE.len()
    } else {
        end
    };

    widened_start..widened_end
}
