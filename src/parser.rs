//! Parser for the grading model's line-labeled reply.
//!
//! The model is asked to answer with one `Label: value` line per rubric
//! field (see [`Field`]), but nothing guarantees it will. Each field is
//! extracted by its own rule, searching the whole reply, so fields may
//! arrive in any order, be surrounded by prose, or be missing entirely.
//! Missing or empty fields take the default from [`Field::default_value`].
//!
//! A label matches anywhere as a whole word followed by a colon,
//! case-insensitively, so list numbering, bullets, `**` bold markers, and
//! leading prose are all tolerated (`1. Overall Score: 85`,
//! `**Accuracy:** Good`, `Here is my evaluation. Overall Score: 85`).
//!
//! A value runs to the end of its line, or to the next known label on that
//! line. `Suggestions` is the last field the template asks for and may span
//! several lines: it runs to the end of the reply, or to the next known
//! label.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::models::{AiFeedback, Criterion, RetrievedSource, RubricResult};

/// Default for a missing text field.
pub const NOT_AVAILABLE: &str = "N/A";

/// Rubric fields, in the order the prompt template lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    OverallScore,
    Accuracy,
    AccuracyFeedback,
    Completeness,
    CompletenessFeedback,
    Structure,
    StructureFeedback,
    Strengths,
    Suggestions,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::OverallScore,
        Field::Accuracy,
        Field::AccuracyFeedback,
        Field::Completeness,
        Field::CompletenessFeedback,
        Field::Structure,
        Field::StructureFeedback,
        Field::Strengths,
        Field::Suggestions,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::OverallScore => "Overall Score",
            Field::Accuracy => "Accuracy",
            Field::AccuracyFeedback => "Accuracy Feedback",
            Field::Completeness => "Completeness",
            Field::CompletenessFeedback => "Completeness Feedback",
            Field::Structure => "Structure",
            Field::StructureFeedback => "Structure Feedback",
            Field::Strengths => "Strengths",
            Field::Suggestions => "Suggestions",
        }
    }

    /// Placeholder shown to the model in the prompt's format block.
    pub fn placeholder(self) -> &'static str {
        match self {
            Field::OverallScore => "[score out of 100]",
            Field::Accuracy | Field::Completeness | Field::Structure => {
                "[Excellent/Good/Needs Improvement]"
            }
            Field::AccuracyFeedback => "[Your brief feedback on accuracy]",
            Field::CompletenessFeedback => "[Your brief feedback on completeness]",
            Field::StructureFeedback => "[Your brief feedback on structure]",
            Field::Strengths => "[A sentence on what the student did well]",
            Field::Suggestions => "[A sentence on how to improve]",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Field::OverallScore => "0",
            _ => NOT_AVAILABLE,
        }
    }

    fn pattern(self) -> &'static Regex {
        &PATTERNS[self as usize]
    }
}

/// A label as a whole word, then a colon; bold markers may sit on either
/// side of the colon.
fn label_pattern(labels: &str) -> String {
    format!(r"(?i)\b(?:{})[ \t]*\**[ \t]*:", labels)
}

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    Field::ALL
        .iter()
        .map(|field| {
            Regex::new(&label_pattern(&regex::escape(field.label())))
                .expect("field pattern is valid")
        })
        .collect()
});

/// Any known label; bounds a field's value.
static ANY_LABEL: Lazy<Regex> = Lazy::new(|| {
    let labels: Vec<String> = Field::ALL
        .iter()
        .map(|field| regex::escape(field.label()))
        .collect();
    Regex::new(&label_pattern(&labels.join("|"))).expect("label pattern is valid")
});

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// Raw text of one field, or `None` when the label is absent or its value blank.
pub fn extract_field(text: &str, field: Field) -> Option<String> {
    let label = field.pattern().find(text)?;
    let rest = &text[label.end()..];

    let span = if field == Field::Suggestions {
        rest
    } else {
        rest.split('\n').next().unwrap_or("")
    };
    let end = ANY_LABEL.find(span).map_or(span.len(), |next| next.start());

    let value = clean_value(&span[..end]);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Trim whitespace and stray bold markers left around a value.
fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_matches('*')
        .trim()
        .to_string()
}

/// Overall score: the first run of digits after the label, `0` when
/// absent or non-numeric.
///
/// # Errors
///
/// [`ParseError::ScoreOutOfRange`] when the digits do not form a score in
/// `0..=100`.
pub fn parse_score(text: &str) -> Result<u32, ParseError> {
    let Some(value) = extract_field(text, Field::OverallScore) else {
        return Ok(0);
    };
    let Some(digits) = DIGITS.find(&value) else {
        return Ok(0);
    };

    match digits.as_str().parse::<u32>() {
        Ok(score) if score <= 100 => Ok(score),
        _ => Err(ParseError::ScoreOutOfRange(digits.as_str().to_string())),
    }
}

fn text_field(text: &str, field: Field) -> String {
    extract_field(text, field).unwrap_or_else(|| field.default_value().to_string())
}

/// Parse a model reply into a [`RubricResult`].
///
/// `sources` describes the context documents the reply was graded
/// against and is copied into the result unchanged.
pub fn parse_response(text: &str, sources: Vec<RetrievedSource>) -> Result<RubricResult, ParseError> {
    Ok(RubricResult {
        overall_score: parse_score(text)?,
        accuracy: Criterion {
            rating: text_field(text, Field::Accuracy),
            feedback: text_field(text, Field::AccuracyFeedback),
        },
        completeness: Criterion {
            rating: text_field(text, Field::Completeness),
            feedback: text_field(text, Field::CompletenessFeedback),
        },
        structure: Criterion {
            rating: text_field(text, Field::Structure),
            feedback: text_field(text, Field::StructureFeedback),
        },
        ai_feedback: AiFeedback {
            strengths: text_field(text, Field::Strengths),
            suggestions: text_field(text, Field::Suggestions),
        },
        retrieved_sources: sources,
    })
}
