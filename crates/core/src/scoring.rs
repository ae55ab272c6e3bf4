//! Prompt scoring types, score arithmetic, and the heuristic fallback scorer.
//!
//! The four sub-scores (clarity, specificity, contextual completeness,
//! effectiveness) are always integers in `[0, 100]`. The aggregate shown to
//! users is never taken from an LLM response; it is recomputed here as the
//! rounded mean of the sub-scores so the two can never disagree.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest representable score.
pub const MIN_SCORE: i32 = 0;

/// Highest representable score.
pub const MAX_SCORE: i32 = 100;

/// A sub-score strictly above this earns a "Strength" feedback item.
pub const STRENGTH_THRESHOLD: i32 = 85;

const CLARITY_BASE: i32 = 70;
const SPECIFICITY_BASE: i32 = 70;
const CONTEXTUAL_BASE: i32 = 70;
const EFFECTIVENESS_BASE: i32 = 75;

const CLARITY_RANGE: (i32, i32) = (60, 100);
const SPECIFICITY_RANGE: (i32, i32) = (60, 100);
const CONTEXTUAL_RANGE: (i32, i32) = (60, 100);
const EFFECTIVENESS_RANGE: (i32, i32) = (65, 100);

/// Word count above which specificity earns a length bonus.
const SPECIFICITY_WORDS: usize = 100;
/// Word count above which contextual completeness earns a length bonus.
const CONTEXTUAL_WORDS: usize = 200;
/// Character count above which contextual completeness earns a bonus.
const CONTEXTUAL_CHARS: usize = 500;
/// Word count above which effectiveness earns a length bonus.
const EFFECTIVENESS_WORDS: usize = 50;

static IDENTITY_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*#{1,6}\s*(identity|role|persona)\b").expect("valid regex")
});

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#{1,6}\s+\S").expect("valid regex"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[*-] ").expect("valid regex"));

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a feedback item praises the prompt or asks for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Strength,
    Improvement,
}

/// Priority of an improvement item or suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a priority label leniently (case-insensitive). Unknown labels map to `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// One entry of the ordered feedback list stored with an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub category: FeedbackCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl FeedbackItem {
    pub fn strength(message: impl Into<String>) -> Self {
        Self {
            category: FeedbackCategory::Strength,
            message: message.into(),
            priority: None,
        }
    }

    pub fn improvement(message: impl Into<String>, priority: Priority) -> Self {
        Self {
            category: FeedbackCategory::Improvement,
            message: message.into(),
            priority: Some(priority),
        }
    }
}

/// An actionable improvement suggestion attached to a section of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub section: String,
    pub priority: Priority,
    pub text: String,
}

/// The four axis scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub clarity: i32,
    pub specificity: i32,
    pub contextual: i32,
    pub effectiveness: i32,
}

impl SubScores {
    /// Rounded arithmetic mean of the four sub-scores.
    pub fn aggregate(&self) -> i32 {
        aggregate_score(&[
            self.clarity,
            self.specificity,
            self.contextual,
            self.effectiveness,
        ])
    }

    /// True when every axis is zero -- the "processing" placeholder state.
    pub fn is_zeroed(&self) -> bool {
        self.clarity == 0
            && self.specificity == 0
            && self.contextual == 0
            && self.effectiveness == 0
    }
}

/// Which path produced an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Llm,
    Heuristic,
}

impl ScoreSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
        }
    }
}

/// A complete evaluation of one prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: SubScores,
    pub feedback: Vec<FeedbackItem>,
    pub suggestions: Vec<Suggestion>,
    pub source: ScoreSource,
}

impl Evaluation {
    /// Aggregate score, always recomputed from the sub-scores.
    pub fn aggregate(&self) -> i32 {
        self.scores.aggregate()
    }
}

// ---------------------------------------------------------------------------
// Score arithmetic
// ---------------------------------------------------------------------------

/// Coerce a raw numeric value into a valid sub-score.
///
/// Rounds to nearest (never truncates), clamps into `[0, 100]`, and maps a
/// missing or non-finite value to 0.
pub fn coerce_score(value: Option<f64>) -> i32 {
    match value {
        Some(v) if v.is_finite() => {
            (v.round() as i64).clamp(MIN_SCORE as i64, MAX_SCORE as i64) as i32
        }
        _ => MIN_SCORE,
    }
}

/// Rounded mean of a set of scores. Returns 0 for an empty slice.
pub fn aggregate_score(scores: &[i32]) -> i32 {
    if scores.is_empty() {
        return MIN_SCORE;
    }
    let sum: i64 = scores.iter().map(|&s| s as i64).sum();
    let mean = sum as f64 / scores.len() as f64;
    coerce_score(Some(mean))
}

// ---------------------------------------------------------------------------
// Structural signals
// ---------------------------------------------------------------------------

/// Structural features of a prompt used by the heuristic scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralSignals {
    /// A leading `# Identity`-style heading or the phrase "You are".
    pub has_identity: bool,
    /// Any markdown heading.
    pub has_heading: bool,
    /// `* ` or `- ` bullet markers at line start.
    pub has_bullets: bool,
    /// "Do not" / "instead of" phrasing.
    pub has_negative_constraint: bool,
    pub word_count: usize,
    pub char_count: usize,
}

impl StructuralSignals {
    pub fn detect(text: &str) -> Self {
        Self {
            has_identity: IDENTITY_HEADING_RE.is_match(text) || text.contains("You are"),
            has_heading: HEADING_RE.is_match(text),
            has_bullets: BULLET_RE.is_match(text),
            has_negative_constraint: text.contains("Do not") || text.contains("instead of"),
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
        }
    }
}

fn bonus(condition: bool, points: i32) -> i32 {
    if condition {
        points
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Heuristic scorer
// ---------------------------------------------------------------------------

/// Deterministic fallback scorer used when the LLM path fails or times out.
///
/// Each axis starts from a fixed base, receives additive bonuses for the
/// structural signals present, and is clamped to an axis-specific range.
pub fn heuristic_evaluate(text: &str) -> Evaluation {
    let s = StructuralSignals::detect(text);

    let clarity = (CLARITY_BASE
        + bonus(s.has_identity, 15)
        + bonus(s.has_heading, 10)
        + bonus(s.has_negative_constraint, 5))
    .clamp(CLARITY_RANGE.0, CLARITY_RANGE.1);

    let specificity = (SPECIFICITY_BASE
        + bonus(s.has_bullets, 15)
        + bonus(s.has_negative_constraint, 10)
        + bonus(s.has_heading, 5)
        + bonus(s.word_count > SPECIFICITY_WORDS, 5))
    .clamp(SPECIFICITY_RANGE.0, SPECIFICITY_RANGE.1);

    let contextual = (CONTEXTUAL_BASE
        + bonus(s.has_identity, 10)
        + bonus(s.char_count > CONTEXTUAL_CHARS, 10)
        + bonus(s.has_heading, 5)
        + bonus(s.word_count > CONTEXTUAL_WORDS, 5))
    .clamp(CONTEXTUAL_RANGE.0, CONTEXTUAL_RANGE.1);

    let effectiveness = (EFFECTIVENESS_BASE
        + bonus(s.has_identity, 5)
        + bonus(s.has_heading, 5)
        + bonus(s.has_bullets, 5)
        + bonus(s.has_negative_constraint, 5)
        + bonus(s.word_count > EFFECTIVENESS_WORDS, 5))
    .clamp(EFFECTIVENESS_RANGE.0, EFFECTIVENESS_RANGE.1);

    let scores = SubScores {
        clarity,
        specificity,
        contextual,
        effectiveness,
    };

    Evaluation {
        scores,
        feedback: heuristic_feedback(&scores, &s),
        suggestions: heuristic_suggestions(&s),
        source: ScoreSource::Heuristic,
    }
}

/// One item per axis: a strength above the threshold, otherwise an
/// improvement when a specific structural element is missing.
fn heuristic_feedback(scores: &SubScores, s: &StructuralSignals) -> Vec<FeedbackItem> {
    let mut feedback = Vec::new();

    if scores.clarity > STRENGTH_THRESHOLD {
        feedback.push(FeedbackItem::strength(
            "Clear structure: the model's role and the prompt's sections are well defined.",
        ));
    } else if !s.has_identity {
        feedback.push(FeedbackItem::improvement(
            "Open with an identity section (\"# Identity\" or \"You are ...\") so the model knows its role.",
            Priority::High,
        ));
    } else if !s.has_heading {
        feedback.push(FeedbackItem::improvement(
            "Split the prompt into markdown sections such as \"# Instructions\" and \"# Context\".",
            Priority::Medium,
        ));
    }

    if scores.specificity > STRENGTH_THRESHOLD {
        feedback.push(FeedbackItem::strength(
            "Specific instructions with explicit constraints.",
        ));
    } else if !s.has_bullets {
        feedback.push(FeedbackItem::improvement(
            "List the concrete instructions as bullet points.",
            Priority::High,
        ));
    } else if !s.has_negative_constraint {
        feedback.push(FeedbackItem::improvement(
            "State what the model must avoid (\"Do not ...\").",
            Priority::Medium,
        ));
    }

    if scores.contextual > STRENGTH_THRESHOLD {
        feedback.push(FeedbackItem::strength(
            "Provides enough background for the model to act on.",
        ));
    } else if s.char_count <= CONTEXTUAL_CHARS {
        feedback.push(FeedbackItem::improvement(
            "Add background context: audience, domain, and the situation the output is for.",
            Priority::Medium,
        ));
    }

    if scores.effectiveness > STRENGTH_THRESHOLD {
        feedback.push(FeedbackItem::strength(
            "Likely to produce consistent, useful output.",
        ));
    } else if s.word_count <= EFFECTIVENESS_WORDS {
        feedback.push(FeedbackItem::improvement(
            "Include an example or describe the expected output format.",
            Priority::Low,
        ));
    }

    feedback
}

fn heuristic_suggestions(s: &StructuralSignals) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    if !s.has_identity {
        suggestions.push(Suggestion {
            section: "Identity".to_string(),
            priority: Priority::High,
            text: "Begin with \"# Identity\" and describe who the model is, e.g. \"You are an experienced ...\".".to_string(),
        });
    }
    if !s.has_bullets {
        suggestions.push(Suggestion {
            section: "Instructions".to_string(),
            priority: Priority::High,
            text: "Add an \"# Instructions\" section with one bullet per requirement.".to_string(),
        });
    }
    if !s.has_negative_constraint {
        suggestions.push(Suggestion {
            section: "Constraints".to_string(),
            priority: Priority::Medium,
            text: "Add explicit constraints such as \"Do not invent facts\".".to_string(),
        });
    }
    if s.char_count <= CONTEXTUAL_CHARS {
        suggestions.push(Suggestion {
            section: "Context".to_string(),
            priority: Priority::Medium,
            text: "Describe the audience, goal, and any background the model needs.".to_string(),
        });
    }
    if s.word_count <= EFFECTIVENESS_WORDS {
        suggestions.push(Suggestion {
            section: "Examples".to_string(),
            priority: Priority::Low,
            text: "Show one example of the desired output.".to_string(),
        });
    }
    suggestions
}

// ---------------------------------------------------------------------------
// LLM response parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    clarity: Option<serde_json::Value>,
    specificity: Option<serde_json::Value>,
    #[serde(alias = "contextual_completeness", alias = "context")]
    contextual: Option<serde_json::Value>,
    effectiveness: Option<serde_json::Value>,
    #[serde(default)]
    feedback: Vec<RawFeedback>,
    #[serde(default)]
    suggestions: Vec<RawSuggestion>,
}

#[derive(Debug, Deserialize)]
struct RawFeedback {
    #[serde(alias = "type")]
    category: Option<String>,
    message: Option<String>,
    priority: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    section: Option<String>,
    priority: Option<String>,
    #[serde(alias = "suggestion", alias = "suggestion_text")]
    text: Option<String>,
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn value_to_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

/// Parse the structured JSON returned by the scoring LLM.
///
/// Any `overall` field is ignored; callers use [`Evaluation::aggregate`].
/// Feedback entries without a message and suggestions without text are
/// dropped. A single missing axis scores 0. Returns a validation error when
/// the body is not a JSON object of the expected shape, or when no axis
/// carries a nonzero score.
pub fn parse_llm_evaluation(raw: &str) -> Result<Evaluation, CoreError> {
    let parsed: RawEvaluation = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| CoreError::Validation(format!("Malformed evaluation JSON: {e}")))?;

    let axes = [
        value_to_f64(parsed.clarity.as_ref()),
        value_to_f64(parsed.specificity.as_ref()),
        value_to_f64(parsed.contextual.as_ref()),
        value_to_f64(parsed.effectiveness.as_ref()),
    ];
    // A row with every score at zero reads as the processing placeholder.
    if axes.iter().all(Option::is_none) {
        return Err(CoreError::Validation(
            "Evaluation JSON has no score for any axis".to_string(),
        ));
    }
    let [clarity, specificity, contextual, effectiveness] = axes.map(coerce_score);
    let scores = SubScores {
        clarity,
        specificity,
        contextual,
        effectiveness,
    };
    if scores.is_zeroed() {
        return Err(CoreError::Validation(
            "Evaluation JSON scored every axis zero".to_string(),
        ));
    }

    let feedback = parsed
        .feedback
        .into_iter()
        .filter_map(|f| {
            let message = f.message.filter(|m| !m.trim().is_empty())?;
            let category = match f.category.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("strength") => FeedbackCategory::Strength,
                _ => FeedbackCategory::Improvement,
            };
            let priority = match category {
                FeedbackCategory::Strength => None,
                FeedbackCategory::Improvement => {
                    Some(f.priority.as_deref().and_then(Priority::parse).unwrap_or(Priority::Medium))
                }
            };
            Some(FeedbackItem {
                category,
                message,
                priority,
            })
        })
        .collect();

    let suggestions = parsed
        .suggestions
        .into_iter()
        .filter_map(|s| {
            let text = s.text.filter(|t| !t.trim().is_empty())?;
            Some(Suggestion {
                section: s
                    .section
                    .filter(|sec| !sec.trim().is_empty())
                    .unwrap_or_else(|| "General".to_string()),
                priority: s.priority.as_deref().and_then(Priority::parse).unwrap_or(Priority::Medium),
                text,
            })
        })
        .collect();

    Ok(Evaluation {
        scores,
        feedback,
        suggestions,
        source: ScoreSource::Llm,
    })
}
