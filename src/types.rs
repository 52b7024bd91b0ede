use serde::{Deserialize, Serialize};
use std::fmt;

/// Business metadata as it appears on one line of the metadata file.
///
/// Only the identifier and display name are kept; every other field of the
/// source record is ignored. Google Local dumps name the identifier
/// `gmap_id`; when both `id` and `gmap_id` are present, `id` wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "BusinessLine")]
pub struct BusinessRecord {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct BusinessLine {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    gmap_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl TryFrom<BusinessLine> for BusinessRecord {
    type Error = String;

    fn try_from(line: BusinessLine) -> Result<Self, Self::Error> {
        let id = line
            .id
            .or(line.gmap_id)
            .ok_or_else(|| "missing field `id` (or `gmap_id`)".to_string())?;
        Ok(Self { id, name: line.name })
    }
}

/// One review line as decoded, before the join.
///
/// `gmap_id` and `name` are accepted for `business_id` and `user_name`; the
/// canonical key wins when a line carries both.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ReviewLine")]
pub struct RawReview {
    pub business_id: Option<String>,
    pub user_name: Option<String>,
    /// Left untyped: sources mix numbers and numeric strings.
    pub rating: Option<serde_json::Value>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
struct ReviewLine {
    #[serde(default)]
    business_id: Option<String>,
    #[serde(default)]
    gmap_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<serde_json::Value>,
    #[serde(default)]
    text: Option<String>,
}

impl From<ReviewLine> for RawReview {
    fn from(line: ReviewLine) -> Self {
        Self {
            business_id: line.business_id.or(line.gmap_id),
            user_name: line.user_name.or(line.name),
            rating: line.rating,
            text: line.text,
        }
    }
}

/// A review joined to its business name. Rows of the working table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReview {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedReview {
    pub business_name: String,
    pub user_name: String,
    pub rating: u8,
    pub text: String,
    pub text_clean: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledReview {
    #[serde(flatten)]
    pub review: CleanedReview,
    pub llm_label: Option<ModerationLabel>,
}

impl From<CleanedReview> for LabeledReview {
    fn from(review: CleanedReview) -> Self {
        Self {
            review,
            llm_label: None,
        }
    }
}

/// Moderation category assigned by the classifier.
///
/// The model is asked for one of four categories but its answer is not
/// validated; anything else is carried verbatim in `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModerationLabel {
    Advertisement,
    Irrelevant,
    Rant,
    Valid,
    Unrecognized(String),
}

impl ModerationLabel {
    pub const CATEGORIES: [ModerationLabel; 4] = [
        ModerationLabel::Advertisement,
        ModerationLabel::Irrelevant,
        ModerationLabel::Rant,
        ModerationLabel::Valid,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ModerationLabel::Advertisement => "Advertisement",
            ModerationLabel::Irrelevant => "Irrelevant",
            ModerationLabel::Rant => "Rant",
            ModerationLabel::Valid => "Valid",
            ModerationLabel::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ModerationLabel::Unrecognized(_))
    }
}

impl From<String> for ModerationLabel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Advertisement" => ModerationLabel::Advertisement,
            "Irrelevant" => ModerationLabel::Irrelevant,
            "Rant" => ModerationLabel::Rant,
            "Valid" => ModerationLabel::Valid,
            _ => ModerationLabel::Unrecognized(raw),
        }
    }
}

impl From<&str> for ModerationLabel {
    fn from(raw: &str) -> Self {
        ModerationLabel::from(raw.to_string())
    }
}

impl From<ModerationLabel> for String {
    fn from(label: ModerationLabel) -> Self {
        match label {
            ModerationLabel::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ModerationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{review, label}` pair from a classifier response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVerdict {
    pub review: String,
    pub label: ModerationLabel,
}

/// Export row for manual labeling; `label` is filled in by hand downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandLabelRow {
    #[serde(flatten)]
    pub review: CleanedReview,
    pub label: Option<String>,
}
