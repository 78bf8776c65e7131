use crate::persist::Collection;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Language error families reported by the analysis pipeline.
///
/// Declaration order is the tie-break order wherever categories are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Grammar,
    Spelling,
    Vocabulary,
    Syntax,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 4] = [
        ErrorCategory::Grammar,
        ErrorCategory::Spelling,
        ErrorCategory::Vocabulary,
        ErrorCategory::Syntax,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Grammar => "grammar",
            ErrorCategory::Spelling => "spelling",
            ErrorCategory::Vocabulary => "vocabulary",
            ErrorCategory::Syntax => "syntax",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
    #[serde(default)]
    pub assignment_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchoolClass {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            student_ids: Vec::new(),
            assignment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub sort_name: String,
    pub class_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: impl Into<String>, class_id: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: new_id(),
            sort_name: sortable_name(&name),
            name,
            class_id: class_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.sort_name = sortable_name(&self.name);
    }
}

/// Lower-cased `"last, first middle"` key so rosters sort by family name.
pub fn sortable_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_lowercase(),
        Some((last, rest)) => format!("{}, {}", last, rest.join(" ")).to_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub class_id: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        title: impl Into<String>,
        class_id: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title: title.into(),
            class_id: class_id.into(),
            due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageError {
    pub category: ErrorCategory,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl LanguageError {
    pub fn new(category: ErrorCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            correction: None,
            explanation: None,
        }
    }
}

/// Output of the handwriting + language analysis pipeline for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub errors: Vec<LanguageError>,
    #[serde(default)]
    pub suggested_grade: Option<f64>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn error_counts(&self) -> BTreeMap<ErrorCategory, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.errors {
            *counts.entry(e.category).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub id: String,
    pub student_id: String,
    pub assignment_id: String,
    /// Paths relative to the images root, `"<submissionId>/<filename>"`.
    #[serde(default)]
    pub image_paths: Vec<String>,
    #[serde(default)]
    pub analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub final_grade: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentSubmission {
    pub fn new(student_id: impl Into<String>, assignment_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            student_id: student_id.into(),
            assignment_id: assignment_id.into(),
            image_paths: Vec::new(),
            analysis: None,
            final_grade: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.final_grade.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricCriterion {
    pub category: ErrorCategory,
    pub points_per_error: f64,
    pub max_deduction: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRubric {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub criteria: Vec<RubricCriterion>,
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradingRubric {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: Vec<RubricCriterion>,
        max_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: description.into(),
            criteria,
            max_score,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rubric synthesized when a data directory holds no rubric at all.
    pub fn default_rubric() -> Self {
        let criterion = |category, description: &str| RubricCriterion {
            category,
            points_per_error: 0.5,
            max_deduction: 5.0,
            description: description.to_string(),
        };
        Self::new(
            "Standard",
            "Half a point per error, at most five points per category.",
            vec![
                criterion(ErrorCategory::Grammar, "Agreement, tense and conjugation"),
                criterion(ErrorCategory::Spelling, "Spelling and accents"),
                criterion(ErrorCategory::Vocabulary, "Word choice and register"),
                criterion(ErrorCategory::Syntax, "Sentence structure and punctuation"),
            ],
            20.0,
        )
    }

    /// Suggested grade for an analysed submission.
    ///
    /// Each criterion deducts `points_per_error` per matching error, capped at
    /// `max_deduction`; the total never drops below zero.
    pub fn score(&self, analysis: &AnalysisResult) -> f64 {
        let counts = analysis.error_counts();
        let deducted: f64 = self
            .criteria
            .iter()
            .map(|c| {
                let n = counts.get(&c.category).copied().unwrap_or(0) as f64;
                (n * c.points_per_error).min(c.max_deduction).max(0.0)
            })
            .sum();
        (self.max_score - deducted).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestion {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

/// Practice test generated for an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: String,
    pub assignment_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<TestQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Test {
    pub fn new(
        assignment_id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<TestQuestion>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            assignment_id: assignment_id.into(),
            title: title.into(),
            questions,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Common surface of the six stored entity types.
pub trait Record: Clone + Serialize + DeserializeOwned {
    const KIND: &'static str;
    const COLLECTION: Collection;

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, at: DateTime<Utc>);
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

macro_rules! impl_record {
    ($ty:ty, $kind:literal, $collection:expr) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn set_created_at(&mut self, at: DateTime<Utc>) {
                self.created_at = at;
            }
            fn set_updated_at(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }
        }
    };
}

impl_record!(SchoolClass, "class", Collection::Classes);
impl_record!(Student, "student", Collection::Students);
impl_record!(Assignment, "assignment", Collection::Assignments);
impl_record!(StudentSubmission, "submission", Collection::Submissions);
impl_record!(GradingRubric, "rubric", Collection::Rubrics);
impl_record!(Test, "test", Collection::Tests);
