//! Offline record store for a classroom-grading application: classes,
//! students, assignments, submissions, rubrics and generated tests, kept in
//! memory and persisted as one JSON file per collection.

pub mod backup;
pub mod error;
pub mod images;
pub mod integrity;
pub mod ipc;
pub mod model;
pub mod persist;
pub mod stats;
pub mod store;

pub use error::StoreError;
pub use images::{ImageData, ImageFormat, ImageStore};
pub use model::{
    AnalysisResult, Assignment, ErrorCategory, GradingRubric, LanguageError, RubricCriterion,
    SchoolClass, Student, StudentSubmission, Test, TestQuestion,
};
pub use persist::{Collection, DataLayout, LoadOutcome};
pub use store::{LoadReport, Store};
