//! Read-only aggregates over the store, recomputed on every call. Grades are
//! on the 0-20 scale.

use crate::model::{ErrorCategory, StudentSubmission};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

const COMMON_ERROR_LIMIT: usize = 10;

/// `(label, lower bound inclusive)`; each bucket runs to the next bound and
/// the last one is open-ended.
const BUCKETS: [(&str, f64); 8] = [
    ("0-4", 0.0),
    ("5-7", 5.0),
    ("8-9", 8.0),
    ("10-11", 10.0),
    ("12-13", 12.0),
    ("14-15", 14.0),
    ("16-17", 16.0),
    ("18-20", 18.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBucket {
    pub label: &'static str,
    pub min: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePoint {
    pub at: DateTime<Utc>,
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: ErrorCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrequency {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub student_id: String,
    pub total_submissions: usize,
    pub graded_count: usize,
    pub average_grade: Option<f64>,
    pub total_errors: usize,
    pub errors_by_category: BTreeMap<ErrorCategory, usize>,
    pub grade_history: Vec<GradePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub class_id: String,
    pub student_count: usize,
    pub assignment_count: usize,
    pub submission_count: usize,
    pub graded_count: usize,
    pub average_grade: Option<f64>,
    pub distribution: Vec<GradeBucket>,
    pub top_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub assignment_id: String,
    pub submission_count: usize,
    pub graded_count: usize,
    pub average_grade: Option<f64>,
    pub median_grade: Option<f64>,
    pub highest_grade: Option<f64>,
    pub lowest_grade: Option<f64>,
    pub distribution: Vec<GradeBucket>,
    pub common_errors: Vec<ErrorFrequency>,
}

pub fn bucket_index(grade: f64) -> usize {
    BUCKETS
        .iter()
        .rposition(|(_, min)| grade >= *min)
        .unwrap_or(0)
}

/// Eight fixed buckets, all present even when empty.
pub fn grade_distribution<I>(grades: I) -> Vec<GradeBucket>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = [0usize; BUCKETS.len()];
    for g in grades {
        counts[bucket_index(g)] += 1;
    }
    BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(label, min), count)| GradeBucket {
            label,
            min,
            count,
        })
        .collect()
}

fn sort_grades(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Element at index `n / 2` of the ascending list. For an even count that is
/// the upper of the two middle values; no interpolation.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sort_grades(&mut sorted);
    Some(sorted[sorted.len() / 2])
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / (values.len() as f64))
    }
}

fn graded(subs: &[&StudentSubmission]) -> Vec<f64> {
    subs.iter().filter_map(|s| s.final_grade).collect()
}

fn category_totals(subs: &[&StudentSubmission]) -> BTreeMap<ErrorCategory, usize> {
    let mut totals = BTreeMap::new();
    for sub in subs {
        let Some(analysis) = sub.analysis.as_ref() else {
            continue;
        };
        for (cat, n) in analysis.error_counts() {
            *totals.entry(cat).or_insert(0) += n;
        }
    }
    totals
}

pub fn student_stats(store: &Store, student_id: &str) -> Option<StudentStats> {
    store.student(student_id)?;
    let subs = store.submissions_for_student(student_id);
    let grades = graded(&subs);
    let errors_by_category = category_totals(&subs);

    let mut history: Vec<GradePoint> = subs
        .iter()
        .filter_map(|s| {
            s.final_grade.map(|grade| GradePoint {
                at: s.updated_at,
                grade,
            })
        })
        .collect();
    history.sort_by(|a, b| a.at.cmp(&b.at));

    Some(StudentStats {
        student_id: student_id.to_string(),
        total_submissions: subs.len(),
        graded_count: grades.len(),
        average_grade: average(&grades),
        total_errors: errors_by_category.values().sum(),
        errors_by_category,
        grade_history: history,
    })
}

/// Aggregates over the submissions of the class's students.
pub fn class_stats(store: &Store, class_id: &str) -> Option<ClassStats> {
    store.class(class_id)?;
    let students = store.students_in_class(class_id);
    let assignments = store.assignments_in_class(class_id);
    let subs: Vec<&StudentSubmission> = students
        .iter()
        .flat_map(|s| store.submissions_for_student(&s.id))
        .collect();
    let grades = graded(&subs);

    let mut top_categories: Vec<CategoryCount> = category_totals(&subs)
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    // Stable sort keeps category declaration order for ties.
    top_categories.sort_by(|a, b| b.count.cmp(&a.count));

    Some(ClassStats {
        class_id: class_id.to_string(),
        student_count: students.len(),
        assignment_count: assignments.len(),
        submission_count: subs.len(),
        graded_count: grades.len(),
        average_grade: average(&grades),
        distribution: grade_distribution(grades.iter().copied()),
        top_categories,
    })
}

pub fn assignment_stats(store: &Store, assignment_id: &str) -> Option<AssignmentStats> {
    store.assignment(assignment_id)?;
    let subs = store.submissions_for_assignment(assignment_id);
    let mut grades = graded(&subs);
    sort_grades(&mut grades);

    Some(AssignmentStats {
        assignment_id: assignment_id.to_string(),
        submission_count: subs.len(),
        graded_count: grades.len(),
        average_grade: average(&grades),
        median_grade: median(&grades),
        highest_grade: grades.last().copied(),
        lowest_grade: grades.first().copied(),
        distribution: grade_distribution(grades.iter().copied()),
        common_errors: common_errors(&subs, COMMON_ERROR_LIMIT),
    })
}

/// Most frequent error texts, ties in order of first appearance.
fn common_errors(subs: &[&StudentSubmission], limit: usize) -> Vec<ErrorFrequency> {
    let mut order: Vec<ErrorFrequency> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for sub in subs {
        let Some(analysis) = sub.analysis.as_ref() else {
            continue;
        };
        for e in &analysis.errors {
            match index.get(e.text.as_str()) {
                Some(&i) => order[i].count += 1,
                None => {
                    index.insert(e.text.as_str(), order.len());
                    order.push(ErrorFrequency {
                        text: e.text.clone(),
                        count: 1,
                    });
                }
            }
        }
    }
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(limit);
    order
}
