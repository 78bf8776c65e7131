//! In-memory authoritative collections, persisted one file per collection on
//! every mutation.

mod assignments;
mod classes;
mod rubrics;
mod students;
mod submissions;

use crate::error::StoreError;
use crate::images::ImageStore;
use crate::integrity::{DanglingRef, Touched};
use crate::model::{
    Assignment, GradingRubric, Record, SchoolClass, Student, StudentSubmission, Test,
};
use crate::persist::{self, Collection, DataLayout, LoadOutcome};
use chrono::Utc;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub(crate) struct Collections {
    pub classes: Vec<SchoolClass>,
    pub students: Vec<Student>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<StudentSubmission>,
    pub rubrics: Vec<GradingRubric>,
    pub tests: Vec<Test>,
}

/// How each collection came off disk when the store was opened.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub outcomes: Vec<(Collection, LoadOutcome)>,
    /// Set when the data directory could not be created.
    pub dir_error: Option<String>,
    pub default_rubric_created: bool,
    /// Class id lists were rebuilt in memory to match the loaded children.
    pub class_lists_repaired: bool,
    /// Records left pointing at a parent that did not load.
    pub dangling: Vec<DanglingRef>,
}

impl LoadReport {
    pub fn outcome(&self, collection: Collection) -> Option<&LoadOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, o)| o)
    }

    pub fn quarantined(&self) -> Vec<Collection> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, LoadOutcome::Quarantined { .. }))
            .map(|(c, _)| *c)
            .collect()
    }
}

/// The record store. One owner per process; mutators take `&mut self`.
#[derive(Debug)]
pub struct Store {
    layout: DataLayout,
    images: ImageStore,
    pub(crate) data: Collections,
    report: LoadReport,
}

impl Store {
    /// Opens (or initialises) the store under an application-data root.
    ///
    /// Never fails: unreadable or corrupt collections start empty and are
    /// described in [`Store::load_report`].
    pub fn open(root: impl Into<PathBuf>) -> Store {
        let layout = DataLayout::new(root);
        let mut report = LoadReport::default();
        if let Err(e) = layout.ensure_dirs() {
            tracing::warn!(
                root = %layout.root().to_string_lossy(),
                error = %e,
                "could not create data directory"
            );
            report.dir_error = Some(e.to_string());
        }

        let dir = layout.data_dir();
        let mut data = Collections::default();
        let mut record = |c: Collection, o: LoadOutcome| report.outcomes.push((c, o));

        let (items, o) = persist::load(&dir, Collection::Classes);
        data.classes = items;
        record(Collection::Classes, o);
        let (items, o) = persist::load(&dir, Collection::Students);
        data.students = items;
        record(Collection::Students, o);
        let (items, o) = persist::load(&dir, Collection::Assignments);
        data.assignments = items;
        record(Collection::Assignments, o);
        let (items, o) = persist::load(&dir, Collection::Submissions);
        data.submissions = items;
        record(Collection::Submissions, o);
        let (items, o) = persist::load(&dir, Collection::Rubrics);
        data.rubrics = items;
        record(Collection::Rubrics, o);
        let (items, o) = persist::load(&dir, Collection::Tests);
        data.tests = items;
        record(Collection::Tests, o);

        // Class lists follow what actually loaded; written back with the next
        // classes save.
        report.class_lists_repaired = data.reconcile_class_lists();
        if report.class_lists_repaired {
            tracing::warn!("class id lists did not match loaded students/assignments, rebuilt");
        }
        report.dangling = data.dangling_references();
        for d in &report.dangling {
            tracing::warn!(
                collection = %d.collection,
                id = d.id.as_str(),
                parent_kind = d.parent_kind,
                parent_id = d.parent_id.as_str(),
                "record points at a parent that did not load"
            );
        }

        let images = ImageStore::new(layout.images_dir());
        let mut store = Store {
            layout,
            images,
            data,
            report,
        };

        if store.data.rubrics.is_empty() {
            store.report.default_rubric_created = true;
            if let Err(e) = store.ensure_default_rubric() {
                tracing::warn!(error = %e, "default rubric not persisted");
            }
        }

        tracing::info!(
            root = %store.layout.root().to_string_lossy(),
            classes = store.data.classes.len(),
            students = store.data.students.len(),
            assignments = store.data.assignments.len(),
            submissions = store.data.submissions.len(),
            rubrics = store.data.rubrics.len(),
            tests = store.data.tests.len(),
            "store opened"
        );
        store
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Rewrites one collection from memory.
    pub(crate) fn save(&self, collection: Collection) -> Result<(), StoreError> {
        let dir = self.layout.data_dir();
        let d = &self.data;
        let res = match collection {
            Collection::Classes => persist::save(&dir, collection, &d.classes),
            Collection::Students => persist::save(&dir, collection, &d.students),
            Collection::Assignments => persist::save(&dir, collection, &d.assignments),
            Collection::Submissions => persist::save(&dir, collection, &d.submissions),
            Collection::Rubrics => persist::save(&dir, collection, &d.rubrics),
            Collection::Tests => persist::save(&dir, collection, &d.tests),
        };
        res.map_err(|e| {
            tracing::warn!(%collection, error = %e, "write failed, change kept in memory only");
            StoreError::Persist {
                collection,
                message: e.to_string(),
            }
        })
    }

    /// Saves every touched collection, attempting all of them and reporting
    /// the first failure.
    pub(crate) fn save_touched(&self, touched: &Touched) -> Result<(), StoreError> {
        let mut first = None;
        for c in touched.iter() {
            if let Err(e) = self.save(c) {
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Stamps both timestamps and appends, rejecting a repeated id.
pub(crate) fn insert_record<T: Record>(items: &mut Vec<T>, mut value: T) -> Result<(), StoreError> {
    if items.iter().any(|r| r.id() == value.id()) {
        return Err(StoreError::DuplicateId {
            kind: T::KIND,
            id: value.id().to_string(),
        });
    }
    let now = Utc::now();
    value.set_created_at(now);
    value.set_updated_at(now);
    items.push(value);
    Ok(())
}

/// Replaces the stored record with the same id, keeping its creation time.
/// Returns false when no such record exists.
pub(crate) fn replace_record<T: Record>(items: &mut [T], mut value: T) -> bool {
    let Some(slot) = items.iter_mut().find(|r| r.id() == value.id()) else {
        return false;
    };
    value.set_created_at(slot.created_at());
    value.set_updated_at(Utc::now());
    *slot = value;
    true
}

pub(crate) fn find_record<'a, T: Record>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|r| r.id() == id)
}

pub(crate) fn validate_grade(grade: Option<f64>) -> Result<(), StoreError> {
    match grade {
        Some(g) if !g.is_finite() => Err(StoreError::InvalidGrade(g)),
        _ => Ok(()),
    }
}
