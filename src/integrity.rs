//! Cascade deletes. Dependents are removed before their parent, and every
//! collection changed along the way is recorded so the store can persist it.

use crate::images::ImageStore;
use crate::persist::Collection;
use crate::store::Collections;
use std::collections::BTreeSet;

/// Collections modified by one cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched(BTreeSet<Collection>);

impl Touched {
    pub fn mark(&mut self, collection: Collection) {
        self.0.insert(collection);
    }

    pub fn contains(&self, collection: Collection) -> bool {
        self.0.contains(&collection)
    }

    pub fn iter(&self) -> impl Iterator<Item = Collection> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Collections {
    /// Students, then assignments, then the class itself.
    pub(crate) fn cascade_delete_class(
        &mut self,
        class_id: &str,
        images: &ImageStore,
        touched: &mut Touched,
    ) {
        let student_ids: Vec<String> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id.clone())
            .collect();
        for id in &student_ids {
            self.cascade_delete_student(id, images, touched);
        }

        let assignment_ids: Vec<String> = self
            .assignments
            .iter()
            .filter(|a| a.class_id == class_id)
            .map(|a| a.id.clone())
            .collect();
        for id in &assignment_ids {
            self.cascade_delete_assignment(id, images, touched);
        }

        let before = self.classes.len();
        self.classes.retain(|c| c.id != class_id);
        if self.classes.len() != before {
            touched.mark(Collection::Classes);
        }
    }

    pub(crate) fn cascade_delete_student(
        &mut self,
        student_id: &str,
        images: &ImageStore,
        touched: &mut Touched,
    ) {
        let submission_ids: Vec<String> = self
            .submissions
            .iter()
            .filter(|s| s.student_id == student_id)
            .map(|s| s.id.clone())
            .collect();
        for id in &submission_ids {
            self.cascade_delete_submission(id, images, touched);
        }

        self.detach_student(student_id, touched);

        let before = self.students.len();
        self.students.retain(|s| s.id != student_id);
        if self.students.len() != before {
            touched.mark(Collection::Students);
        }
    }

    pub(crate) fn cascade_delete_assignment(
        &mut self,
        assignment_id: &str,
        images: &ImageStore,
        touched: &mut Touched,
    ) {
        let submission_ids: Vec<String> = self
            .submissions
            .iter()
            .filter(|s| s.assignment_id == assignment_id)
            .map(|s| s.id.clone())
            .collect();
        for id in &submission_ids {
            self.cascade_delete_submission(id, images, touched);
        }

        let before = self.tests.len();
        self.tests.retain(|t| t.assignment_id != assignment_id);
        if self.tests.len() != before {
            touched.mark(Collection::Tests);
        }

        self.detach_assignment(assignment_id, touched);

        let before = self.assignments.len();
        self.assignments.retain(|a| a.id != assignment_id);
        if self.assignments.len() != before {
            touched.mark(Collection::Assignments);
        }
    }

    /// Image files go first (best-effort), then the record.
    pub(crate) fn cascade_delete_submission(
        &mut self,
        submission_id: &str,
        images: &ImageStore,
        touched: &mut Touched,
    ) {
        let Some(pos) = self.submissions.iter().position(|s| s.id == submission_id) else {
            return;
        };
        let sub = &self.submissions[pos];
        images.remove_submission_images(&sub.id, &sub.image_paths);
        self.submissions.remove(pos);
        touched.mark(Collection::Submissions);
    }

    /// Drops the id from every class roster that lists it.
    pub(crate) fn detach_student(&mut self, student_id: &str, touched: &mut Touched) {
        for class in self.classes.iter_mut() {
            let before = class.student_ids.len();
            class.student_ids.retain(|id| id != student_id);
            if class.student_ids.len() != before {
                touched.mark(Collection::Classes);
            }
        }
    }

    pub(crate) fn detach_assignment(&mut self, assignment_id: &str, touched: &mut Touched) {
        for class in self.classes.iter_mut() {
            let before = class.assignment_ids.len();
            class.assignment_ids.retain(|id| id != assignment_id);
            if class.assignment_ids.len() != before {
                touched.mark(Collection::Classes);
            }
        }
    }

    /// Adds the id to the class roster unless already present. Returns false
    /// when the class does not exist.
    pub(crate) fn attach_student(&mut self, class_id: &str, student_id: &str) -> bool {
        let Some(class) = self.classes.iter_mut().find(|c| c.id == class_id) else {
            return false;
        };
        if !class.student_ids.iter().any(|id| id == student_id) {
            class.student_ids.push(student_id.to_string());
        }
        true
    }

    pub(crate) fn attach_assignment(&mut self, class_id: &str, assignment_id: &str) -> bool {
        let Some(class) = self.classes.iter_mut().find(|c| c.id == class_id) else {
            return false;
        };
        if !class.assignment_ids.iter().any(|id| id == assignment_id) {
            class.assignment_ids.push(assignment_id.to_string());
        }
        true
    }

    /// Rebuilds every class's id lists from the loaded students and
    /// assignments. Existing order is kept for ids that still match; missing
    /// children are appended. Returns true when any list changed.
    pub(crate) fn reconcile_class_lists(&mut self) -> bool {
        let mut changed = false;
        for class in self.classes.iter_mut() {
            let students: Vec<&str> = self
                .students
                .iter()
                .filter(|s| s.class_id == class.id)
                .map(|s| s.id.as_str())
                .collect();
            changed |= rebuild_ids(&mut class.student_ids, &students);

            let assignments: Vec<&str> = self
                .assignments
                .iter()
                .filter(|a| a.class_id == class.id)
                .map(|a| a.id.as_str())
                .collect();
            changed |= rebuild_ids(&mut class.assignment_ids, &assignments);
        }
        changed
    }

    /// Records whose parent is not loaded, usually because the parent's
    /// collection was quarantined.
    pub(crate) fn dangling_references(&self) -> Vec<DanglingRef> {
        let has_class = |id: &str| self.classes.iter().any(|c| c.id == id);
        let has_student = |id: &str| self.students.iter().any(|s| s.id == id);
        let has_assignment = |id: &str| self.assignments.iter().any(|a| a.id == id);
        let mut out = Vec::new();
        let mut push = |collection, id: &str, parent_kind, parent_id: &str| {
            out.push(DanglingRef {
                collection,
                id: id.to_string(),
                parent_kind,
                parent_id: parent_id.to_string(),
            })
        };

        for s in self.students.iter().filter(|s| !has_class(&s.class_id)) {
            push(Collection::Students, &s.id, "class", &s.class_id);
        }
        for a in self.assignments.iter().filter(|a| !has_class(&a.class_id)) {
            push(Collection::Assignments, &a.id, "class", &a.class_id);
        }
        for sub in &self.submissions {
            if !has_student(&sub.student_id) {
                push(Collection::Submissions, &sub.id, "student", &sub.student_id);
            }
            if !has_assignment(&sub.assignment_id) {
                push(Collection::Submissions, &sub.id, "assignment", &sub.assignment_id);
            }
        }
        for t in self.tests.iter().filter(|t| !has_assignment(&t.assignment_id)) {
            push(Collection::Tests, &t.id, "assignment", &t.assignment_id);
        }
        out
    }
}

/// A stored record pointing at a parent that is not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub collection: Collection,
    pub id: String,
    pub parent_kind: &'static str,
    pub parent_id: String,
}

fn rebuild_ids(ids: &mut Vec<String>, children: &[&str]) -> bool {
    let mut next: Vec<String> = Vec::with_capacity(children.len());
    for id in ids.iter() {
        if children.contains(&id.as_str()) && !next.contains(id) {
            next.push(id.clone());
        }
    }
    for child in children {
        if !next.iter().any(|id| id == child) {
            next.push(child.to_string());
        }
    }
    if next == *ids {
        return false;
    }
    *ids = next;
    true
}
