use super::{find_record, insert_record, replace_record, Store};
use crate::error::StoreError;
use crate::integrity::Touched;
use crate::model::Assignment;
use crate::persist::Collection;
use std::cmp::Ordering;

impl Store {
    pub fn add_assignment(&mut self, assignment: Assignment) -> Result<(), StoreError> {
        if self.class(&assignment.class_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "class",
                id: assignment.class_id,
            });
        }
        let id = assignment.id.clone();
        let class_id = assignment.class_id.clone();
        insert_record(&mut self.data.assignments, assignment)?;
        self.data.attach_assignment(&class_id, &id);

        let mut touched = Touched::default();
        touched.mark(Collection::Assignments);
        touched.mark(Collection::Classes);
        self.save_touched(&touched)
    }

    pub fn update_assignment(&mut self, assignment: Assignment) -> Result<(), StoreError> {
        let Some(previous_class) = self.assignment(&assignment.id).map(|a| a.class_id.clone())
        else {
            return Ok(());
        };
        let moved = previous_class != assignment.class_id;
        if moved && self.class(&assignment.class_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "class",
                id: assignment.class_id,
            });
        }
        let id = assignment.id.clone();
        let class_id = assignment.class_id.clone();
        replace_record(&mut self.data.assignments, assignment);

        let mut touched = Touched::default();
        touched.mark(Collection::Assignments);
        if moved {
            self.data.detach_assignment(&id, &mut touched);
            self.data.attach_assignment(&class_id, &id);
            touched.mark(Collection::Classes);
        }
        self.save_touched(&touched)
    }

    /// Removes the assignment with its submissions and tests.
    pub fn delete_assignment(&mut self, id: &str) -> Result<(), StoreError> {
        if self.assignment(id).is_none() {
            return Ok(());
        }
        let mut touched = Touched::default();
        self.data
            .cascade_delete_assignment(id, &self.images, &mut touched);
        self.save_touched(&touched)
    }

    pub fn assignment(&self, id: &str) -> Option<&Assignment> {
        find_record(&self.data.assignments, id)
    }

    /// Latest due date first; undated assignments at the end.
    pub fn assignments_in_class(&self, class_id: &str) -> Vec<&Assignment> {
        let mut out: Vec<&Assignment> = self
            .data
            .assignments
            .iter()
            .filter(|a| a.class_id == class_id)
            .collect();
        out.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        out
    }
}
