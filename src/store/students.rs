use super::{find_record, insert_record, replace_record, Store};
use crate::error::StoreError;
use crate::integrity::Touched;
use crate::model::{sortable_name, Student};
use crate::persist::Collection;

impl Store {
    pub fn add_student(&mut self, mut student: Student) -> Result<(), StoreError> {
        if self.class(&student.class_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "class",
                id: student.class_id,
            });
        }
        student.sort_name = sortable_name(&student.name);
        let id = student.id.clone();
        let class_id = student.class_id.clone();
        insert_record(&mut self.data.students, student)?;
        self.data.attach_student(&class_id, &id);

        let mut touched = Touched::default();
        touched.mark(Collection::Students);
        touched.mark(Collection::Classes);
        self.save_touched(&touched)
    }

    /// Replaces a student. A changed `class_id` moves the student to the new
    /// class's roster.
    pub fn update_student(&mut self, mut student: Student) -> Result<(), StoreError> {
        let Some(previous_class) = self.student(&student.id).map(|s| s.class_id.clone()) else {
            return Ok(());
        };
        let moved = previous_class != student.class_id;
        if moved && self.class(&student.class_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "class",
                id: student.class_id,
            });
        }
        student.sort_name = sortable_name(&student.name);
        let id = student.id.clone();
        let class_id = student.class_id.clone();
        replace_record(&mut self.data.students, student);

        let mut touched = Touched::default();
        touched.mark(Collection::Students);
        if moved {
            self.data.detach_student(&id, &mut touched);
            self.data.attach_student(&class_id, &id);
            touched.mark(Collection::Classes);
        }
        self.save_touched(&touched)
    }

    pub fn delete_student(&mut self, id: &str) -> Result<(), StoreError> {
        if self.student(id).is_none() {
            return Ok(());
        }
        let mut touched = Touched::default();
        self.data.cascade_delete_student(id, &self.images, &mut touched);
        self.save_touched(&touched)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        find_record(&self.data.students, id)
    }

    /// Roster of a class, ordered by sortable name.
    pub fn students_in_class(&self, class_id: &str) -> Vec<&Student> {
        let mut out: Vec<&Student> = self
            .data
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect();
        out.sort_by(|a, b| a.sort_name.cmp(&b.sort_name));
        out
    }
}
