use super::{find_record, insert_record, Store};
use crate::error::StoreError;
use crate::integrity::Touched;
use crate::model::SchoolClass;
use crate::persist::Collection;
use chrono::Utc;

impl Store {
    /// Adds a class. Rosters start empty; they are filled by adding students
    /// and assignments.
    pub fn add_class(&mut self, mut class: SchoolClass) -> Result<(), StoreError> {
        class.student_ids.clear();
        class.assignment_ids.clear();
        insert_record(&mut self.data.classes, class)?;
        self.save(Collection::Classes)
    }

    /// Updates name and other caller-owned fields. The id lists are owned by
    /// the store and are never taken from the caller.
    pub fn update_class(&mut self, class: SchoolClass) -> Result<(), StoreError> {
        let Some(slot) = self.data.classes.iter_mut().find(|c| c.id == class.id) else {
            return Ok(());
        };
        slot.name = class.name;
        slot.updated_at = Utc::now();
        self.save(Collection::Classes)
    }

    pub fn delete_class(&mut self, id: &str) -> Result<(), StoreError> {
        if self.class(id).is_none() {
            return Ok(());
        }
        let mut touched = Touched::default();
        self.data.cascade_delete_class(id, &self.images, &mut touched);
        tracing::debug!(class_id = id, "class deleted");
        self.save_touched(&touched)
    }

    pub fn class(&self, id: &str) -> Option<&SchoolClass> {
        find_record(&self.data.classes, id)
    }

    pub fn classes(&self) -> &[SchoolClass] {
        &self.data.classes
    }

    /// All classes ordered by name, case-insensitively.
    pub fn classes_by_name(&self) -> Vec<&SchoolClass> {
        let mut out: Vec<&SchoolClass> = self.data.classes.iter().collect();
        out.sort_by_key(|c| c.name.to_lowercase());
        out
    }
}
