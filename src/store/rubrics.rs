use super::{find_record, insert_record, replace_record, Store};
use crate::error::StoreError;
use crate::model::GradingRubric;
use crate::persist::Collection;

impl Store {
    pub fn add_rubric(&mut self, rubric: GradingRubric) -> Result<(), StoreError> {
        insert_record(&mut self.data.rubrics, rubric)?;
        self.save(Collection::Rubrics)
    }

    pub fn update_rubric(&mut self, rubric: GradingRubric) -> Result<(), StoreError> {
        if !replace_record(&mut self.data.rubrics, rubric) {
            return Ok(());
        }
        self.save(Collection::Rubrics)
    }

    /// Removing the last rubric brings the default one back.
    pub fn delete_rubric(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.data.rubrics.len();
        self.data.rubrics.retain(|r| r.id != id);
        if self.data.rubrics.len() == before {
            return Ok(());
        }
        if self.data.rubrics.is_empty() {
            return self.ensure_default_rubric();
        }
        self.save(Collection::Rubrics)
    }

    pub(crate) fn ensure_default_rubric(&mut self) -> Result<(), StoreError> {
        if !self.data.rubrics.is_empty() {
            return Ok(());
        }
        tracing::info!("no grading rubric on disk, creating the default one");
        insert_record(&mut self.data.rubrics, GradingRubric::default_rubric())?;
        self.save(Collection::Rubrics)
    }

    pub fn rubric(&self, id: &str) -> Option<&GradingRubric> {
        find_record(&self.data.rubrics, id)
    }

    pub fn rubrics(&self) -> &[GradingRubric] {
        &self.data.rubrics
    }

    /// First rubric in storage order; there is always at least one.
    pub fn default_rubric(&self) -> Option<&GradingRubric> {
        self.data.rubrics.first()
    }
}
