use super::{find_record, insert_record, replace_record, validate_grade, Store};
use crate::error::StoreError;
use crate::images::{is_owned_image_path, is_valid_submission_dir};
use crate::integrity::Touched;
use crate::model::StudentSubmission;
use crate::persist::Collection;

impl Store {
    /// Checks parents, grade, image paths and the one-submission-per-(student,
    /// assignment) rule.
    fn validate_submission(&self, sub: &StudentSubmission) -> Result<(), StoreError> {
        if self.student(&sub.student_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "student",
                id: sub.student_id.clone(),
            });
        }
        if self.assignment(&sub.assignment_id).is_none() {
            return Err(StoreError::MissingParent {
                kind: "assignment",
                id: sub.assignment_id.clone(),
            });
        }
        validate_grade(sub.final_grade)?;
        if !is_valid_submission_dir(&sub.id) {
            return Err(StoreError::InvalidImagePath {
                submission_id: sub.id.clone(),
                path: sub.id.clone(),
            });
        }
        if let Some(bad) = sub
            .image_paths
            .iter()
            .find(|p| !is_owned_image_path(&sub.id, p))
        {
            return Err(StoreError::InvalidImagePath {
                submission_id: sub.id.clone(),
                path: bad.clone(),
            });
        }
        let clash = self.data.submissions.iter().any(|s| {
            s.id != sub.id && s.student_id == sub.student_id && s.assignment_id == sub.assignment_id
        });
        if clash {
            return Err(StoreError::DuplicateSubmission {
                student_id: sub.student_id.clone(),
                assignment_id: sub.assignment_id.clone(),
            });
        }
        Ok(())
    }

    pub fn add_submission(&mut self, submission: StudentSubmission) -> Result<(), StoreError> {
        self.validate_submission(&submission)?;
        insert_record(&mut self.data.submissions, submission)?;
        self.save(Collection::Submissions)
    }

    pub fn update_submission(&mut self, submission: StudentSubmission) -> Result<(), StoreError> {
        if self.submission(&submission.id).is_none() {
            return Ok(());
        }
        self.validate_submission(&submission)?;
        replace_record(&mut self.data.submissions, submission);
        self.save(Collection::Submissions)
    }

    /// Removes the submission and its image directory.
    pub fn delete_submission(&mut self, id: &str) -> Result<(), StoreError> {
        if self.submission(id).is_none() {
            return Ok(());
        }
        let mut touched = Touched::default();
        self.data
            .cascade_delete_submission(id, &self.images, &mut touched);
        self.save_touched(&touched)
    }

    pub fn submission(&self, id: &str) -> Option<&StudentSubmission> {
        find_record(&self.data.submissions, id)
    }

    pub fn submissions_for_assignment(&self, assignment_id: &str) -> Vec<&StudentSubmission> {
        self.data
            .submissions
            .iter()
            .filter(|s| s.assignment_id == assignment_id)
            .collect()
    }

    pub fn submissions_for_student(&self, student_id: &str) -> Vec<&StudentSubmission> {
        self.data
            .submissions
            .iter()
            .filter(|s| s.student_id == student_id)
            .collect()
    }

    pub fn submission_for(&self, student_id: &str, assignment_id: &str) -> Option<&StudentSubmission> {
        self.data
            .submissions
            .iter()
            .find(|s| s.student_id == student_id && s.assignment_id == assignment_id)
    }
}
