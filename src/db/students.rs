use tracing::info;

use crate::db::catalog::{next_id, Catalog};
use crate::error::CatalogError;
use crate::models::{Entity, Student, StudentPatch};

impl Catalog {
    /// Id the next new student should get; the add form is pre-seeded with it.
    pub fn next_student_id(&self) -> i64 {
        next_id(&self.students)
    }

    /// Insert a new student and rewrite the students resource. The id must not
    /// already be in use.
    pub fn add_student(&mut self, student: Student) -> Result<(), CatalogError> {
        if self.students.contains_key(&student.id) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Student,
                key: format!("ID {}", student.id),
            });
        }

        info!(id = student.id, name = %student.name, "adding student");
        self.students.insert(student.id, student);
        self.persist(&self.students)
    }

    /// Look a student up by id.
    pub fn find_student(&self, id: i64) -> Option<&Student> {
        self.students.get(&id)
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// Apply a partial update. Fields left as `Keep` (or set to blank text)
    /// retain their stored value.
    pub fn update_student(&mut self, id: i64, patch: StudentPatch) -> Result<(), CatalogError> {
        let student = self
            .students
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Student, id))?;

        patch.name.apply_to(&mut student.name);
        patch.grade.apply_to(&mut student.grade);

        info!(id, "updated student");
        self.persist(&self.students)
    }

    /// Delete a student unless they still hold an active loan.
    pub fn remove_student(&mut self, id: i64) -> Result<Student, CatalogError> {
        if !self.students.contains_key(&id) {
            return Err(CatalogError::not_found(Entity::Student, id));
        }

        if let Some(loan) = self
            .loans
            .values()
            .find(|loan| loan.student_id == id && loan.is_active())
        {
            return Err(CatalogError::ReferentialConflict {
                entity: Entity::Student,
                id,
                reason: format!("student has an active loan (loan ID {})", loan.id),
            });
        }

        let removed = self
            .students
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Student, id))?;
        info!(id, "removed student");
        self.persist(&self.students)?;
        Ok(removed)
    }
}
