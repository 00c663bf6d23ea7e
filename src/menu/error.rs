//! Engine error taxonomy

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::model::MenuId;

/// A single field-scoped validation failure
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field failure found in one input
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), MenuError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(MenuError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Per-entry result of a batch operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub id: MenuId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn ok(id: MenuId) -> Self {
        Self { id, ok: true, error: None }
    }

    pub fn failed(id: MenuId, error: &MenuError) -> Self {
        Self {
            id,
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum MenuError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("menu {0} not found")]
    NotFound(MenuId),

    #[error("parent menu {0} not found")]
    ParentNotFound(MenuId),

    #[error("menu {id} cannot be placed under {parent_id}: it would become its own ancestor")]
    CyclicParent { id: MenuId, parent_id: MenuId },

    #[error("menu name '{0}' already exists")]
    DuplicateName(String),

    #[error("batch rejected: {} of {} entries failed", failed_count(.0), .0.len())]
    PartialBatch(Vec<BatchOutcome>),
}

fn failed_count(outcomes: &[BatchOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.ok).count()
}

impl MenuError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        MenuError::Validation(ValidationErrors::single(field, message))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MenuError::NotFound(_) | MenuError::ParentNotFound(_))
    }
}

pub type MenuResult<T> = Result<T, MenuError>;
