use thiserror::Error;

use crate::auth::PasswordError;
use crate::database::models::EntityKind;
use crate::database::PageError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid {entity} id")]
    InvalidIdentifier { entity: EntityKind },

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} name already exists")]
    DuplicateName { entity: EntityKind },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("{entity} not found")]
    NotFound { entity: EntityKind },

    #[error("assignment already exists")]
    AssignmentExists,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind) -> Self {
        ServiceError::NotFound { entity }
    }
}

/// Known constraint violations become domain errors; anything else stays an
/// opaque store failure.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName { entity } => ServiceError::DuplicateName { entity },
            StoreError::DuplicateEmail => ServiceError::DuplicateEmail,
            StoreError::AssignmentExists => ServiceError::AssignmentExists,
            other => {
                tracing::error!("Store failure: {}", other);
                ServiceError::Store(other)
            }
        }
    }
}

impl From<PageError> for ServiceError {
    fn from(err: PageError) -> Self {
        let field = match err {
            PageError::InvalidLimit => "limit",
            PageError::InvalidOffset => "offset",
        };
        ServiceError::validation(field, err.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Unexpected(anyhow::Error::new(err))
    }
}
