use diesel::result::{DatabaseErrorKind, Error as DieselError};
use foodgram_types::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("duplicate key value violates unique constraint of {table:?}")]
    DuplicationError { table: String },
    #[error("foreign key constraint violation")]
    ViolationError(),
    #[error("check constraint violation of {table:?}")]
    CheckViolation { table: String },
    #[error("database error: {0}")]
    Internal(DieselError),
}

impl From<DieselError> for DatabaseError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                DatabaseError::DuplicationError {
                    table: info.table_name().unwrap_or_default().to_string(),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                DatabaseError::ViolationError()
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, ref info) => {
                DatabaseError::CheckViolation {
                    table: info.table_name().unwrap_or_default().to_string(),
                }
            }
            e => DatabaseError::Internal(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum CommonError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i32 },

    #[error("{0} already exists")]
    Conflict(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl CommonError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        CommonError::NotFound { entity, id }
    }
}

impl From<DieselError> for CommonError {
    fn from(e: DieselError) -> Self {
        CommonError::Database(e.into())
    }
}
