use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported by this backend: {0}")]
    Unsupported(String),

    #[error("Backend consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Field '{0}' not found in table '{1}'")]
    FieldNotFound(String, String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
