use crate::models::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Record has no usable id")]
    MissingId,

    #[error("Invalid {kind} record: {message}")]
    InvalidRecord { kind: EntityKind, message: String },

    #[error("Entity not found: {kind} with id {id}")]
    NotFound { kind: EntityKind, id: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
