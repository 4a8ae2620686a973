use lsc_core::QueryError;
use thiserror::Error;

/// Failure of a terminal builder operation.
///
/// Backend errors are carried as-is, so callers can match on their own
/// error type.
#[derive(Error, Debug)]
pub enum ExecuteError<E>
where
    E: std::error::Error + 'static,
{
    /// The accumulated builder state could not be compiled to SQL
    #[error(transparent)]
    Compile(#[from] QueryError),

    /// The execution backend failed
    #[error(transparent)]
    Backend(E),
}

impl<E: std::error::Error + 'static> ExecuteError<E> {
    /// The backend error, if this is one
    pub fn backend(&self) -> Option<&E> {
        match self {
            ExecuteError::Backend(err) => Some(err),
            ExecuteError::Compile(_) => None,
        }
    }

    /// Take the backend error, if this is one
    pub fn into_backend(self) -> Option<E> {
        match self {
            ExecuteError::Backend(err) => Some(err),
            ExecuteError::Compile(_) => None,
        }
    }
}
