use std::fmt::{self, Display};

use warp::reject::Reject;

/// Failure kinds surfaced to the consuming server. Every database action
/// returns `Result<_, Error>`; nothing is retried and nothing is swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Database(String),
}

impl Error {
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Database(_) => 500,
        }
    }
}

impl Reject for Error {}

pub struct QueryError {
    error: Error,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            error: Error::Database(info),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        let error = match value {
            // Constraint violations are the storage layer losing a race the
            // application-level checks already ran: uniqueness clashes map to
            // Conflict, dangling references to NotFound.
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    Error::Conflict(format!("{e}"))
                } else if e.is_foreign_key_violation() {
                    Error::NotFound(format!("{e}"))
                } else {
                    Error::Database(format!("{e}"))
                }
            }
            sqlx::Error::RowNotFound => Error::NotFound(String::from("Row not found")),
            sqlx::Error::Configuration(e) => Error::Database(format!("{e}")),
            sqlx::Error::Io(e) => Error::Database(format!("{e}")),
            sqlx::Error::Tls(e) => Error::Database(format!("{e}")),
            sqlx::Error::Protocol(e) => Error::Database(format!("{e}")),
            sqlx::Error::TypeNotFound { type_name } => {
                Error::Database(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Error::Database(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Error::Database(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Error::Database(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Error::Database(format!("{e}")),
            sqlx::Error::PoolTimedOut => Error::Database(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Error::Database(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Error::Database(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Error::Database(format!("{e}")),
            _ => Error::Database(String::from("Unknown error")),
        };

        Self { error }
    }
}

impl Into<Error> for QueryError {
    fn into(self) -> Error {
        self.error
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl Into<Error> for TypeError {
    fn into(self) -> Error {
        Error::Validation(self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::Validation("x".into()).status(), 400);
        assert_eq!(Error::Unauthorized("x".into()).status(), 401);
        assert_eq!(Error::Forbidden("x".into()).status(), 403);
        assert_eq!(Error::NotFound("x".into()).status(), 404);
        assert_eq!(Error::Conflict("x".into()).status(), 409);
        assert_eq!(Error::Database("x".into()).status(), 500);
    }

    #[test]
    fn type_errors_surface_as_validation() {
        let error: Error = TypeError::new("bad value").into();
        assert_eq!(error, Error::Validation(String::from("bad value")));
    }

    #[test]
    fn row_not_found_translates_to_not_found() {
        let error: Error = QueryError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(error.status(), 404);
    }
}
