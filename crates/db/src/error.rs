//! Typed error types for the db crate.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Which kind of integrity constraint Postgres rejected a write with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Check,
    ForeignKey,
    NotNull,
    Unique,
}

impl ConstraintKind {
    /// Maps a driver error kind onto a constraint kind, or `None` for
    /// database errors that are not integrity violations.
    pub fn from_error_kind(kind: ErrorKind) -> Option<Self> {
        match kind {
            ErrorKind::CheckViolation => Some(Self::Check),
            ErrorKind::ForeignKeyViolation => Some(Self::ForeignKey),
            ErrorKind::NotNullViolation => Some(Self::NotNull),
            ErrorKind::UniqueViolation => Some(Self::Unique),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Check      => write!(f, "check"),
            Self::ForeignKey => write!(f, "foreign key"),
            Self::NotNull    => write!(f, "not-null"),
            Self::Unique     => write!(f, "unique"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// Opening the connection failed (bad host, credentials, network).
    #[error("connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// An open connection died mid-use (socket reset, server shutdown,
    /// backend terminated). The repository drops the handle; reconnect to
    /// continue.
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] sqlx::Error),

    /// The repository has no open connection.
    #[error("not connected to the database")]
    NotConnected,

    /// A write was rejected by a table constraint.
    #[error("{kind} constraint violated{}: {message}", constraint_suffix(.constraint))]
    Constraint {
        kind: ConstraintKind,
        constraint: Option<String>,
        message: String,
    },

    /// Any other failure reported by the driver or the server.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
}

fn constraint_suffix(constraint: &Option<String>) -> String {
    constraint
        .as_deref()
        .map(|name| format!(" ({name})"))
        .unwrap_or_default()
}

impl DbError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }

    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// SQLSTATEs meaning the server side of the session is gone: class `08`
/// (connection exception) plus the `57P0x` shutdown/termination codes.
pub fn is_connection_lost_code(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let lost = match &err {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => true,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .is_some_and(|code| is_connection_lost_code(&code)),
            _ => false,
        };
        if lost {
            return Self::ConnectionLost(err);
        }

        if let sqlx::Error::Database(db_err) = &err {
            if let Some(kind) = ConstraintKind::from_error_kind(db_err.kind()) {
                return Self::Constraint {
                    kind,
                    constraint: db_err.constraint().map(str::to_owned),
                    message: db_err.message().to_owned(),
                };
            }
        }
        Self::Query(err)
    }
}

/// Errors raised while building a [`crate::DbConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid DB_PORT '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
