use thiserror::Error;

/// Errors raised by directory operations.
///
/// Database failures are classified by SQLSTATE; the driver error is kept as
/// the source so nothing the database reported is lost.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("phone number already exists")]
    DuplicatePhone(#[source] sqlx::Error),

    #[error("foreign key violation between client and phone")]
    ForeignKeyViolation(#[source] sqlx::Error),

    #[error("required column is null")]
    NotNull(#[source] sqlx::Error),

    #[error("value too long for column")]
    ValueTooLong(#[source] sqlx::Error),

    #[error("table does not exist")]
    MissingTable(#[source] sqlx::Error),

    #[error("table has dependent objects")]
    DependentObjects(#[source] sqlx::Error),

    #[error("cannot reach the database")]
    Connection(#[source] sqlx::Error),

    #[error(transparent)]
    Database(sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Name postgres gives the `UNIQUE` constraint on `phone.number`
const PHONE_NUMBER_CONSTRAINT: &str = "phone_number_key";

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        let violation = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|code| {
                let on_phone_number = db_err.constraint() == Some(PHONE_NUMBER_CONSTRAINT);
                (code.into_owned(), on_phone_number)
            }),
            _ => None,
        };

        if let Some((code, on_phone_number)) = violation {
            return match code.as_str() {
                "23505" if on_phone_number => Self::DuplicatePhone(err),
                "23503" => Self::ForeignKeyViolation(err),
                "23502" => Self::NotNull(err),
                "22001" => Self::ValueTooLong(err),
                "42P01" => Self::MissingTable(err),
                "2BP01" => Self::DependentObjects(err),
                _ => Self::Database(err),
            };
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(err),
            _ => Self::Database(err),
        }
    }
}

impl DirectoryError {
    /// True for violations of the schema's constraints
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePhone(_)
                | Self::ForeignKeyViolation(_)
                | Self::NotNull(_)
                | Self::ValueTooLong(_)
        )
    }
}
