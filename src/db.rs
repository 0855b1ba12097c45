//! Shared database helpers.

/// True when `err` is a Postgres unique-constraint violation on the named
/// constraint. Used to turn concurrent insert races into typed collisions.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
