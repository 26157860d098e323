//! Embedded schema migrations

use sqlx::migrate::Migrator;

use crate::{DbPool, DbResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations. Runs before the server accepts requests so
/// repositories can assume the `utilisateurs` table exists.
pub async fn run_migrations(pool: &DbPool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_table_is_embedded() {
        let first = MIGRATOR.iter().next().expect("at least one migration");
        assert_eq!(first.version, 1);
        assert!(first
            .sql
            .contains("CREATE TABLE IF NOT EXISTS utilisateurs"));
    }
}
