use async_trait::async_trait;
use chrono::Utc;
use latchkey_migration::{Migration, MigrationError, MigrationManager, MigrationRecord};
use sqlx::{Database, PgPool, Postgres};

pub struct PostgresMigrationManager {
    pool: PgPool,
}

impl PostgresMigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationManager<Postgres> for PostgresMigrationManager {
    async fn initialize(&self) -> Result<(), MigrationError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at BIGINT NOT NULL
            );"#,
            self.get_migration_table_name()
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration<Postgres>>]) -> Result<(), MigrationError> {
        for migration in migrations {
            if self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Applying migration"
            );

            migration
                .up(&mut *tx as &mut <Postgres as Database>::Connection)
                .await?;

            sqlx::query(&format!(
                "INSERT INTO {} (version, name, applied_at) VALUES ($1, $2, $3)",
                self.get_migration_table_name()
            ))
            .bind(migration.version())
            .bind(migration.name())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn down(
        &self,
        migrations: &[Box<dyn Migration<Postgres>>],
    ) -> Result<(), MigrationError> {
        for migration in migrations {
            if !self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Rolling back migration"
            );

            migration
                .down(&mut *tx as &mut <Postgres as Database>::Connection)
                .await?;

            sqlx::query(&format!(
                "DELETE FROM {} WHERE version = $1",
                self.get_migration_table_name()
            ))
            .bind(migration.version())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let records = sqlx::query_as::<_, MigrationRecord>(&format!(
            "SELECT version, name, applied_at FROM {} ORDER BY version",
            self.get_migration_table_name()
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        let applied: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE version = $1)",
            self.get_migration_table_name()
        ))
        .bind(version)
        .fetch_one(&self.pool)
        .await?;
        Ok(applied)
    }
}

pub fn all() -> Vec<Box<dyn Migration<Postgres>>> {
    vec![
        Box::new(CreateUsersTable),
        Box::new(CreateTokensTable),
        Box::new(CreatePasswordlessTokensTable),
        Box::new(CreateIndexes),
    ]
}

/// Run each statement on `conn` in order.
async fn execute_all(
    conn: &mut <Postgres as Database>::Connection,
    statements: &[&str],
) -> Result<(), MigrationError> {
    for statement in statements {
        sqlx::query(*statement).execute(&mut *conn).await?;
    }
    Ok(())
}

pub struct CreateUsersTable;

#[async_trait]
impl Migration<Postgres> for CreateUsersTable {
    fn version(&self) -> i64 {
        1
    }

    fn name(&self) -> &str {
        "CreateUsersTable"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(
            conn,
            &[r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                password_hash TEXT,
                provider TEXT NOT NULL DEFAULT 'local',
                provider_id TEXT,
                email_verified BOOLEAN NOT NULL DEFAULT FALSE,
                app_metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                user_metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_provider_key UNIQUE (provider, provider_id)
            )"#],
        )
        .await
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(conn, &["DROP TABLE IF EXISTS users"]).await
    }
}

pub struct CreateTokensTable;

#[async_trait]
impl Migration<Postgres> for CreateTokensTable {
    fn version(&self) -> i64 {
        2
    }

    fn name(&self) -> &str {
        "CreateTokensTable"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(
            conn,
            &[r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token TEXT NOT NULL,
                token_type TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                revoked BOOLEAN NOT NULL DEFAULT FALSE,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                CONSTRAINT tokens_token_key UNIQUE (token)
            )"#],
        )
        .await
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(conn, &["DROP TABLE IF EXISTS tokens"]).await
    }
}

pub struct CreatePasswordlessTokensTable;

#[async_trait]
impl Migration<Postgres> for CreatePasswordlessTokensTable {
    fn version(&self) -> i64 {
        3
    }

    fn name(&self) -> &str {
        "CreatePasswordlessTokensTable"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(
            conn,
            &[r#"
            CREATE TABLE IF NOT EXISTS passwordless_tokens (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                token TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT passwordless_tokens_token_key UNIQUE (token)
            )"#],
        )
        .await
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(conn, &["DROP TABLE IF EXISTS passwordless_tokens"]).await
    }
}

pub struct CreateIndexes;

#[async_trait]
impl Migration<Postgres> for CreateIndexes {
    fn version(&self) -> i64 {
        4
    }

    fn name(&self) -> &str {
        "CreateIndexes"
    }

    async fn up<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(
            conn,
            &[
                "CREATE INDEX IF NOT EXISTS idx_tokens_user_id ON tokens(user_id)",
                "CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at)",
                "CREATE INDEX IF NOT EXISTS idx_passwordless_tokens_email ON passwordless_tokens(email)",
                "CREATE INDEX IF NOT EXISTS idx_passwordless_tokens_expires_at ON passwordless_tokens(expires_at)",
            ],
        )
        .await
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Postgres as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(
            conn,
            &[
                "DROP INDEX IF EXISTS idx_tokens_user_id",
                "DROP INDEX IF EXISTS idx_tokens_expires_at",
                "DROP INDEX IF EXISTS idx_passwordless_tokens_email",
                "DROP INDEX IF EXISTS idx_passwordless_tokens_expires_at",
            ],
        )
        .await
    }
}
