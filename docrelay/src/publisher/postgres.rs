use pg_escape::quote_identifier;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use docrelay_config::shared::PgConnectionConfig;

use crate::error::RelayResult;
use crate::publisher::QueueClient;

const MAX_CONNECTIONS: u32 = 5;

/// [`QueueClient`] storing messages as rows of a Postgres table.
///
/// Each message is inserted in its own statement, a row is only visible once the insert
/// committed.
#[derive(Debug, Clone)]
pub struct PgQueueClient {
    pool: PgPool,
    table_name: String,
}

impl PgQueueClient {
    /// Connects to the database with a small connection pool.
    pub async fn connect(config: &PgConnectionConfig, table_name: &str) -> RelayResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(config.connect_options())
            .await?;

        Ok(Self::new(pool, table_name))
    }

    pub fn new(pool: PgPool, table_name: &str) -> Self {
        Self {
            pool,
            table_name: quote_identifier(table_name).into_owned(),
        }
    }

    /// Creates the queue table if it does not exist yet.
    pub async fn ensure_table(&self) -> RelayResult<()> {
        let query = format!(
            "
            create table if not exists {} (
                id bigserial primary key,
                message text not null,
                created_at timestamptz not null default now()
            )
            ",
            self.table_name
        );
        sqlx::query(&query).execute(&self.pool).await?;
        info!(table = %self.table_name, "fallback queue table ready");

        Ok(())
    }
}

impl QueueClient for PgQueueClient {
    async fn send_message(&self, message: String) -> RelayResult<()> {
        let query = format!("insert into {} (message) values ($1)", self.table_name);
        sqlx::query(&query)
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
