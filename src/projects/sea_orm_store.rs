use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DbBackend, FromQueryResult, JsonValue, Statement,
};
use serde_json::Value;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::projects::ProjectStore;

/// SeaORM-backed project store.
///
/// The schema belongs to another system, so rows are fetched with a raw
/// parameterized statement and decoded straight to JSON instead of going
/// through an entity model.
#[derive(Clone)]
pub struct SeaOrmProjectStore {
    db: DatabaseConnection,
}

impl SeaOrmProjectStore {
    /// Create from an existing connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect using the given configuration, with bounded pool timeouts.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let mut opt = ConnectOptions::new(&config.url);
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .sqlx_logging(true);

        let db = Database::connect(opt).await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Relational store connected"
        );

        Ok(Self::new(db))
    }

    /// Get the inner connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl ProjectStore for SeaOrmProjectStore {
    async fn list_for_organization(&self, organization_id: &str) -> Result<Vec<Value>> {
        let rows = JsonValue::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT * FROM projects WHERE organization_id = $1",
            [organization_id.into()],
        ))
        .all(&self.db)
        .await?;

        Ok(rows)
    }
}
