//! PostgreSQL connection
//!
//! Pooled `tokio-postgres` handle implementing [`Database`].

use crate::connection::{ConnectionParams, Dialect};
use crate::db::Database;
use crate::error::DbError;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// citext counts as supported when the server can install it; the base
/// template runs `CREATE EXTENSION IF NOT EXISTS citext` itself
const CITEXT_AVAILABLE: &str = "SELECT 1 FROM pg_available_extensions WHERE name = 'citext'";

/// Postgres database reached through a deadpool connection pool
pub struct PgDatabase {
    pool: Pool,
}

impl PgDatabase {
    /// Connect and verify the connection with a trivial query
    pub async fn connect(params: &ConnectionParams) -> Result<Self, DbError> {
        if params.dialect != Dialect::Postgres {
            return Err(DbError::NotConnected(format!(
                "{} connections are not supported, only postgres",
                params.dialect
            )));
        }

        let pool = Self::create_pool(params)?;

        let client = pool.get().await?;
        client.query_one("SELECT 1 as ok", &[]).await?;
        drop(client);

        info!(
            "✅ Database connection successful: {} (TLS: {})",
            params.to_display_string(),
            params.require_tls
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a connection pool with TLS support if needed
    fn create_pool(params: &ConnectionParams) -> Result<Pool, DbError> {
        let mut cfg = Config::new();
        cfg.host = Some(params.host.clone());
        cfg.port = Some(params.port);
        cfg.user = Some(params.user.clone());
        cfg.password = Some(params.password.clone());
        cfg.dbname = Some(params.database.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        if params.require_tls {
            let certs = rustls_native_certs::load_native_certs();
            let mut root_store = rustls::RootCertStore::empty();
            for cert in certs.certs {
                root_store.add(cert).ok();
            }

            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

            cfg.create_pool(Some(Runtime::Tokio1), tls)
                .map_err(|e| DbError::NotConnected(format!("Failed to create TLS pool: {}", e)))
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| DbError::NotConnected(format!("Failed to create pool: {}", e)))
        }
    }
}

impl Database for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn supports_partial_indexes(&self) -> bool {
        true
    }

    async fn supports_citext(&self) -> bool {
        let client = match self.pool.get().await {
            Ok(client) => client,
            Err(e) => {
                debug!("Could not check for citext: {}", e);
                return false;
            }
        };

        match client.query_opt(CITEXT_AVAILABLE, &[]).await {
            Ok(row) => row.is_some(),
            Err(e) => {
                debug!("Could not check for citext: {}", e);
                false
            }
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let client = self.pool.get().await?;

        let query = r#"
            SELECT t.table_name
            FROM information_schema.tables t
            WHERE t.table_schema = current_schema()
              AND t.table_type = 'BASE TABLE'
            ORDER BY t.table_name
        "#;

        let rows = client.query(query, &[]).await?;
        Ok(rows.iter().map(|row| row.get("table_name")).collect())
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        debug!("Executing DDL: {}", sql);
        client.batch_execute(sql).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DialectCapabilities;

    #[test]
    fn test_citext_detection_accepts_installable_extension() {
        assert!(CITEXT_AVAILABLE.contains("FROM pg_available_extensions"));
        assert!(!CITEXT_AVAILABLE.contains("FROM pg_extension "));
        assert!(DialectCapabilities::assumed(Dialect::Postgres).citext);
    }
}
