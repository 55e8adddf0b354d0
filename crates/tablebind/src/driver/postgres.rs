//! PostgreSQL schema driver.
//!
//! Introspects the catalog of a single schema (the configured subschema, or
//! `public`) over a deadpool-managed connection pool. All four concerns are
//! natively supported.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use std::sync::Arc;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::ConnectConfig;
use crate::error::{BindError, Result};
use crate::schema::{ColumnDescriptor, ForeignKeyDescriptor, PrimaryKey, SemanticType};

use super::{Connector, DriverCapabilities, SchemaDriver};

/// PostgreSQL driver over a deadpool pool.
pub struct PostgresDriver {
    pool: Pool,
    schema: String,
}

impl PostgresDriver {
    /// Create a new pool from the resolved configuration and verify it with
    /// a round trip.
    ///
    /// The `ssl_mode` parameter accepts `disable`, `require` (default),
    /// `verify-ca`, and `verify-full`.
    pub async fn new(config: &ConnectConfig, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.effective_port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let ssl_mode = config
            .params
            .get("ssl_mode")
            .map(String::as_str)
            .unwrap_or("require");

        let pool = match ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| BindError::pool(e, "creating PostgreSQL pool"))?
            }
            _ => {
                let tls_config = Self::build_tls_config(ssl_mode)?;
                let tls_connector = MakeRustlsConnect::new(tls_config);
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| BindError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| BindError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        let schema = config
            .subschema
            .clone()
            .unwrap_or_else(|| "public".to_string());

        info!(
            "Connected to PostgreSQL: {}:{}/{} (schema '{}')",
            config.host,
            config.effective_port(),
            config.database,
            schema
        );

        Ok(Self { pool, schema })
    }

    /// Build TLS configuration based on ssl_mode.
    fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = match ssl_mode {
            "require" => {
                warn!(
                    "ssl_mode=require: TLS enabled but server certificate is not verified. \
                     Consider using 'verify-full' for production."
                );
                ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier))
                    .with_no_client_auth()
            }
            "verify-ca" | "verify-full" => {
                info!("ssl_mode={}: certificate verification enabled", ssl_mode);
                ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth()
            }
            other => {
                return Err(BindError::Config(format!(
                    "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                    other
                )));
            }
        };

        Ok(config)
    }

    async fn client(&self, context: &'static str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| BindError::pool(e, context))
    }
}

#[async_trait]
impl SchemaDriver for PostgresDriver {
    fn adapter(&self) -> &str {
        "postgres"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::full()
    }

    async fn tables(&self) -> Result<Vec<String>> {
        let client = self.client("getting connection for tables").await?;

        let query = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
              AND table_schema = $1
            ORDER BY table_name
        "#;

        let rows = client.query(query, &[&self.schema]).await?;
        let tables: Vec<String> = rows.iter().map(|row| row.get(0)).collect();

        info!(
            "Enumerated {} tables in schema '{}'",
            tables.len(),
            self.schema
        );
        Ok(tables)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let table = table.to_string();
        let client = self.client("getting connection for columns").await?;

        let query = r#"
            SELECT
                column_name,
                udt_name,
                CASE WHEN is_nullable = 'YES' THEN true ELSE false END,
                column_default
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = client.query(query, &[&self.schema, &table]).await?;

        let columns: Vec<ColumnDescriptor> = rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let data_type: String = row.get(1);
                let semantic = SemanticType::from_sql_type(&data_type);
                ColumnDescriptor {
                    name,
                    semantic,
                    data_type,
                    is_nullable: row.get(2),
                    default: row.get(3),
                }
            })
            .collect();

        debug!("Loaded {} columns for {}", columns.len(), table);
        Ok(columns)
    }

    async fn primary_key(&self, table: &str) -> Result<Option<PrimaryKey>> {
        let table = table.to_string();
        let client = self.client("getting connection for primary_key").await?;

        let query = r#"
            SELECT a.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'p'
              AND a.attnum = ANY(c.conkey)
            ORDER BY array_position(c.conkey, a.attnum)
        "#;

        let rows = client.query(query, &[&self.schema, &table]).await?;
        let columns: Vec<String> = rows.iter().map(|row| row.get(0)).collect();

        debug!("Primary key for {}: {:?}", table, columns);
        Ok(PrimaryKey::from_columns(columns))
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let table = table.to_string();
        let client = self.client("getting connection for foreign_keys").await?;

        let query = r#"
            SELECT
                c.conname AS fk_name,
                array_agg(a.attname ORDER BY array_position(c.conkey, a.attnum)) AS columns,
                rt.relname AS ref_table,
                array_agg(ra.attname ORDER BY array_position(c.confkey, ra.attnum)) AS ref_columns
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(c.conkey)
            JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = ANY(c.confkey)
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'f'
            GROUP BY c.conname, rt.relname
            ORDER BY c.conname
        "#;

        let rows = client.query(query, &[&self.schema, &table]).await?;

        let mut foreign_keys = Vec::new();
        for row in rows {
            let name: String = row.get(0);
            let columns: Vec<String> = row.get(1);
            let ref_table: String = row.get(2);
            let ref_columns: Vec<String> = row.get(3);

            // Many-to-one wiring is single-column; composite FKs are not
            // representable downstream.
            if columns.len() != 1 || ref_columns.len() != 1 {
                debug!(
                    "Skipping composite foreign key {} on {} ({} columns)",
                    name,
                    table,
                    columns.len()
                );
                continue;
            }

            foreign_keys.push(ForeignKeyDescriptor {
                name,
                from_table: table.to_string(),
                to_table: ref_table,
                from_column: columns.into_iter().next().unwrap(),
                to_column: ref_columns.into_iter().next().unwrap(),
                synthesized: false,
            });
        }

        debug!("Loaded {} foreign keys for {}", foreign_keys.len(), table);
        Ok(foreign_keys)
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Connector for the built-in PostgreSQL driver.
#[derive(Debug, Clone, Default)]
pub struct PostgresConnector;

/// Pool size for introspection traffic; calls are sequential, so a couple of
/// connections suffice.
const INTROSPECTION_POOL_SIZE: usize = 2;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, config: &ConnectConfig) -> Result<Arc<dyn SchemaDriver>> {
        let driver = PostgresDriver::new(config, INTROSPECTION_POOL_SIZE).await?;
        Ok(Arc::new(driver))
    }
}

#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tls_config_modes() {
        assert!(PostgresDriver::build_tls_config("require").is_ok());
        assert!(PostgresDriver::build_tls_config("verify-ca").is_ok());
        assert!(PostgresDriver::build_tls_config("verify-full").is_ok());
        assert!(PostgresDriver::build_tls_config("bogus").is_err());
    }
}
