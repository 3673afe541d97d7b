//! Thin, explicit wrapper over `tokio-postgres`: a connection plus the
//! `JoinHandle` of its background driver, matching the pattern the
//! `tokio-postgres` examples (and this workspace's sibling adapters) use —
//! `Client::connect` returns a `Connection` future that must be polled
//! concurrently for the client half to make progress.

use crate::error::ConnectorError;
use native_tls::TlsConnector as NativeTlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::Client;
use tracing::error;

/// A live connection to one Postgres endpoint (source or target).
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Plain, unencrypted connection — the common case against a local or
    /// already-tunnelled Postgres.
    pub async fn connect(conninfo: &str) -> Result<Self, ConnectorError> {
        let (client, connection) = tokio_postgres::connect(conninfo, tokio_postgres::NoTls).await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection driver exited with error: {e}");
            }
        });
        Ok(Self { client, driver })
    }

    /// TLS connection, for endpoints that require `sslmode=require` or
    /// stronger.
    pub async fn connect_tls(conninfo: &str) -> Result<Self, ConnectorError> {
        let connector = NativeTlsConnector::new().map_err(|e| ConnectorError::Tls(e.to_string()))?;
        let connector = MakeTlsConnector::new(connector);
        let (client, connection) = tokio_postgres::connect(conninfo, connector).await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection driver exited with error: {e}");
            }
        });
        Ok(Self { client, driver })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sets the transaction snapshot so this connection observes the same
    /// point-in-time view another connection exported (§4.3 Stage A,
    /// `consistent` mode).
    pub async fn set_snapshot(&self, snapshot_id: &str) -> Result<(), tokio_postgres::Error> {
        self.client
            .batch_execute(&format!(
                "BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY; SET TRANSACTION SNAPSHOT '{snapshot_id}';"
            ))
            .await
    }

    pub async fn close(self) {
        drop(self.client);
        let _ = self.driver.await;
    }
}

/// Connects and hands back an `Arc`-wrapped client for callers (e.g. the
/// comparator's data-comparison pool) that need to share one connection
/// across several concurrent tasks. The driver task is detached: the
/// caller's process lifetime bounds it, matching short-lived CLI
/// invocations rather than long-running worker pools.
pub async fn connect_shared(conninfo: &str) -> Result<std::sync::Arc<Client>, ConnectorError> {
    let (client, connection) = tokio_postgres::connect(conninfo, tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("postgres connection driver exited with error: {e}");
        }
    });
    Ok(std::sync::Arc::new(client))
}

/// Exports a snapshot id from a freshly opened transaction for other
/// connections to reuse (§4.3 Stage A, §5 "the source snapshot... is opened
/// once on the parent and re-used by workers").
pub async fn export_snapshot(client: &Client) -> Result<String, tokio_postgres::Error> {
    client
        .batch_execute("BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY;")
        .await?;
    let row = client.query_one("SELECT pg_export_snapshot()", &[]).await?;
    Ok(row.get::<_, String>(0))
}
