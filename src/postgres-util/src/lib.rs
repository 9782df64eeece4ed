// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! PostgreSQL connection utilities.

use tokio_postgres::Client;
use tracing::warn;

use pgset_tls_util::{make_tls, TlsError};

/// An error representing a failure to establish or drive a PostgreSQL
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
    /// Error setting up the TLS connector.
    #[error(transparent)]
    Tls(#[from] TlsError),
    /// Error from the underlying PostgreSQL driver.
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
}

/// Login parameters for an administrative connection, as supplied by the
/// caller.
///
/// Assembly into a driver configuration applies the unix-socket rule: a host
/// that is empty or `localhost` combined with a non-empty socket path selects
/// the socket directory as the effective host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub unix_socket: String,
    pub port: u16,
    pub dbname: String,
}

impl Default for ConnectionParams {
    fn default() -> ConnectionParams {
        ConnectionParams {
            user: "postgres".into(),
            password: None,
            host: "localhost".into(),
            unix_socket: String::new(),
            port: 5432,
            dbname: "postgres".into(),
        }
    }
}

impl ConnectionParams {
    fn effective_host(&self) -> &str {
        let is_local = self.host.is_empty() || self.host == "localhost";
        if is_local && !self.unix_socket.is_empty() {
            &self.unix_socket
        } else if self.host.is_empty() {
            "localhost"
        } else {
            &self.host
        }
    }

    /// Assembles these parameters into a connection [`Config`].
    pub fn config(&self) -> Config {
        let mut inner = tokio_postgres::Config::new();
        // tokio-postgres treats a host beginning with `/` as a unix socket
        // directory, so the effective host slots in unchanged.
        inner
            .host(self.effective_host())
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname);
        if let Some(password) = &self.password {
            inner.password(password);
        }
        Config { inner }
    }
}

/// Configuration for PostgreSQL connections.
///
/// This wraps [`tokio_postgres::Config`] to handle TLS setup and driving the
/// connection in the background.
#[derive(Debug, Clone)]
pub struct Config {
    inner: tokio_postgres::Config,
}

impl Config {
    pub fn new(inner: tokio_postgres::Config) -> Config {
        Config { inner }
    }

    /// Connects to the configured PostgreSQL database.
    ///
    /// The connection runs in autocommit: each statement issued on the
    /// returned [`Client`] commits on its own unless an explicit transaction
    /// is opened.
    pub async fn connect(&self, task_name: &str) -> Result<Client, PostgresError> {
        let tls = make_tls(&self.inner)?;
        let (client, connection) = self.inner.connect(tls).await?;
        let task_name = task_name.to_owned();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("{task_name}: postgres connection failed: {e}");
            }
        });
        Ok(client)
    }
}
