// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A tiny utility library for making TLS connectors.

use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509;
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::config::SslMode;
use tracing::debug;

macro_rules! bail_generic {
    ($fmt:expr, $($arg:tt)*) => {
        return Err(TlsError::Generic(anyhow::anyhow!($fmt, $($arg)*)))
    };
    ($err:expr $(,)?) => {
        return Err(TlsError::Generic(anyhow::anyhow!($err)))
    };
}

/// An error representing tls failures.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
    /// Error setting up postgres ssl.
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// Creates a TLS connector for the given [`Config`](tokio_postgres::Config).
///
/// The connector follows libpq's interpretation of `sslmode`: `disable` and
/// `prefer` perform no verification, `require` verifies the peer only when a
/// root certificate is on hand, and `verify-ca`/`verify-full` verify the peer
/// unconditionally, with only the latter also checking the hostname. See
/// Table 33.1 in <https://postgresql.org/docs/current/libpq-ssl.html>.
pub fn make_tls(config: &tokio_postgres::Config) -> Result<MakeTlsConnector, TlsError> {
    let (verify_peer, verify_hostname) = verification_for_mode(config);
    debug!(
        ?verify_peer,
        verify_hostname, "configuring postgres tls connector"
    );

    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    builder.set_verify(verify_peer);

    match (config.get_ssl_cert(), config.get_ssl_key()) {
        (Some(cert), Some(key)) => {
            builder.set_certificate(&*X509::from_pem(cert)?)?;
            builder.set_private_key(&*PKey::private_key_from_pem(key)?)?;
        }
        (None, Some(_)) => {
            bail_generic!("must provide both sslcert and sslkey, but only provided sslkey")
        }
        (Some(_), None) => {
            bail_generic!("must provide both sslcert and sslkey, but only provided sslcert")
        }
        (None, None) => {}
    }
    if let Some(root_cert) = config.get_ssl_root_cert() {
        builder
            .cert_store_mut()
            .add_cert(X509::from_pem(root_cert)?)?;
    }

    let mut connector = MakeTlsConnector::new(builder.build());
    if verify_peer == SslVerifyMode::PEER && !verify_hostname {
        connector.set_callback(|connect, _| {
            connect.set_verify_hostname(false);
            Ok(())
        });
    }
    Ok(connector)
}

fn verification_for_mode(config: &tokio_postgres::Config) -> (SslVerifyMode, bool) {
    match config.get_ssl_mode() {
        SslMode::Disable | SslMode::Prefer => (SslVerifyMode::NONE, false),
        // A root CA upgrades `require` to `verify-ca` semantics, per the
        // backwards-compatibility note in the libpq documentation.
        SslMode::Require => match config.get_ssl_root_cert() {
            Some(_) => (SslVerifyMode::PEER, false),
            None => (SslVerifyMode::NONE, false),
        },
        SslMode::VerifyCa => (SslVerifyMode::PEER, false),
        SslMode::VerifyFull => (SslVerifyMode::PEER, true),
        mode => panic!("unexpected sslmode {:?}", mode),
    }
}
