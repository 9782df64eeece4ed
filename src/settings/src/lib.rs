// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Idempotent reconciliation of PostgreSQL server configuration parameters.
//!
//! A [`SettingReconciler`] compares the live state of a single parameter
//! against a caller-supplied [`DesiredSetting`] and issues at most one
//! corrective `ALTER SYSTEM` statement, reporting whether a change was made.
//! Values written this way land in `postgresql.auto.conf` and take effect at
//! the server's next configuration reload (or restart, for parameters that
//! can only be changed at server start); triggering that reload is the
//! caller's responsibility.

pub mod catalog;
mod quoting;
mod reconcile;

pub use crate::catalog::ParameterDescriptor;
pub use crate::quoting::{quote_ident, quote_literal};
pub use crate::reconcile::{
    ApplyMode, DesiredSetting, Outcome, SettingReconciler, SettingState,
};

/// An error produced while reconciling a server parameter.
///
/// A parameter that is unknown or not user-settable is not an error; it is
/// reported through [`Outcome::warning`].
#[derive(Debug, thiserror::Error)]
pub enum SettingError {
    /// The server predates `ALTER SYSTEM`.
    #[error("server version {version} does not support ALTER SYSTEM (9.4 or later required)")]
    Unsupported {
        /// The server's `server_version_num`.
        version: i32,
    },
    /// A catalog read or configuration write failed.
    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}
