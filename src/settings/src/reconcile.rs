// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Desired-state reconciliation for a single server parameter.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tokio_postgres::Client;
use tracing::{debug, warn};

use crate::catalog;
use crate::quoting::{quote_ident, quote_literal};
use crate::SettingError;

/// `ALTER SYSTEM` arrived in 9.4.
const MIN_ALTER_SYSTEM_VERSION: i32 = 90400;

/// The desired presence of a non-default override for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingState {
    /// The parameter should hold the desired value.
    Present,
    /// Any override should be removed, returning the parameter to its
    /// boot-time default.
    Absent,
}

impl FromStr for SettingState {
    type Err = String;

    fn from_str(s: &str) -> Result<SettingState, String> {
        match s {
            "present" => Ok(SettingState::Present),
            "absent" => Ok(SettingState::Absent),
            _ => Err(format!("invalid state {s:?} (expected present or absent)")),
        }
    }
}

impl fmt::Display for SettingState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SettingState::Present => f.write_str("present"),
            SettingState::Absent => f.write_str("absent"),
        }
    }
}

/// The caller-supplied desired state for one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSetting {
    pub name: String,
    pub state: SettingState,
    /// Meaningful only when `state` is [`SettingState::Present`].
    pub value: String,
}

/// Whether corrective writes may be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Issue the corrective write when the live state diverges.
    Apply,
    /// Perform the same reads and report the would-be result, issuing no
    /// write.
    DryRun,
}

/// The result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether a corrective write was issued (or, in dry-run mode, would
    /// have been).
    pub changed: bool,
    /// The parameter the outcome describes.
    pub name: String,
    /// Set when the parameter was unknown or not settable, in which case the
    /// reconciliation succeeded without touching anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Reconciles a single server parameter against a desired state.
///
/// Construction probes the server once for `ALTER SYSTEM` support; every
/// reconciliation thereafter reads the catalog fresh and issues at most one
/// write.
#[derive(Debug)]
pub struct SettingReconciler<'a> {
    client: &'a Client,
    server_version: i32,
}

impl<'a> SettingReconciler<'a> {
    /// Creates a reconciler over `client`, verifying that the server is
    /// recent enough to support system-level configuration writes.
    pub async fn new(client: &'a Client) -> Result<SettingReconciler<'a>, SettingError> {
        let row = client
            .query_one("SELECT current_setting('server_version_num')::int", &[])
            .await?;
        let server_version: i32 = row.get(0);
        if server_version < MIN_ALTER_SYSTEM_VERSION {
            return Err(SettingError::Unsupported {
                version: server_version,
            });
        }
        Ok(SettingReconciler {
            client,
            server_version,
        })
    }

    /// The server's `server_version_num`, as observed at construction.
    pub fn server_version(&self) -> i32 {
        self.server_version
    }

    /// Drives the parameter named by `desired` toward the desired state.
    ///
    /// A parameter that is unknown or not settable yields a successful
    /// outcome with `changed = false` and a warning; there is nothing the
    /// caller could do differently, so it is not treated as a failure. Any
    /// change applied here takes effect at the server's next configuration
    /// reload.
    pub async fn reconcile(
        &self,
        desired: &DesiredSetting,
        mode: ApplyMode,
    ) -> Result<Outcome, SettingError> {
        let name = &desired.name;
        if !catalog::is_configurable(self.client, name).await? {
            let warning = format!("parameter {name} does not exist or is preset");
            warn!("{warning}");
            return Ok(Outcome {
                changed: false,
                name: name.clone(),
                warning: Some(warning),
            });
        }

        if let Some(desc) = catalog::lookup(self.client, name).await? {
            debug!(
                "parameter {}: boot value {:?}, reset value {:?}",
                desc.name, desc.boot_value, desc.reset_value
            );
        }

        let changed = match (mode, desired.state) {
            (ApplyMode::DryRun, SettingState::Absent) => {
                !catalog::is_at_default(self.client, name).await?
            }
            (ApplyMode::DryRun, SettingState::Present) => {
                !catalog::matches_desired(self.client, name, &desired.value).await?
            }
            (ApplyMode::Apply, SettingState::Absent) => self.apply_reset(name).await?,
            (ApplyMode::Apply, SettingState::Present) => {
                self.apply_set(name, &desired.value).await?
            }
        };

        Ok(Outcome {
            changed,
            name: name.clone(),
            warning: None,
        })
    }

    /// Removes any persisted override for `name`, reporting whether a write
    /// was issued. A parameter already at its default is left untouched.
    async fn apply_reset(&self, name: &str) -> Result<bool, SettingError> {
        if catalog::is_at_default(self.client, name).await? {
            return Ok(false);
        }
        let stmt = format!("ALTER SYSTEM RESET {}", quote_ident(name));
        debug!("executing {stmt}");
        self.client.batch_execute(&stmt).await?;
        Ok(true)
    }

    /// Persists `value` as the override for `name`, reporting whether a
    /// write was issued. A parameter already matching the value is left
    /// untouched.
    async fn apply_set(&self, name: &str, value: &str) -> Result<bool, SettingError> {
        if catalog::matches_desired(self.client, name, value).await? {
            return Ok(false);
        }
        let stmt = format!(
            "ALTER SYSTEM SET {} TO {}",
            quote_ident(name),
            quote_literal(value)
        );
        debug!("executing {stmt}");
        self.client.batch_execute(&stmt).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parsing() {
        assert_eq!("present".parse::<SettingState>(), Ok(SettingState::Present));
        assert_eq!("absent".parse::<SettingState>(), Ok(SettingState::Absent));
        assert!("Present".parse::<SettingState>().is_err());
        assert!("".parse::<SettingState>().is_err());
    }

    #[test]
    fn state_display_round_trips() {
        for state in [SettingState::Present, SettingState::Absent] {
            assert_eq!(state.to_string().parse::<SettingState>(), Ok(state));
        }
    }

    #[test]
    fn outcome_serialization() {
        let outcome = Outcome {
            changed: true,
            name: "work_mem".into(),
            warning: None,
        };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"changed":true,"name":"work_mem"}"#
        );

        let outcome = Outcome {
            changed: false,
            name: "wal_buffers".into(),
            warning: Some("parameter wal_buffers does not exist or is preset".into()),
        };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"changed":false,"name":"wal_buffers","warning":"parameter wal_buffers does not exist or is preset"}"#
        );
    }
}
