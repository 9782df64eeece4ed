// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reads against the `pg_settings` catalog view.
//!
//! Every read here binds its arguments as query parameters. The view is
//! consulted fresh on each call; nothing is cached between reconciliations.

use tokio_postgres::Client;

use crate::SettingError;

/// A parameter's catalog row, as observed at reconciliation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Whether the parameter can be altered at all. Parameters in the
    /// `internal` context are fixed when the server is compiled or initdb'd.
    pub configurable: bool,
    /// The value the parameter assumes with no overrides applied.
    pub boot_value: String,
    /// The value the parameter would have after `RESET`, i.e. with persisted
    /// overrides applied.
    pub reset_value: String,
}

impl ParameterDescriptor {
    /// Whether no override away from the boot-time value is in effect.
    pub fn is_at_default(&self) -> bool {
        self.boot_value == self.reset_value
    }
}

/// Fetches the catalog row for `name`, if there is one.
pub async fn lookup(
    client: &Client,
    name: &str,
) -> Result<Option<ParameterDescriptor>, SettingError> {
    let row = client
        .query_opt(
            "SELECT name, context, boot_val, reset_val FROM pg_settings WHERE name = $1",
            &[&name],
        )
        .await?;
    Ok(row.map(|row| ParameterDescriptor {
        name: row.get("name"),
        configurable: row.get::<_, String>("context") != "internal",
        boot_value: row.get("boot_val"),
        reset_value: row.get("reset_val"),
    }))
}

/// Whether `name` names a parameter that can be altered at runtime or via a
/// system-level override. Parameters in the `internal` context are visible
/// but immutable; unknown names report `false`.
pub async fn is_configurable(client: &Client, name: &str) -> Result<bool, SettingError> {
    let row = client
        .query_one(
            "SELECT EXISTS
                (SELECT 1
                 FROM pg_settings
                 WHERE context <> 'internal'
                 AND name = $1)",
            &[&name],
        )
        .await?;
    Ok(row.get(0))
}

/// Whether `name` has not been overridden away from its boot-time value.
///
/// An unknown name reports `false`, not an error; callers guard on
/// [`is_configurable`] before acting on the answer.
pub async fn is_at_default(client: &Client, name: &str) -> Result<bool, SettingError> {
    let row = client
        .query_one(
            "SELECT EXISTS
                (SELECT 1
                 FROM pg_settings
                 WHERE boot_val = reset_val
                 AND name = $1)",
            &[&name],
        )
        .await?;
    Ok(row.get(0))
}

/// Whether the current value of `name` equals `value` under the server's own
/// comparison, i.e. after its normalization of the current value's text form.
pub async fn matches_desired(
    client: &Client,
    name: &str,
    value: &str,
) -> Result<bool, SettingError> {
    let row = client
        .query_one("SELECT current_setting($1) = $2", &[&name, &value])
        .await?;
    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_default_detection() {
        let mut desc = ParameterDescriptor {
            name: "work_mem".into(),
            configurable: true,
            boot_value: "4096".into(),
            reset_value: "4096".into(),
        };
        assert!(desc.is_at_default());
        desc.reset_value = "8192".into();
        assert!(!desc.is_at_default());
    }
}
