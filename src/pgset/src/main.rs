// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Declarative management of PostgreSQL server configuration parameters.
//!
//! Compares the live value of a single parameter against the desired state
//! and issues at most one `ALTER SYSTEM` statement to correct it, printing a
//! JSON document describing whether a change was made. New values take
//! effect at the next server configuration reload, or at the next restart
//! for parameters that can only be changed at server start. Only superusers
//! can change system-level configuration.

use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pgset_postgres_util::ConnectionParams;
use pgset_settings::{ApplyMode, DesiredSetting, SettingReconciler, SettingState};

static ENV_FILTER: &str = "pgset=info";

#[derive(Parser, Debug)]
#[clap(name = "pgset", about = "Manage a PostgreSQL server configuration parameter.")]
struct Args {
    /// The username used to authenticate with.
    #[clap(long, default_value = "postgres")]
    login_user: String,
    /// The password used to authenticate with.
    #[clap(long, env = "PGSET_LOGIN_PASSWORD", hide_env_values = true)]
    login_password: Option<String>,
    /// Host running the database.
    #[clap(long, default_value = "localhost")]
    login_host: String,
    /// Path to a unix domain socket directory for local connections. Used in
    /// place of the host when the host is empty or localhost.
    #[clap(long, default_value = "")]
    login_unix_socket: String,
    /// Database port to connect to.
    #[clap(long, default_value = "5432")]
    port: u16,
    /// The configuration parameter to manage.
    #[clap(
        long,
        alias = "setting",
        alias = "parameter",
        alias = "option",
        alias = "guc"
    )]
    name: String,
    /// The value the parameter should hold when the state is present.
    #[clap(long, default_value = "")]
    value: String,
    /// Whether a non-default override for the parameter should be present or
    /// absent.
    #[clap(long, default_value = "present")]
    state: SettingState,
    /// Report whether a change would be made without making it.
    #[clap(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(ENV_FILTER)))
        .with(stderr_layer)
        .try_init();

    if let Err(err) = run(args).await {
        error!("pgset: fatal: {err:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    let params = ConnectionParams {
        user: args.login_user,
        password: args.login_password,
        host: args.login_host,
        unix_socket: args.login_unix_socket,
        port: args.port,
        // System-level changes apply cluster-wide, so the ever-present
        // maintenance database is as good a target as any.
        dbname: "postgres".into(),
    };
    let client = params
        .config()
        .connect("pgset")
        .await
        .context("unable to connect to database")?;

    let reconciler = SettingReconciler::new(&client).await?;
    let desired = DesiredSetting {
        name: args.name,
        state: args.state,
        value: args.value,
    };
    let mode = if args.check {
        ApplyMode::DryRun
    } else {
        ApplyMode::Apply
    };
    let outcome = reconciler.reconcile(&desired, mode).await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_synonyms_resolve_at_parse_time() {
        for flag in ["--name", "--setting", "--parameter", "--option", "--guc"] {
            let args = Args::try_parse_from(["pgset", flag, "work_mem"]).unwrap();
            assert_eq!(args.name, "work_mem");
        }
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["pgset", "--name", "work_mem"]).unwrap();
        assert_eq!(args.login_user, "postgres");
        assert_eq!(args.login_password, None);
        assert_eq!(args.login_host, "localhost");
        assert_eq!(args.login_unix_socket, "");
        assert_eq!(args.port, 5432);
        assert_eq!(args.value, "");
        assert_eq!(args.state, SettingState::Present);
        assert!(!args.check);
    }

    #[test]
    fn name_is_required() {
        assert!(Args::try_parse_from(["pgset"]).is_err());
    }

    #[test]
    fn state_rejects_unknown_values() {
        let result = Args::try_parse_from(["pgset", "--name", "work_mem", "--state", "gone"]);
        assert!(result.is_err());
    }

    #[test]
    fn check_mode() {
        let args =
            Args::try_parse_from(["pgset", "--name", "work_mem", "--check", "--state", "absent"])
                .unwrap();
        assert!(args.check);
        assert_eq!(args.state, SettingState::Absent);
    }
}
