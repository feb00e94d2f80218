// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Context;
use clap::Parser;
use invest_ledger_rs::server::{AppState, router};
use invest_ledger_rs::settings::Settings;
use invest_ledger_rs::{LedgerStore, SystemClock};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Ledger API server for the investment platform.
///
/// Configuration comes from an optional `config.toml`; the listen address
/// can be overridden on the command line.
#[derive(Parser, Debug)]
#[command(name = "invest-ledger-rs")]
#[command(about = "Transactional ledger engine with an HTTP API", long_about = None)]
struct Args {
    /// Listen address override, e.g. 127.0.0.1:8080
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::new().context("could not load configuration")?;
    let addr = args
        .listen
        .unwrap_or_else(|| format!("{}:{}", settings.server.host, settings.server.port));

    let store = Arc::new(LedgerStore::with_commit_attempts(
        settings.store.commit_attempts,
    ));
    let state = AppState::new(store, Arc::new(SystemClock));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, "ledger API server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
