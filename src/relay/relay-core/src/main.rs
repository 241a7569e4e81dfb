/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use clap::{crate_name, crate_version};
use relay_config::Config;
use relay_server::{socket_bind_anyhow, start_runtime};
use smtp_relay::{Args, Commands};

fn main() {
    if let Err(err) = try_main() {
        let error = format!("smtp-relay terminating error: '{err}'");

        eprintln!("{error}");
        tracing::error!(error);
        err.chain().skip(1).for_each(|cause| {
            let reason = format!("because: {cause}");

            eprintln!("{reason}");
            tracing::error!(reason);
        });
        std::process::exit(1);
    }
}

fn bind_sockets(addr: &[std::net::SocketAddr]) -> anyhow::Result<Vec<std::net::TcpListener>> {
    addr.iter()
        .copied()
        .map(socket_bind_anyhow)
        .collect::<anyhow::Result<Vec<std::net::TcpListener>>>()
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    if args.version {
        println!("{} v{}", crate_name!(), crate_version!());
        return Ok(());
    }

    let config = args
        .config
        .as_ref()
        .map_or_else(|| Ok(Config::default()), Config::from_path)?;

    if let Some(Commands::ConfigShow) = args.command {
        let stringified = serde_json::to_string_pretty(&config)?;
        println!("Loaded configuration: {stringified}");
        return Ok(());
    }

    smtp_relay::tracing_subscriber::initialize(&args, &config)?;

    tracing::info!(
        server = ?config.server.logs.filepath,
        level = ?config.server.logs.level,
        "smtp-relay logs initialized.",
    );

    let router = smtp_relay::build_router(&config)?;
    let sockets = bind_sockets(&config.server.interfaces.addr)?;

    start_runtime(config, router, sockets, args.timeout.map(|t| t.0))
}
