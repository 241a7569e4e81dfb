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

use crate::Server;
use relay_config::Config;
use relay_engine::Router;

/// Start the relay's runtime and serve the clients on `sockets`.
///
/// With a `timeout`, the server is stopped once it elapsed.
///
/// # Errors
///
/// * the runtime cannot be built
/// * see [`Server::listen_and_serve`]
pub fn start_runtime(
    config: Config,
    router: Router,
    sockets: Vec<std::net::TcpListener>,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("relay-receiver")
        .build()?;

    let server = Server::new(std::sync::Arc::new(config), std::sync::Arc::new(router));

    runtime.block_on(async move {
        tracing::info!("Runtime started successfully.");

        match timeout {
            Some(duration) => {
                if let Ok(result) =
                    tokio::time::timeout(duration, server.listen_and_serve(sockets)).await
                {
                    return result;
                }
                tracing::info!(?duration, "Timeout reached, stopping the server.");
                Ok(())
            }
            None => server.listen_and_serve(sockets).await,
        }
    })
}
