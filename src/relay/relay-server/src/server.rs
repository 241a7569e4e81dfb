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

use crate::Handler;
use anyhow::Context;
use relay_common::CodeID;
use relay_config::Config;
use relay_engine::Router;
use relay_protocol::Receiver;
use tokio_stream::StreamExt;
use trust_dns_resolver::TokioAsyncResolver;

/// TCP/IP server
pub struct Server {
    config: std::sync::Arc<Config>,
    router: std::sync::Arc<Router>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::try_stream! {
        loop {
            let client = listener.accept().await?;
            yield client;
        }
    }
}

impl Server {
    ///
    #[must_use]
    pub fn new(config: std::sync::Arc<Config>, router: std::sync::Arc<Router>) -> Self {
        Self { config, router }
    }

    #[tracing::instrument(name = "handle-client", skip_all, fields(client = %client_addr, server = %server_addr))]
    async fn handle_client(
        &self,
        resolver: Option<std::sync::Arc<TokioAsyncResolver>>,
        client_counter: std::sync::Arc<std::sync::atomic::AtomicI64>,
        mut stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        tracing::info!("Connection accepted.");

        if self.config.server.client_count_max != -1
            && client_counter.load(std::sync::atomic::Ordering::SeqCst)
                >= self.config.server.client_count_max
        {
            tracing::warn!(
                max = self.config.server.client_count_max,
                "Connection count max reached, rejecting connection.",
            );

            let reply = self
                .config
                .server
                .smtp
                .codes
                .get(&CodeID::ConnectionMaxReached)
                .map_or_else(
                    || "554 Cannot process connection, closing\r\n".to_string(),
                    ToString::to_string,
                );
            if let Err(error) =
                tokio::io::AsyncWriteExt::write_all(&mut stream, reply.as_bytes()).await
            {
                tracing::error!(%error, "Code delivery failure.");
            }

            if let Err(error) = tokio::io::AsyncWriteExt::shutdown(&mut stream).await {
                tracing::error!(%error, "Closing connection failure.");
            }
            return;
        }

        client_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let session = Self::run_session(
            stream,
            client_addr,
            server_addr,
            self.config.clone(),
            self.router.clone(),
            resolver,
        );
        tokio::spawn(async move {
            if let Err(error) = session.await {
                tracing::error!(error = %format!("{error:#}"), "Run session failure.");
            }

            client_counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        });
    }

    /// Main loop of the relay.
    ///
    /// # Errors
    ///
    /// * failed to convert sockets to `[tokio::net::TcpListener]`
    /// * failed to accept a client
    /// * the DNS resolver cannot be built
    #[tracing::instrument(name = "serve", skip_all)]
    pub async fn listen_and_serve(self, sockets: Vec<std::net::TcpListener>) -> anyhow::Result<()> {
        let resolver = relay_config::build_resolver(&self.config.server.dns)
            .context("Failed to build the DNS resolver")?
            .map(std::sync::Arc::new);

        let listeners = sockets
            .into_iter()
            .map(tokio::net::TcpListener::from_std)
            .collect::<std::io::Result<Vec<_>>>()?;

        let client_counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(0));

        let mut map = tokio_stream::StreamMap::new();
        for listener in &listeners {
            map.insert(listener.local_addr()?, Box::pin(listener_to_stream(listener)));
        }

        tracing::info!(
            interfaces = ?map.keys().collect::<Vec<_>>(),
            flows = ?self.router.flows().iter().map(relay_engine::Flow::name).collect::<Vec<_>>(),
            "Listening for clients.",
        );

        while let Some((server_addr, client)) = map.next().await {
            let (stream, client_addr) = client?;

            self.handle_client(
                resolver.clone(),
                client_counter.clone(),
                stream,
                client_addr,
                server_addr,
            )
            .await;
        }
        Ok(())
    }

    /// Serve one client until the connection is closed.
    ///
    /// # Errors
    ///
    /// * the connection failed
    pub async fn run_session(
        stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
        config: std::sync::Arc<Config>,
        router: std::sync::Arc<Router>,
        resolver: Option<std::sync::Arc<TokioAsyncResolver>>,
    ) -> anyhow::Result<()> {
        let smtp = &config.server.smtp;
        let receiver = Receiver::from_tcp(
            stream,
            Handler::new(config.clone(), router, client_addr, server_addr).with_resolver(resolver),
            smtp.error.soft_count,
            smtp.error.hard_count,
            config.server.message_size_limit,
            smtp.timeout_client,
        );

        let smtp_stream = receiver.into_stream(client_addr, server_addr);
        tokio::pin!(smtp_stream);

        let connection_result = async {
            while smtp_stream.try_next().await?.is_some() {
                tracing::debug!("Transaction completed.");
            }
            anyhow::Ok(())
        }
        .await;

        match &connection_result {
            Ok(()) => {
                tracing::info!("Connection closed cleanly.");
            }
            Err(error) => {
                tracing::warn!(%error, "Connection closing failure.");
            }
        }
        connection_result
    }
}
