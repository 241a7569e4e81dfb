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

use relay_config::Config;
use relay_engine::Router;
use relay_protocol::Receiver;
use relay_server::Handler;
use tokio_stream::StreamExt;

/// A type implementing Write+Read to emulate sockets
#[derive(Debug)]
pub struct Mock<'a, T: AsRef<[u8]> + Unpin> {
    read_cursor: std::io::Cursor<T>,
    write_cursor: std::io::Cursor<&'a mut Vec<u8>>,
}

impl<'a, T: AsRef<[u8]> + Unpin> Mock<'a, T> {
    /// Create an new instance
    pub fn new(read: T, write: &'a mut Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            write_cursor: std::io::Cursor::new(write),
        }
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncRead for Mock<'_, T> {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncWrite for Mock<'_, T> {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(std::io::Write::write(&mut self.write_cursor, buf))
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(std::io::Write::flush(&mut self.write_cursor))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// Address of the mocked client.
#[must_use]
pub fn client_addr() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([127, 0, 0, 1], 53844))
}

/// Address of the mocked server.
#[must_use]
pub fn server_addr() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([127, 0, 0, 1], 10025))
}

/// Run a connection on `io` until the client quits or the connection is denied.
///
/// # Errors
///
/// * the outcome of the connection
pub async fn run_connection<IO>(
    io: IO,
    config: std::sync::Arc<Config>,
    router: std::sync::Arc<Router>,
) -> anyhow::Result<()>
where
    IO: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send,
{
    let (read, write) = tokio::io::split(io);
    let smtp = &config.server.smtp;
    let receiver = Receiver::new(
        read,
        write,
        Handler::new(config.clone(), router, client_addr(), server_addr()),
        smtp.error.soft_count,
        smtp.error.hard_count,
        config.server.message_size_limit,
        smtp.timeout_client,
    );

    let stream = receiver.into_stream(client_addr(), server_addr());
    tokio::pin!(stream);

    while stream.try_next().await?.is_some() {}
    Ok(())
}

/// Run a connection and assert the output produced by the relay is `expected_output`.
///
/// # Errors
///
/// * the outcome of the connection
pub async fn test_receiver_inner(
    smtp_input: &[u8],
    expected_output: &[u8],
    config: std::sync::Arc<Config>,
    router: std::sync::Arc<Router>,
) -> anyhow::Result<()> {
    let mut written_data = Vec::new();
    let mock = Mock::new(smtp_input.to_vec(), &mut written_data);

    let result = run_connection(mock, config, router).await;

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&written_data),
    );

    result
}

/// Build the router of a configuration with the filters and processors of the relay.
///
/// # Panics
///
/// * a component of the configuration cannot be built
#[must_use]
pub fn router_of(config: &Config) -> Router {
    smtp_relay::build_router(config).unwrap()
}

/// Call [`test_receiver_inner`], the configuration defaults to [`crate::config::local_test`]
/// and the router is built from the configuration.
#[macro_export]
macro_rules! test_receiver {
    ($input:expr, $output:expr) => {
        $crate::test_receiver! {
            with_config => $crate::config::local_test(),
            $input,
            $output
        }
    };
    (with_config => $config:expr, $input:expr, $output:expr) => {{
        let config = $config;
        let router = $crate::receiver::router_of(&config);
        $crate::test_receiver! {
            with_config => config,
            with_router => router,
            $input,
            $output
        }
    }};
    (with_config => $config:expr, with_router => $router:expr, $input:expr, $output:expr) => {
        $crate::receiver::test_receiver_inner(
            $input.as_bytes(),
            $output.as_bytes(),
            std::sync::Arc::new($config),
            std::sync::Arc::new($router),
        )
        .await
    };
}
