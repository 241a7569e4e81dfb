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

use crate::{
    reader::Reader,
    writer::{ErrorCounter, Escalation, Writer},
    AcceptArgs, AuthArgs, EhloArgs, Error, HeloArgs, MailFromArgs, ParseArgsError, RcptToArgs,
    ReceiverHandler, Verb,
};
use relay_common::{auth::Mechanism, Reply, ReplyCode, Stage};
use tokio_stream::StreamExt;

enum HandshakeOutcome {
    Message,
    Authenticate {
        mechanism: Mechanism,
        initial_response: Option<Vec<u8>>,
    },
    Quit,
}

/// An handle to send event from the [`ReceiverHandler`] to the [`Receiver`].
#[derive(Default)]
pub struct ReceiverContext {
    outcome: Option<HandshakeOutcome>,
}

impl ReceiverContext {
    /// Make the [`Receiver`] quit the connection early, and close cleanly.
    pub fn deny(&mut self) {
        self.outcome = Some(HandshakeOutcome::Quit);
    }

    /// Make the [`Receiver`] initialize a SASL handshake.
    pub fn authenticate(&mut self, mechanism: Mechanism, initial_response: Option<Vec<u8>>) {
        self.outcome = Some(HandshakeOutcome::Authenticate {
            mechanism,
            initial_response,
        });
    }

    const fn is_quit(&self) -> bool {
        matches!(self.outcome, Some(HandshakeOutcome::Quit))
    }
}

/// A SMTP receiver.
pub struct Receiver<
    T: ReceiverHandler + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
    R: tokio::io::AsyncRead + Unpin + Send,
> {
    pub(crate) handler: T,
    pub(crate) writer: Writer<W>,
    pub(crate) reader: Reader<R>,
    error_counter: ErrorCounter,
    context: ReceiverContext,
    message_size_max: usize,
    command_timeout: std::time::Duration,
}

impl<T: ReceiverHandler + Send>
    Receiver<T, tokio::net::tcp::OwnedWriteHalf, tokio::net::tcp::OwnedReadHalf>
{
    /// Create a new [`Receiver`] from a TCP/IP stream.
    pub fn from_tcp(
        tcp_stream: tokio::net::TcpStream,
        handler: T,
        threshold_soft_error: i64,
        threshold_hard_error: i64,
        message_size_max: usize,
        command_timeout: std::time::Duration,
    ) -> Self {
        let (read, write) = tcp_stream.into_split();
        Self::new(
            read,
            write,
            handler,
            threshold_soft_error,
            threshold_hard_error,
            message_size_max,
            command_timeout,
        )
    }
}

impl<
        T: ReceiverHandler + Send,
        W: tokio::io::AsyncWrite + Unpin + Send,
        R: tokio::io::AsyncRead + Unpin + Send,
    > Receiver<T, W, R>
{
    /// Create a new [`Receiver`] from the two halves of a stream.
    ///
    /// A threshold of `-1` disables the corresponding error limit.
    pub fn new(
        read: R,
        write: W,
        handler: T,
        threshold_soft_error: i64,
        threshold_hard_error: i64,
        message_size_max: usize,
        command_timeout: std::time::Duration,
    ) -> Self {
        Self {
            handler,
            writer: Writer::new(write),
            reader: Reader::new(read),
            error_counter: ErrorCounter::new(threshold_soft_error, threshold_hard_error),
            context: ReceiverContext { outcome: None },
            message_size_max,
            command_timeout,
        }
    }

    /// Send `reply`, letting the handler rewrite it when the error thresholds
    /// are reached.
    async fn send(&mut self, reply: Reply) -> std::io::Result<()> {
        let reply = match self.error_counter.record(&reply) {
            Escalation::None => reply,
            Escalation::Soft => self.handler.on_soft_error(&mut self.context, reply).await,
            Escalation::Hard => self.handler.on_hard_error(&mut self.context, reply).await,
        };
        self.writer.write_all(reply.as_ref()).await
    }

    /// Handle the inner stream to produce a [`tokio_stream::Stream`], each item
    /// being a successful SMTP transaction.
    pub fn into_stream(
        mut self,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<()>> {
        async_stream::try_stream! {
            let reply_accept = self.handler.on_accept(
                &mut self.context,
                AcceptArgs {
                    client_addr,
                    server_addr,
                }
            ).await;
            self.send(reply_accept).await?;

            let produced_context_accept = std::mem::take(&mut self.context);
            if produced_context_accept.is_quit() {
                return;
            }

            loop {
                match self.smtp_handshake().await? {
                    HandshakeOutcome::Message => {
                        let reply = {
                            let message_stream = self.reader.as_message_stream(self.message_size_max).fuse();
                            tokio::pin!(message_stream);

                            self.handler.on_message(&mut self.context, message_stream).await
                        };
                        self.send(reply).await?;

                        yield ();

                        let produced_context = std::mem::take(&mut self.context);
                        if produced_context.is_quit() {
                            return;
                        }
                    },
                    HandshakeOutcome::Authenticate { mechanism, initial_response } => {
                        let auth_result = self.authenticate(mechanism, initial_response).await;

                        let reply = self.handler.on_post_auth(&mut self.context, auth_result).await;
                        self.send(reply).await?;

                        let produced_context = std::mem::take(&mut self.context);
                        if produced_context.is_quit() {
                            return;
                        }
                    },
                    HandshakeOutcome::Quit => break,
                }
            }
        }
    }

    /// SMTP handshake (generate the envelope and metadata).
    async fn smtp_handshake(&mut self) -> std::io::Result<HandshakeOutcome> {
        macro_rules! handle_args {
            ($args_output:ty, $args:expr, $on_event:tt) => {
                match <$args_output>::try_from($args) {
                    Ok(args) => self.handler.$on_event(&mut self.context, args).await,
                    Err(e) => self.handler.on_args_error(e).await,
                }
            };
            ($args_output:ty, $args:expr, Option: $on_event:tt) => {
                match <$args_output>::try_from($args) {
                    Ok(args) => self.handler.$on_event(&mut self.context, args).await,
                    Err(e) => Some(self.handler.on_args_error(e).await),
                }
            };
        }

        loop {
            let command = {
                let command_stream = self
                    .reader
                    .as_command_stream()
                    .timeout(self.command_timeout);
                tokio::pin!(command_stream);
                command_stream.try_next().await
            };

            let command = match command {
                Ok(Some(command)) => command,
                Ok(None) => return Ok(HandshakeOutcome::Quit),
                Err(e) => {
                    tracing::warn!("Closing after {} without receiving a command", e);
                    self.send(Reply::new(
                        ReplyCode::Code { code: 451 },
                        "Timeout - closing connection",
                    ))
                    .await?;

                    return Ok(HandshakeOutcome::Quit);
                }
            };

            let (verb, args) = match command {
                Ok(command) => command,
                Err(Error::BufferTooLong { expected, got }) => {
                    let reply = self
                        .handler
                        .on_args_error(ParseArgsError::BufferTooLong { expected, got })
                        .await;
                    self.send(reply).await?;
                    if std::mem::take(&mut self.context).is_quit() {
                        return Ok(HandshakeOutcome::Quit);
                    }
                    continue;
                }
                Err(Error::Io(io)) => return Err(io),
            };
            tracing::trace!("<< {:?} ; {:?}", verb, std::str::from_utf8(&args.0));

            let stage = self.handler.get_stage();
            let reply = match (verb, stage) {
                (Verb::Helo, _) => Some(handle_args!(HeloArgs, args, on_helo)),
                (Verb::Ehlo, _) => Some(handle_args!(EhloArgs, args, on_ehlo)),
                (Verb::Noop, _) => Some(self.handler.on_noop().await),
                (Verb::Rset, _) => Some(self.handler.on_rset().await),
                (Verb::Auth, Stage::Connect | Stage::Helo) => {
                    handle_args!(AuthArgs, args, Option: on_auth)
                }
                (Verb::MailFrom, Stage::Helo | Stage::MailFrom) => {
                    Some(handle_args!(MailFromArgs, args, on_mail_from))
                }
                (Verb::RcptTo, Stage::MailFrom | Stage::RcptTo) => {
                    Some(handle_args!(RcptToArgs, args, on_rcpt_to))
                }
                (Verb::Data, Stage::RcptTo) => {
                    self.context.outcome = Some(HandshakeOutcome::Message);
                    Some(self.handler.on_data().await)
                }
                (Verb::Quit, _) => {
                    self.context.outcome = Some(HandshakeOutcome::Quit);
                    Some(self.handler.on_quit().await)
                }
                (Verb::Help, _) => Some(self.handler.on_help(args).await),
                (Verb::Unknown, _) => Some(self.handler.on_unknown(args.0).await),
                otherwise => Some(self.handler.on_bad_sequence(otherwise).await),
            };

            if let Some(reply) = reply {
                self.send(reply).await?;
            }

            let produced_context = std::mem::take(&mut self.context);
            if let Some(done) = produced_context.outcome {
                return Ok(done);
            }
        }
    }
}
