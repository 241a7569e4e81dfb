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

use relay_common::{auth::Credentials, CodeID, Reply, ReplyCode, Session, Stage};
use relay_config::Config;
use relay_engine::Router;
use relay_protocol::{
    AcceptArgs, AuthArgs, AuthError, EhloArgs, Error, HeloArgs, MailFromArgs, ParseArgsError,
    RcptToArgs, ReceiverContext, UnparsedArgs, Verb,
};

/// Drive the [`Router`] from the SMTP commands of one connection.
pub struct Handler {
    pub(super) session: Session,
    pub(super) config: std::sync::Arc<Config>,
    pub(super) router: std::sync::Arc<Router>,
    pub(super) resolver: Option<std::sync::Arc<trust_dns_resolver::TokioAsyncResolver>>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("session", &self.session.id)
            .finish_non_exhaustive()
    }
}

impl Handler {
    ///
    #[must_use]
    pub fn new(
        config: std::sync::Arc<Config>,
        router: std::sync::Arc<Router>,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) -> Self {
        Self {
            session: router.new_session(client_addr, server_addr, config.server.name.clone()),
            config,
            router,
            resolver: None,
        }
    }

    /// Look up the host name of the client with `resolver` when it connects.
    #[must_use]
    pub fn with_resolver(
        mut self,
        resolver: Option<std::sync::Arc<trust_dns_resolver::TokioAsyncResolver>>,
    ) -> Self {
        self.resolver = resolver;
        self
    }

    /// The session of the connection.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub(super) fn reply_in_config(&self, code: CodeID) -> Reply {
        self.config
            .server
            .smtp
            .codes
            .get(&code)
            .cloned()
            .unwrap_or_else(|| {
                tracing::error!(%code, "Reply missing from the configuration.");
                Reply::new(
                    ReplyCode::Code { code: 451 },
                    "Requested action aborted: local error in processing",
                )
            })
    }
}

#[async_trait::async_trait]
impl relay_protocol::ReceiverHandler for Handler {
    fn get_stage(&self) -> Stage {
        self.session.stage
    }

    async fn on_accept(&mut self, ctx: &mut ReceiverContext, args: AcceptArgs) -> Reply {
        self.on_accept_inner(ctx, &args).await
    }

    async fn on_auth(&mut self, ctx: &mut ReceiverContext, args: AuthArgs) -> Option<Reply> {
        self.on_auth_inner(ctx, args)
    }

    async fn on_post_auth(
        &mut self,
        ctx: &mut ReceiverContext,
        result: Result<Credentials, AuthError>,
    ) -> Reply {
        self.on_post_auth_inner(ctx, result).await
    }

    async fn on_helo(&mut self, _: &mut ReceiverContext, args: HeloArgs) -> Reply {
        self.on_helo_inner(args.client_name, CodeID::Helo)
    }

    async fn on_ehlo(&mut self, _: &mut ReceiverContext, args: EhloArgs) -> Reply {
        self.on_helo_inner(args.client_name, CodeID::Ehlo)
    }

    async fn on_mail_from(&mut self, _: &mut ReceiverContext, args: MailFromArgs) -> Reply {
        self.on_mail_from_inner(args).await
    }

    async fn on_rcpt_to(&mut self, _: &mut ReceiverContext, args: RcptToArgs) -> Reply {
        self.on_rcpt_to_inner(args).await
    }

    async fn on_message(
        &mut self,
        ctx: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply {
        self.on_message_inner(ctx, stream).await
    }

    async fn on_hard_error(&mut self, ctx: &mut ReceiverContext, reply: Reply) -> Reply {
        tracing::warn!("Too many errors, closing the connection.");
        ctx.deny();
        reply.extended(&self.reply_in_config(CodeID::TooManyError))
    }

    async fn on_soft_error(&mut self, _: &mut ReceiverContext, reply: Reply) -> Reply {
        tokio::time::sleep(self.config.server.smtp.error.delay).await;
        reply
    }

    async fn on_rset(&mut self) -> Reply {
        self.session.reset_transaction();
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_data(&mut self) -> Reply {
        self.reply_in_config(CodeID::DataStart)
    }

    async fn on_quit(&mut self) -> Reply {
        self.reply_in_config(CodeID::Closing)
    }

    async fn on_noop(&mut self) -> Reply {
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_help(&mut self, _: UnparsedArgs) -> Reply {
        self.reply_in_config(CodeID::Help)
    }

    async fn on_bad_sequence(&mut self, (verb, stage): (Verb, Stage)) -> Reply {
        tracing::debug!(?verb, %stage, "Bad sequence of commands.");
        self.reply_in_config(CodeID::BadSequence)
    }

    async fn on_args_error(&mut self, error: ParseArgsError) -> Reply {
        tracing::debug!(%error, "Invalid arguments.");
        match error {
            ParseArgsError::UnknownMechanism(_) => {
                self.reply_in_config(CodeID::AuthMechNotSupported)
            }
            _ => self.reply_in_config(CodeID::SyntaxErrorParams),
        }
    }
}
