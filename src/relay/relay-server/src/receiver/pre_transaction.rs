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
use relay_common::{auth::Credentials, CodeID, Reply};
use relay_protocol::{AcceptArgs, AuthArgs, AuthError, ReceiverContext};

impl Handler {
    pub(super) async fn on_accept_inner(
        &mut self,
        ctx: &mut ReceiverContext,
        args: &AcceptArgs,
    ) -> Reply {
        self.session.client_addr = args.client_addr;
        self.session.server_addr = args.server_addr;
        self.session.client_hostname = self.lookup_client_hostname(args.client_addr.ip()).await;

        if self
            .router
            .on_connect(&mut self.session)
            .await
            .is_admitted()
        {
            self.reply_in_config(CodeID::Greetings)
        } else {
            tracing::info!("Connection refused by every flow.");
            ctx.deny();
            self.reply_in_config(CodeID::ConnectionRefused)
        }
    }

    async fn lookup_client_hostname(&self, ip: std::net::IpAddr) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        match resolver.reverse_lookup(ip).await {
            Ok(names) => {
                let hostname = names
                    .into_iter()
                    .next()
                    .map(|name| name.to_string().trim_end_matches('.').to_string());
                tracing::debug!(?hostname, "Client host name resolved.");
                hostname
            }
            Err(error) => {
                tracing::debug!(%error, "Reverse lookup of the client failed.");
                None
            }
        }
    }

    pub(super) fn on_helo_inner(&mut self, client_name: String, code: CodeID) -> Reply {
        tracing::debug!(%client_name, "Client identified.");

        self.session.client_name = Some(client_name);
        self.session.reset_transaction();

        self.reply_in_config(code)
    }

    pub(super) fn on_auth_inner(
        &mut self,
        ctx: &mut ReceiverContext,
        args: AuthArgs,
    ) -> Option<Reply> {
        if self.session.identity.is_some() {
            return Some(self.reply_in_config(CodeID::AuthAlreadyDone));
        }

        if !self
            .config
            .server
            .smtp
            .auth
            .mechanisms
            .contains(&args.mechanism)
        {
            tracing::debug!(mechanism = %args.mechanism, "Mechanism not enabled.");
            return Some(self.reply_in_config(CodeID::AuthMechNotSupported));
        }

        ctx.authenticate(args.mechanism, args.initial_response);
        None
    }

    pub(super) async fn on_post_auth_inner(
        &mut self,
        ctx: &mut ReceiverContext,
        result: Result<Credentials, AuthError>,
    ) -> Reply {
        let credentials = match result {
            Ok(credentials) => credentials,
            Err(AuthError::Canceled) => {
                tracing::debug!("Authentication canceled by the client.");
                return self.reply_in_config(CodeID::AuthClientCanceled);
            }
            Err(AuthError::Base64 { source }) => {
                tracing::debug!(%source, "Invalid sasl message.");
                return self.reply_in_config(CodeID::AuthErrorDecode64);
            }
            Err(AuthError::InvalidMessage) => {
                return self.reply_in_config(CodeID::SyntaxErrorParams);
            }
            Err(AuthError::IO(error)) => {
                tracing::warn!(%error, "Connection lost during the authentication.");
                ctx.deny();
                return self.reply_in_config(CodeID::Failure);
            }
        };

        let (admission, identity) = self.router.on_auth(&credentials, &mut self.session).await;
        if admission.is_admitted() {
            tracing::info!(%identity, mechanism = %credentials.mechanism(), "Client authenticated.");
            self.reply_in_config(CodeID::AuthSucceeded)
        } else {
            tracing::info!(%identity, "Authentication refused.");
            self.reply_in_config(CodeID::AuthInvalidCredentials)
        }
    }
}
