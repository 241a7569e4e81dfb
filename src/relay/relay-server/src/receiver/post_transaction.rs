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

use crate::{BodyCache, CacheError, Handler};
use relay_common::{CodeID, Reply};
use relay_engine::replace_path_variables;
use relay_mail_parser::{BasicParser, MailParser};
use relay_protocol::{Error, ReceiverContext};

impl Handler {
    pub(super) async fn on_message_inner(
        &mut self,
        _: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply {
        tracing::info!("SMTP handshake completed, fetching email...");

        self.session.sequence += 1;
        let cache = BodyCache::new(replace_path_variables(&self.config.cache.path, &self.session));
        let reply = match cache.write(stream, &self.config.headers).await {
            Ok(()) => {
                tracing::info!("Message body fully received, processing...");
                let reply = self.on_body_cached(&cache).await;

                if !self.config.cache.keep {
                    cache.remove().await;
                }
                reply
            }
            Err(CacheError::Size { expected, got }) => {
                tracing::info!(expected, got, "Message size exceeded.");
                self.reply_in_config(CodeID::MessageSizeExceeded)
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to receive the message.");
                self.reply_in_config(CodeID::Failure)
            }
        };

        self.session.reset_transaction();
        reply
    }

    async fn on_body_cached(&mut self, cache: &BodyCache) -> Reply {
        let raw = match tokio::fs::read(cache.path()).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, path = %cache.path().display(), "Failed to read the message.");
                return self.reply_in_config(CodeID::Failure);
            }
        };

        self.session.message = match BasicParser::default().parse_bytes(&raw) {
            Ok(message) => Some(message),
            Err(error) => {
                tracing::warn!(%error, "Message could not be parsed, filters only get the raw body.");
                None
            }
        };
        self.session.body_path = Some(cache.path().to_path_buf());

        if !self.router.on_data(&mut self.session).await.is_admitted() {
            tracing::info!("Message refused by every flow.");
            return self.reply_in_config(CodeID::Refused);
        }

        let outcomes = self.router.dispatch(&self.session).await;
        tracing::info!(
            processed = outcomes.len(),
            failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count(),
            "Message dispatched."
        );

        self.reply_in_config(CodeID::Ok)
    }
}
