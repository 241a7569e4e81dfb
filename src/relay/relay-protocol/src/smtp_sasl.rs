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

use crate::{Receiver, ReceiverHandler};
use base64::Engine;
use relay_common::auth::{Credentials, Mechanism};
use tokio_stream::StreamExt;

/// The possible outcomes of a SMTP-SASL handshake.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client send `*\r\n` during the SASL handshake.
    #[error("sasl challenge cancelled by the client")]
    Canceled,
    /// The buffer sent/received during the SMTP+SASL handshake must be [`base64`] encoded.
    #[error("base64 decoding fail: {source}")]
    Base64 {
        /// Inner error.
        #[from]
        #[source]
        source: base64::DecodeError,
    },
    /// The decoded buffer does not match the layout of the mechanism.
    #[error("malformed sasl message")]
    InvalidMessage,
    /// Error while reading/writing to the underlying stream.
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

const PROMPT_EMPTY: &str = "334 \r\n";
// base64 of "Username:" and "Password:"
const PROMPT_USERNAME: &str = "334 VXNlcm5hbWU6\r\n";
const PROMPT_PASSWORD: &str = "334 UGFzc3dvcmQ6\r\n";

fn decode(buffer: &[u8]) -> Result<Vec<u8>, AuthError> {
    if buffer == b"=" {
        return Ok(vec![]);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(buffer)?)
}

fn utf8(buffer: Vec<u8>) -> Result<String, AuthError> {
    String::from_utf8(buffer).map_err(|_| AuthError::InvalidMessage)
}

impl<
        T: ReceiverHandler + Send,
        W: tokio::io::AsyncWrite + Unpin + Send,
        R: tokio::io::AsyncRead + Unpin + Send,
    > Receiver<T, W, R>
{
    /// Send `prompt` and read the decoded response of the client.
    async fn challenge(&mut self, prompt: &str) -> Result<Vec<u8>, AuthError> {
        self.writer.write_all(prompt).await?;

        let line = {
            let stream = self.reader.as_line_stream();
            tokio::pin!(stream);
            stream.next().await.transpose()?.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed during the sasl handshake",
                )
            })?
        };

        let line = line
            .strip_suffix(b"\r\n")
            .ok_or(AuthError::InvalidMessage)?;
        if line == b"*" {
            return Err(AuthError::Canceled);
        }
        decode(line)
    }

    async fn first_response(
        &mut self,
        initial_response: Option<Vec<u8>>,
        prompt: &str,
    ) -> Result<Vec<u8>, AuthError> {
        match initial_response {
            Some(buffer) => decode(&buffer),
            None => self.challenge(prompt).await,
        }
    }

    pub(crate) async fn authenticate(
        &mut self,
        mechanism: Mechanism,
        initial_response: Option<Vec<u8>>,
    ) -> Result<Credentials, AuthError> {
        tracing::debug!(%mechanism, "Starting sasl handshake.");

        match mechanism {
            // [authzid] \0 authcid \0 passwd
            Mechanism::Plain => {
                let message = self.first_response(initial_response, PROMPT_EMPTY).await?;
                let parts = message.split(|c| *c == 0).collect::<Vec<_>>();
                match parts.as_slice() {
                    [_authzid, authcid, passwd] if !authcid.is_empty() => {
                        Ok(Credentials::Verify {
                            mechanism,
                            authid: utf8(authcid.to_vec())?,
                            authpass: utf8(passwd.to_vec())?,
                        })
                    }
                    _ => Err(AuthError::InvalidMessage),
                }
            }
            Mechanism::Login => {
                let authid = utf8(
                    self.first_response(initial_response, PROMPT_USERNAME)
                        .await?,
                )?;
                let authpass = utf8(self.challenge(PROMPT_PASSWORD).await?)?;
                if authid.is_empty() {
                    return Err(AuthError::InvalidMessage);
                }
                Ok(Credentials::Verify {
                    mechanism,
                    authid,
                    authpass,
                })
            }
            Mechanism::Anonymous => Ok(Credentials::AnonymousToken {
                token: utf8(self.first_response(initial_response, PROMPT_EMPTY).await?)?,
            }),
        }
    }
}
