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

use anyhow::Context;
use relay_common::Session;
use relay_engine::Processor;

/// Replace the envelope of the forwarded messages.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeOverride {
    /// Reverse path.
    #[serde(default)]
    pub from: Option<String>,
    /// Forward paths.
    #[serde(default)]
    pub to: Option<Vec<String>>,
}

/// Parameters of the `smtp` processor.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpParams {
    /// Server receiving the messages.
    pub host: String,
    ///
    #[serde(default = "SmtpParams::default_port")]
    pub port: u16,
    /// Authenticate with `username` and `password` if both are set.
    #[serde(default)]
    pub username: Option<String>,
    ///
    #[serde(default)]
    pub password: Option<String>,
    /// Connect with implicit TLS.
    #[serde(default)]
    pub tls: bool,
    ///
    #[serde(default, rename = "override")]
    pub overrides: Option<EnvelopeOverride>,
}

impl SmtpParams {
    const fn default_port() -> u16 {
        25
    }
}

type Transport = lettre::AsyncSmtpTransport<lettre::Tokio1Executor>;

/// Forward the raw message to another SMTP server.
pub struct SmtpProcessor {
    transport: Transport,
    host: String,
    overrides: EnvelopeOverride,
}

impl std::fmt::Debug for SmtpProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpProcessor")
            .field("host", &self.host)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl SmtpProcessor {
    /// Build the transport, no connection is opened.
    ///
    /// # Errors
    ///
    /// * the TLS parameters cannot be built for `host`
    pub fn new(params: SmtpParams) -> anyhow::Result<Self> {
        let builder = if params.tls {
            Transport::relay(&params.host)
                .with_context(|| format!("failed to build tls parameters for {}", params.host))?
        } else {
            Transport::builder_dangerous(&params.host)
        }
        .port(params.port);

        let builder = match (params.username, params.password) {
            (Some(username), Some(password)) => builder.credentials(
                lettre::transport::smtp::authentication::Credentials::new(username, password),
            ),
            _ => builder,
        };

        tracing::trace!(
            host = %params.host,
            port = params.port,
            tls = params.tls,
            "Creating a transport."
        );

        Ok(Self {
            transport: builder.build(),
            host: params.host,
            overrides: params.overrides.unwrap_or_default(),
        })
    }

    fn envelope(&self, session: &Session) -> anyhow::Result<lettre::address::Envelope> {
        let from = match &self.overrides.from {
            Some(from) => Some(from.clone()),
            None => session.envelope.mail_from.as_ref().map(ToString::to_string),
        }
        .map(|from| from.parse::<lettre::Address>())
        .transpose()
        .context("failed to parse from address")?;

        let to = match &self.overrides.to {
            Some(to) => to.clone(),
            None => session
                .envelope
                .rcpt_to
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
        .iter()
        .map(|rcpt| rcpt.parse::<lettre::Address>())
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse recipient address")?;

        lettre::address::Envelope::new(from, to).context("failed to build message envelop")
    }
}

#[async_trait::async_trait]
impl Processor for SmtpProcessor {
    #[tracing::instrument(name = "smtp", skip_all)]
    async fn on_mail(&self, session: &Session) -> anyhow::Result<()> {
        use lettre::AsyncTransport;

        let path = session
            .body_path
            .as_ref()
            .context("the message has not been persisted")?;
        let message = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let envelope = self.envelope(session)?;

        let response = self
            .transport
            .send_raw(&envelope, &message)
            .await
            .context("fail to send email")?;

        tracing::info!(host = %self.host, "Email forwarded.");
        tracing::debug!(?response);
        Ok(())
    }
}
