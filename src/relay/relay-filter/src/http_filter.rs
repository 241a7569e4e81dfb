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
use hmac::Mac;
use relay_common::{auth::Credentials, Address, Session, Verdict};
use relay_engine::{Filter, HookContext};

/// HTTP method of the request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    ///
    #[default]
    Post,
    ///
    Put,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
        }
    }
}

/// Digest used to sign the request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HmacAlgorithm {
    ///
    #[default]
    Sha256,
    ///
    Sha512,
}

/// Signature of the body of the request.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HmacParams {
    /// Key of the HMAC.
    pub secret: String,
    ///
    #[serde(default)]
    pub algo: HmacAlgorithm,
    /// Header carrying the hexadecimal signature.
    #[serde(default = "HmacParams::default_header")]
    pub header: String,
}

impl HmacParams {
    fn default_header() -> String {
        "X-SMTP-RELAY".to_string()
    }

    fn sign(&self, body: &[u8]) -> anyhow::Result<String> {
        fn sign<M: Mac + hmac::digest::KeyInit>(secret: &str, body: &[u8]) -> anyhow::Result<String> {
            let mut mac = <M as Mac>::new_from_slice(secret.as_bytes())
                .map_err(|error| anyhow::anyhow!("invalid hmac secret: {error}"))?;
            mac.update(body);
            Ok(hex::encode(mac.finalize().into_bytes()))
        }

        match self.algo {
            HmacAlgorithm::Sha256 => sign::<hmac::Hmac<sha2::Sha256>>(&self.secret, body),
            HmacAlgorithm::Sha512 => sign::<hmac::Hmac<sha2::Sha512>>(&self.secret, body),
        }
    }
}

/// Parameters of the `http-filter` filter.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFilterParams {
    /// Endpoint deciding the admission of the messages.
    pub url: String,
    ///
    #[serde(default)]
    pub method: HttpMethod,
    /// Accept any authenticated user, the endpoint decides with the username.
    #[serde(default)]
    pub allow_any_user: bool,
    ///
    #[serde(default)]
    pub hmac: Option<HmacParams>,
}

/// What the filter learned about the session, sent to the endpoint with the message.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    ///
    pub remote_address: String,
    ///
    pub remote_port: u16,
    ///
    pub local_address: String,
    ///
    pub local_port: u16,
    /// Reverse DNS name of the client.
    pub client_hostname: Option<String>,
    ///
    pub from: Option<String>,
    ///
    pub rcpts: Vec<String>,
    /// Username of the last authentication attempt.
    pub username: Option<String>,
    /// No authentication succeeded in the session.
    pub anonymous: bool,
}

impl Exchange {
    fn connected(session: &Session) -> Self {
        Self {
            remote_address: session.client_addr.ip().to_string(),
            remote_port: session.client_addr.port(),
            local_address: session.server_addr.ip().to_string(),
            local_port: session.server_addr.port(),
            client_hostname: session.client_hostname.clone(),
            anonymous: true,
            ..Self::default()
        }
    }
}

/// Delegate the admission of the message to an HTTP endpoint.
///
/// The filter abstains until the message is received, then votes with the
/// status of the response: accepted if `2xx`.
#[derive(Debug)]
pub struct HttpFilter {
    client: reqwest::Client,
    url: reqwest::Url,
    method: HttpMethod,
    allow_any_user: bool,
    hmac: Option<HmacParams>,
}

impl HttpFilter {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// * the url is invalid
    /// * the client cannot be built
    pub fn new(params: HttpFilterParams) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent(concat!("smtp-relay/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to build the http client")?,
            url: params
                .url
                .parse()
                .with_context(|| format!("invalid url `{}`", params.url))?,
            method: params.method,
            allow_any_user: params.allow_any_user,
            hmac: params.hmac,
        })
    }

    /// Apply `update` to the exchange of the session, created if the filter
    /// was not run at the connection.
    fn update(ctx: &mut HookContext<'_>, update: impl FnOnce(&mut Exchange)) -> Exchange {
        let mut exchange = ctx
            .take_state::<Exchange>()
            .unwrap_or_else(|| Exchange::connected(ctx.session()));
        update(&mut exchange);
        ctx.set_state(exchange.clone());
        exchange
    }
}

#[async_trait::async_trait]
impl Filter for HttpFilter {
    async fn on_connect(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<Verdict> {
        let exchange = Exchange::connected(ctx.session());
        ctx.set_state(exchange);
        Ok(Verdict::Abstain)
    }

    async fn on_auth(
        &self,
        credentials: &Credentials,
        ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Self::update(ctx, |exchange| {
            exchange.username = Some(credentials.identity().to_string());
        });
        Ok(if self.allow_any_user {
            Verdict::Accept
        } else {
            Verdict::Abstain
        })
    }

    async fn on_mail_from(
        &self,
        address: Option<&Address>,
        ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Self::update(ctx, |exchange| {
            exchange.from = address.map(ToString::to_string);
            exchange.rcpts.clear();
        });
        Ok(Verdict::Abstain)
    }

    async fn on_rcpt_to(
        &self,
        address: &Address,
        ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Self::update(ctx, |exchange| exchange.rcpts.push(address.to_string()));
        Ok(Verdict::Abstain)
    }

    async fn on_data(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<Verdict> {
        let client_hostname = ctx.session().client_hostname.clone();
        let anonymous = ctx.session().identity.is_none();

        let exchange = Self::update(ctx, |exchange| {
            exchange.client_hostname = client_hostname;
            exchange.anonymous = anonymous;
        });
        let body = serde_json::to_vec(&exchange)?;

        let mut request = self
            .client
            .request(self.method.into(), self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(hmac) = &self.hmac {
            request = request.header(hmac.header.as_str(), hmac.sign(&body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .with_context(|| format!("request to `{}` failed", self.url))?;

        let status = response.status();
        tracing::debug!(url = %self.url, %status, "Message submitted to the http endpoint.");
        Ok(status.is_success().into())
    }
}
