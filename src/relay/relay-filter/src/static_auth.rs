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
use relay_common::{auth::Credentials, Verdict};
use relay_engine::{Filter, HookContext};
use sha2::Digest;
use subtle::ConstantTimeEq;

/// Parameters of the `static-auth` filter.
///
/// Missing values are read from `SMTP_USERNAME`, `SMTP_PASSWORD` and `SMTP_PASSWORD_SALT`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticAuthParams {
    ///
    #[serde(default)]
    pub username: Option<String>,
    /// `plain:<secret>`, `sha256:<hex digest>` or `sha512:<hex digest>`.
    #[serde(default)]
    pub password: Option<String>,
    /// If set, the digest is the HMAC of the password keyed by the salt.
    #[serde(default)]
    pub salt: Option<String>,
}

#[derive(Debug)]
enum Secret {
    Plain(String),
    Sha256(Vec<u8>),
    Sha512(Vec<u8>),
}

impl std::str::FromStr for Secret {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, secret) = s
            .split_once(':')
            .context("password must be formatted as `<scheme>:<secret>`")?;

        match scheme {
            "plain" => Ok(Self::Plain(secret.to_string())),
            "sha256" => Ok(Self::Sha256(
                hex::decode(secret).context("sha256 digest is not hexadecimal")?,
            )),
            "sha512" => Ok(Self::Sha512(
                hex::decode(secret).context("sha512 digest is not hexadecimal")?,
            )),
            otherwise => {
                anyhow::bail!("unknown password scheme `{otherwise}`, expected one of: plain,sha256,sha512")
            }
        }
    }
}

fn verify_keyed<M: Mac + hmac::digest::KeyInit>(
    salt: &str,
    password: &str,
    digest: &[u8],
) -> anyhow::Result<bool> {
    let mut mac = <M as Mac>::new_from_slice(salt.as_bytes())
        .map_err(|error| anyhow::anyhow!("invalid salt: {error}"))?;
    mac.update(password.as_bytes());
    Ok(mac.verify_slice(digest).is_ok())
}

/// Comparison in constant time for inputs of the same length.
fn same(expected: &[u8], got: &[u8]) -> bool {
    expected.ct_eq(got).into()
}

/// Admit a single user, whose credentials are in the configuration or in the environment.
#[derive(Debug)]
pub struct StaticAuth {
    username: String,
    secret: Secret,
    salt: Option<String>,
}

impl StaticAuth {
    /// Complete the parameters with the environment of the process.
    ///
    /// # Errors
    ///
    /// see [`StaticAuth::with_lookup`]
    pub fn from_env(params: StaticAuthParams) -> anyhow::Result<Self> {
        Self::with_lookup(params, |name| std::env::var(name).ok())
    }

    /// Complete the parameters with `lookup`, called with the name of the
    /// environment variable of each missing value.
    ///
    /// # Errors
    ///
    /// * the username or the password is missing
    /// * the password scheme is unknown
    pub fn with_lookup(
        params: StaticAuthParams,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let username = params
            .username
            .or_else(|| lookup("SMTP_USERNAME"))
            .context("static-auth requires a username, or SMTP_USERNAME to be set")?;
        let password = params
            .password
            .or_else(|| lookup("SMTP_PASSWORD"))
            .context("static-auth requires a password, or SMTP_PASSWORD to be set")?;

        Ok(Self {
            username,
            secret: password.parse()?,
            salt: params.salt.or_else(|| lookup("SMTP_PASSWORD_SALT")),
        })
    }

    fn validate_password(&self, password: &str) -> anyhow::Result<bool> {
        Ok(match (&self.secret, self.salt.as_deref()) {
            (Secret::Plain(secret), _) => same(secret.as_bytes(), password.as_bytes()),
            (Secret::Sha256(digest), None) => same(digest, &sha2::Sha256::digest(password)),
            (Secret::Sha512(digest), None) => same(digest, &sha2::Sha512::digest(password)),
            (Secret::Sha256(digest), Some(salt)) => {
                verify_keyed::<hmac::Hmac<sha2::Sha256>>(salt, password, digest)?
            }
            (Secret::Sha512(digest), Some(salt)) => {
                verify_keyed::<hmac::Hmac<sha2::Sha512>>(salt, password, digest)?
            }
        })
    }
}

#[async_trait::async_trait]
impl Filter for StaticAuth {
    async fn on_auth(
        &self,
        credentials: &Credentials,
        _: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        let Credentials::Verify { authid, authpass, .. } = credentials else {
            return Ok(Verdict::Reject);
        };

        // the password is checked even for an unknown user
        let known = same(self.username.as_bytes(), authid.as_bytes());
        let valid = self.validate_password(authpass)? & known;
        tracing::debug!(username = %authid, valid, "Static authentication.");
        Ok(valid.into())
    }
}
