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

use relay_common::{Address, Verdict};
use relay_engine::{Filter, HookContext};

/// An entry of a whitelist: an exact value, or `regexp:<pattern>`.
///
/// A pattern must match the whole value, `^` and `$` are added if missing.
#[derive(Debug, Clone)]
pub enum Pattern {
    ///
    Exact(String),
    ///
    Regex(regex::Regex),
}

impl std::str::FromStr for Pattern {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(pattern) = s.strip_prefix("regexp:") else {
            return Ok(Self::Exact(s.to_string()));
        };

        let mut pattern = pattern.to_string();
        if !pattern.starts_with('^') {
            pattern.insert(0, '^');
        }
        if !pattern.ends_with('$') {
            pattern.push('$');
        }
        regex::Regex::new(&pattern).map(Self::Regex)
    }
}

impl Pattern {
    ///
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == value,
            Self::Regex(regex) => regex.is_match(value),
        }
    }
}

/// Parameters of the `whitelist` filter, every list is optional.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhitelistParams {
    /// Senders.
    #[serde(default)]
    pub from: Option<Vec<String>>,
    /// Recipients.
    #[serde(default)]
    pub to: Option<Vec<String>>,
    /// Addresses of the client.
    #[serde(default)]
    pub ips: Option<Vec<String>>,
    /// Host names of the client, found by a reverse DNS lookup of its address.
    #[serde(default)]
    pub domains: Option<Vec<String>>,
}

/// Admit the senders, recipients, addresses or client names listed.
///
/// An attribute without list is not voted on.
#[derive(Debug)]
pub struct Whitelist {
    from: Option<Vec<Pattern>>,
    to: Option<Vec<Pattern>>,
    ips: Option<Vec<Pattern>>,
    domains: Option<Vec<Pattern>>,
}

fn compile(list: Option<Vec<String>>) -> Result<Option<Vec<Pattern>>, regex::Error> {
    list.map(|list| list.iter().map(|i| i.parse()).collect())
        .transpose()
}

/// `None` if no list is configured, `true` if any entry matches.
fn check(list: Option<&[Pattern]>, value: &str) -> Option<bool> {
    list.map(|list| list.iter().any(|pattern| pattern.matches(value)))
}

impl Whitelist {
    /// Compile the patterns.
    ///
    /// # Errors
    ///
    /// * an invalid regular expression
    pub fn new(params: WhitelistParams) -> anyhow::Result<Self> {
        Ok(Self {
            from: compile(params.from)?,
            to: compile(params.to)?,
            ips: compile(params.ips)?,
            domains: compile(params.domains)?,
        })
    }
}

#[async_trait::async_trait]
impl Filter for Whitelist {
    async fn on_connect(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<Verdict> {
        let session = ctx.session();
        let ip = check(
            self.ips.as_deref(),
            &session.client_addr.ip().to_string(),
        );
        // a client without host name is not in any list
        let domain = self.domains.as_deref().map(|list| {
            session
                .client_hostname
                .as_deref()
                .map_or(false, |name| list.iter().any(|pattern| pattern.matches(name)))
        });

        Ok(match (ip, domain) {
            (None, None) => Verdict::Abstain,
            (ip, domain) => (ip.unwrap_or(false) || domain.unwrap_or(false)).into(),
        })
    }

    async fn on_mail_from(
        &self,
        address: Option<&Address>,
        _: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Ok(check(self.from.as_deref(), address.map_or("", Address::full)).into())
    }

    async fn on_rcpt_to(
        &self,
        address: &Address,
        _: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Ok(check(self.to.as_deref(), address.full()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::{Pattern, Whitelist, WhitelistParams};
    use relay_common::{addr, Session, StateKey, Verdict};
    use relay_engine::{Filter, HookContext};

    fn session() -> Session {
        Session::new(
            "192.168.1.10:49152".parse().unwrap(),
            "127.0.0.1:10025".parse().unwrap(),
            "relay.test",
            ["main"],
        )
    }

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(ToString::to_string).collect())
    }

    #[rstest::rstest]
    #[case("john@doe.com", "john@doe.com", true)]
    #[case("john@doe.com", "john@doe.com.evil", false)]
    #[case("regexp:.*@doe\\.com", "jane@doe.com", true)]
    #[case("regexp:.*@doe\\.com", "jane@doe.com.evil", false)]
    #[case("regexp:doe", "john@doe.com", false)]
    #[case("regexp:^192\\.168\\..*$", "192.168.1.10", true)]
    fn patterns(#[case] pattern: &str, #[case] value: &str, #[case] expected: bool) {
        pretty_assertions::assert_eq!(pattern.parse::<Pattern>().unwrap().matches(value), expected);
    }

    #[test]
    fn invalid_regex() {
        assert!(Whitelist::new(WhitelistParams {
            to: strings(&["regexp:(unclosed"]),
            ..Default::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn recipients() {
        let filter = Whitelist::new(WhitelistParams {
            to: strings(&["regexp:.*@x\\.com"]),
            ..Default::default()
        })
        .unwrap();
        let mut session = session();
        let key = StateKey::new("main", "whitelist_0");
        let mut ctx = HookContext::new(&mut session, &key);

        pretty_assertions::assert_eq!(
            filter.on_rcpt_to(&addr!("good@x.com"), &mut ctx).await.unwrap(),
            Verdict::Accept
        );
        pretty_assertions::assert_eq!(
            filter.on_rcpt_to(&addr!("bad@y.com"), &mut ctx).await.unwrap(),
            Verdict::Reject
        );
        pretty_assertions::assert_eq!(
            filter.on_mail_from(None, &mut ctx).await.unwrap(),
            Verdict::Abstain
        );
    }

    #[rstest::rstest]
    #[case(None, None, Some("client.test"), Verdict::Abstain)]
    #[case(strings(&["192.168.1.10"]), None, None, Verdict::Accept)]
    #[case(strings(&["10.0.0.1"]), None, Some("client.test"), Verdict::Reject)]
    #[case(strings(&["10.0.0.1"]), strings(&["client.test"]), Some("client.test"), Verdict::Accept)]
    #[case(None, strings(&["regexp:.*\\.test"]), Some("client.test"), Verdict::Accept)]
    #[case(None, strings(&["other.test"]), Some("client.test"), Verdict::Reject)]
    #[case::unresolved(None, strings(&["client.test"]), None, Verdict::Reject)]
    #[tokio::test]
    async fn connect(
        #[case] ips: Option<Vec<String>>,
        #[case] domains: Option<Vec<String>>,
        #[case] hostname: Option<&str>,
        #[case] expected: Verdict,
    ) {
        let filter = Whitelist::new(WhitelistParams {
            ips,
            domains,
            ..Default::default()
        })
        .unwrap();
        let mut session = session();
        session.client_hostname = hostname.map(str::to_string);
        session.client_name = Some("helo.name".to_string());
        let key = StateKey::new("main", "whitelist_0");

        pretty_assertions::assert_eq!(
            filter
                .on_connect(&mut HookContext::new(&mut session, &key))
                .await
                .unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn helo_name_is_not_a_domain() {
        let filter = Whitelist::new(WhitelistParams {
            domains: strings(&["client.test"]),
            ..Default::default()
        })
        .unwrap();
        let mut session = session();
        session.client_name = Some("client.test".to_string());
        let key = StateKey::new("main", "whitelist_0");

        pretty_assertions::assert_eq!(
            filter
                .on_connect(&mut HookContext::new(&mut session, &key))
                .await
                .unwrap(),
            Verdict::Reject
        );
    }

    #[test]
    fn params_from_json() {
        let params = serde_json::from_value::<WhitelistParams>(serde_json::json!({
            "from": ["regexp:.*@doe\\.com"],
        }))
        .unwrap();
        assert!(params.to.is_none());
        assert!(serde_json::from_value::<WhitelistParams>(serde_json::json!({
            "senders": [],
        }))
        .is_err());
    }
}
