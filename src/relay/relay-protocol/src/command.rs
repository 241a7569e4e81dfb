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

use relay_common::auth::Mechanism;

/// Buffer received from the client.
pub struct UnparsedArgs(pub Vec<u8>);
pub(crate) type Command<Verb, Args> = (Verb, Args);

/// Information received from the client at the connection TCP/IP.
pub struct AcceptArgs {
    /// Peer address of the connection.
    pub client_addr: std::net::SocketAddr,
    /// Address of the server which accepted the connection.
    pub server_addr: std::net::SocketAddr,
}

/// Information received from the client at the HELO command.
pub struct HeloArgs {
    /// Name of the client.
    pub client_name: String,
}

/// Information received from the client at the EHLO command.
pub struct EhloArgs {
    /// Name of the client, a domain or an address literal.
    pub client_name: String,
}

/// Information received from the client at the MAIL FROM command.
pub struct MailFromArgs {
    /// Sender address, `None` for the null reverse path `<>`.
    pub reverse_path: Option<String>,
    /// ESMTP parameters following the path, such as `BODY=8BITMIME`.
    pub parameters: Vec<String>,
}

/// Information received from the client at the RCPT TO command.
pub struct RcptToArgs {
    /// Recipient address.
    pub forward_path: String,
    /// ESMTP parameters following the path.
    pub parameters: Vec<String>,
}

/// Information received from the client at the AUTH command.
pub struct AuthArgs {
    /// Authentication mechanism.
    pub mechanism: Mechanism,
    /// First buffer of the challenge, optionally issued by the client.
    /// [`base64`] encoded buffer.
    pub initial_response: Option<Vec<u8>>,
}

/// Error while parsing the arguments of a command.
#[derive(Debug, thiserror::Error)]
pub enum ParseArgsError {
    /// Non-UTF8 buffer.
    #[error("invalid utf8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Invalid IP address.
    #[error("invalid ip address: {0}")]
    BadTypeAddr(#[from] std::net::AddrParseError),
    /// The command line is longer than allowed.
    #[error("command line is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// The SASL mechanism is not known.
    #[error("unknown authentication mechanism: {0}")]
    UnknownMechanism(String),
    /// Other
    #[error("invalid arguments")]
    InvalidArgs,
}

fn strip_crlf(value: &[u8]) -> Result<&[u8], ParseArgsError> {
    value.strip_suffix(b"\r\n").ok_or(ParseArgsError::InvalidArgs)
}

fn trim_ascii(slice: &[u8]) -> &[u8] {
    let start = slice
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(slice.len());
    let end = slice
        .iter()
        .rposition(|c| !c.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &slice[start..end]
}

/// Parse `<path> [parameters...]`, `<>` producing an empty path.
fn parse_path(value: &[u8]) -> Result<(String, Vec<String>), ParseArgsError> {
    let value = String::from_utf8(trim_ascii(strip_crlf(value)?).to_vec())?;

    let rest = value.strip_prefix('<').ok_or(ParseArgsError::InvalidArgs)?;
    let (path, parameters) = rest.split_once('>').ok_or(ParseArgsError::InvalidArgs)?;

    if !(parameters.is_empty() || parameters.starts_with(' ')) {
        return Err(ParseArgsError::InvalidArgs);
    }

    Ok((
        path.to_string(),
        parameters.split_whitespace().map(str::to_string).collect(),
    ))
}

impl TryFrom<UnparsedArgs> for HeloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let client_name = String::from_utf8(trim_ascii(strip_crlf(&value.0)?).to_vec())?;
        if client_name.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }

        Ok(Self { client_name })
    }
}

impl TryFrom<UnparsedArgs> for EhloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = String::from_utf8(trim_ascii(strip_crlf(&value.0)?).to_vec())?;

        match &value {
            ipv6 if ipv6.to_lowercase().starts_with("[ipv6:") && ipv6.ends_with(']') => {
                ipv6["[IPv6:".len()..ipv6.len() - 1].parse::<std::net::Ipv6Addr>()?;
            }
            ipv4 if ipv4.starts_with('[') && ipv4.ends_with(']') => {
                ipv4[1..ipv4.len() - 1].parse::<std::net::Ipv4Addr>()?;
            }
            domain => {
                addr::parse_domain_name(domain).map_err(|_| ParseArgsError::InvalidArgs)?;
            }
        };

        Ok(Self { client_name: value })
    }
}

impl TryFrom<UnparsedArgs> for AuthArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = trim_ascii(strip_crlf(&value.0)?);

        let (mechanism, initial_response) = match value
            .iter()
            .position(u8::is_ascii_whitespace)
        {
            Some(idx) => {
                let (mechanism, initial_response) = value.split_at(idx);
                (
                    mechanism.to_vec(),
                    Some(trim_ascii(initial_response).to_vec()),
                )
            }
            None => (value.to_vec(), None),
        };

        let mechanism = String::from_utf8(mechanism)?;
        if mechanism.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }

        Ok(Self {
            mechanism: mechanism
                .parse()
                .map_err(|_| ParseArgsError::UnknownMechanism(mechanism))?,
            initial_response,
        })
    }
}

impl TryFrom<UnparsedArgs> for MailFromArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (path, parameters) = parse_path(&value.0)?;

        Ok(Self {
            reverse_path: if path.is_empty() { None } else { Some(path) },
            parameters,
        })
    }
}

impl TryFrom<UnparsedArgs> for RcptToArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (forward_path, parameters) = parse_path(&value.0)?;
        if forward_path.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }

        Ok(Self {
            forward_path,
            parameters,
        })
    }
}

/// SMTP Command.
#[derive(Debug, strum::AsRefStr, strum::EnumString, strum::EnumVariantNames)]
pub enum Verb {
    /// Used to identify the SMTP client to the SMTP server. (historical)
    #[strum(serialize = "HELO ")]
    Helo,
    /// Used to identify the SMTP client to the SMTP server and request smtp extensions.
    #[strum(serialize = "EHLO ")]
    Ehlo,
    /// Initiate a mail transaction.
    #[strum(serialize = "MAIL FROM:")]
    MailFrom,
    /// Identify an individual recipient of the mail data.
    #[strum(serialize = "RCPT TO:")]
    RcptTo,
    /// This command causes the mail data to be appended to the mail data
    /// buffer.
    #[strum(serialize = "DATA\r\n")]
    Data,
    /// The receiver MUST send a "221 OK" reply, and then close the transmission channel.
    #[strum(serialize = "QUIT\r\n")]
    Quit,
    /// Abort the current mail transaction.
    #[strum(serialize = "RSET\r\n")]
    Rset,
    /// Ask the server for some help.
    #[strum(serialize = "HELP")]
    Help,
    /// This command does not affect any parameters or previously entered
    /// commands.
    #[strum(serialize = "NOOP\r\n")]
    Noop,
    /// Authentication with SASL protocol
    /// <https://datatracker.ietf.org/doc/html/rfc4954>
    #[strum(serialize = "AUTH ")]
    Auth,
    /// Any other buffer received while expecting a command is considered an
    /// unknown.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::{AuthArgs, EhloArgs, HeloArgs, MailFromArgs, ParseArgsError, RcptToArgs, UnparsedArgs};
    use relay_common::auth::Mechanism;

    fn args(input: &str) -> UnparsedArgs {
        UnparsedArgs(input.as_bytes().to_vec())
    }

    #[rstest::rstest]
    #[case("<john@doe.com>\r\n", Some("john@doe.com"), &[])]
    #[case(" <john@doe.com>\r\n", Some("john@doe.com"), &[])]
    #[case("<>\r\n", None, &[])]
    #[case("<john@doe.com> BODY=8BITMIME SIZE=1024\r\n", Some("john@doe.com"), &["BODY=8BITMIME", "SIZE=1024"])]
    fn mail_from(
        #[case] input: &str,
        #[case] reverse_path: Option<&str>,
        #[case] parameters: &[&str],
    ) {
        let parsed = MailFromArgs::try_from(args(input)).unwrap();
        pretty_assertions::assert_eq!(parsed.reverse_path.as_deref(), reverse_path);
        pretty_assertions::assert_eq!(parsed.parameters, parameters);
    }

    #[rstest::rstest]
    #[case("john@doe.com\r\n")]
    #[case("<john@doe.com\r\n")]
    #[case("<john@doe.com>BODY=8BITMIME\r\n")]
    #[case("<john@doe.com>")]
    fn mail_from_invalid(#[case] input: &str) {
        assert!(matches!(
            MailFromArgs::try_from(args(input)),
            Err(ParseArgsError::InvalidArgs)
        ));
    }

    #[test]
    fn rcpt_to() {
        pretty_assertions::assert_eq!(
            RcptToArgs::try_from(args("<jane@doe.com>\r\n"))
                .unwrap()
                .forward_path,
            "jane@doe.com"
        );
        assert!(RcptToArgs::try_from(args("<>\r\n")).is_err());
    }

    #[rstest::rstest]
    #[case("foo.bar\r\n", true)]
    #[case("[127.0.0.1]\r\n", true)]
    #[case("[IPv6:::1]\r\n", true)]
    #[case("[127.0.0.1.5]\r\n", false)]
    #[case("foo bar\r\n", false)]
    fn ehlo(#[case] input: &str, #[case] valid: bool) {
        pretty_assertions::assert_eq!(EhloArgs::try_from(args(input)).is_ok(), valid);
    }

    #[test]
    fn helo() {
        pretty_assertions::assert_eq!(
            HeloArgs::try_from(args("client.tld\r\n")).unwrap().client_name,
            "client.tld"
        );
        assert!(HeloArgs::try_from(args("\r\n")).is_err());
    }

    #[test]
    fn auth() {
        let parsed = AuthArgs::try_from(args("PLAIN AGZvbwBiYXI=\r\n")).unwrap();
        pretty_assertions::assert_eq!(parsed.mechanism, Mechanism::Plain);
        pretty_assertions::assert_eq!(parsed.initial_response, Some(b"AGZvbwBiYXI=".to_vec()));

        let parsed = AuthArgs::try_from(args("login\r\n")).unwrap();
        pretty_assertions::assert_eq!(parsed.mechanism, Mechanism::Login);
        pretty_assertions::assert_eq!(parsed.initial_response, None);

        assert!(matches!(
            AuthArgs::try_from(args("CRAM-MD5\r\n")),
            Err(ParseArgsError::UnknownMechanism(mechanism)) if mechanism == "CRAM-MD5"
        ));
    }
}
