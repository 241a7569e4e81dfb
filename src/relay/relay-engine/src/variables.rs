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

use relay_common::Session;

const ISO8601_COMPACT: &[time::format_description::FormatItem<'_>] = time::macros::format_description!(
    "[year][month][day]T[hour][minute][second][subsecond digits:3]Z"
);

fn value(name: &str, session: &Session) -> Option<String> {
    let timestamp = session.timestamp.to_offset(time::UtcOffset::UTC);
    let message = session.message.as_ref();

    Some(match name {
        "timestamp" => (timestamp.unix_timestamp_nanos() / 1_000_000).to_string(),
        "iso8601" => timestamp.format(ISO8601_COMPACT).unwrap_or_default(),
        "id" => session.id.to_string(),
        "sequence" => session.sequence.to_string(),
        "messageId" => message
            .and_then(|message| message.message_id())
            .unwrap_or_default()
            .to_string(),
        "from" => session
            .envelope
            .mail_from
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        "subject" => message
            .and_then(|message| message.subject())
            .unwrap_or_default()
            .to_string(),
        "to" => session
            .envelope
            .rcpt_to
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        _ => return None,
    })
}

/// A value cannot add a path component: separators are replaced by `_`, and so
/// is a value made of dots only.
fn escape_path_component(value: String) -> String {
    if !value.is_empty() && value.chars().all(|c| c == '.') {
        return "_".repeat(value.len());
    }
    if value.contains(is_separator) {
        return value.replace(is_separator, "_");
    }
    value
}

const fn is_separator(c: char) -> bool {
    matches!(c, '/' | '\\' | '\0')
}

fn expand(template: &str, session: &Session, escape: fn(String) -> String) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let placeholder = &rest[start..];

        match placeholder.find('}') {
            Some(end) => {
                match value(&placeholder[2..end], session) {
                    Some(value) => output.push_str(&escape(value)),
                    None => output.push_str(&placeholder[..=end]),
                }
                rest = &placeholder[end + 1..];
            }
            None => {
                output.push_str(placeholder);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

/// Substitute the `${variable}` placeholders of `template` with values of the session.
///
/// | variable        | value                                               |
/// |-----------------|-----------------------------------------------------|
/// | `${timestamp}`  | connection time, milliseconds since the unix epoch |
/// | `${iso8601}`    | connection time in UTC, as `20230102T030405678Z`    |
/// | `${id}`         | connection identifier                               |
/// | `${sequence}`   | number of the message in the connection, from 1     |
/// | `${messageId}`  | `Message-ID` of the message, without `<>`           |
/// | `${from}`       | envelope sender                                     |
/// | `${subject}`    | subject of the message                              |
/// | `${to}`         | envelope recipients, comma separated                |
///
/// The template is read once: placeholders inside the values are not expanded.
/// Unknown placeholders are left untouched, missing values are empty.
#[must_use]
pub fn replace_variables(template: &str, session: &Session) -> String {
    expand(template, session, std::convert::identity)
}

/// [`replace_variables`] for a file path: a value never introduces a directory,
/// `/` and `\` are replaced by `_`, as are values made of dots only.
#[must_use]
pub fn replace_path_variables(template: &str, session: &Session) -> std::path::PathBuf {
    expand(template, session, escape_path_component).into()
}

#[cfg(test)]
mod tests {
    use super::{replace_path_variables, replace_variables};
    use relay_common::{addr, Session};
    use relay_mail_parser::ParsedMail;

    fn session() -> Session {
        let mut session = Session::new(
            "127.0.0.1:49152".parse().unwrap(),
            "127.0.0.1:10025".parse().unwrap(),
            "relay.test",
            ["main"],
        );
        session.id = "5c2a0e4e-8c8d-4b5f-9a57-64b6d0c5a1f0".parse().unwrap();
        session.timestamp = time::macros::datetime!(2023-01-02 03:04:05.678 UTC);
        session
    }

    #[test]
    fn connection_variables() {
        let session = session();
        pretty_assertions::assert_eq!(
            replace_variables(".email_${iso8601}.eml", &session),
            ".email_20230102T030405678Z.eml"
        );
        pretty_assertions::assert_eq!(
            replace_variables("${timestamp}-${id}", &session),
            "1672628645678-5c2a0e4e-8c8d-4b5f-9a57-64b6d0c5a1f0"
        );
    }

    #[test]
    fn transaction_variables() {
        let mut session = session();
        session.envelope.mail_from = Some(addr!("john@doe.com"));
        session.envelope.rcpt_to = vec![addr!("a@x.com"), addr!("b@x.com")];
        session.message = Some(ParsedMail {
            headers: vec![
                ("Subject".to_string(), "Hello".to_string()),
                ("Message-ID".to_string(), "<abc@doe.com>".to_string()),
            ],
            body: String::new(),
        });

        pretty_assertions::assert_eq!(
            replace_variables("${from}|${to}|${subject}|${messageId}", &session),
            "john@doe.com|a@x.com,b@x.com|Hello|abc@doe.com"
        );
    }

    #[test]
    fn missing_values_are_empty() {
        pretty_assertions::assert_eq!(
            replace_variables("[${from}][${to}][${subject}][${unknown}]", &session()),
            "[][][][${unknown}]"
        );
    }

    #[test]
    fn values_are_not_expanded_again() {
        let mut session = session();
        session.envelope.rcpt_to = vec![addr!("a@x.com")];
        session.message = Some(ParsedMail {
            headers: vec![("Subject".to_string(), "see ${to} and ${id".to_string())],
            body: String::new(),
        });

        pretty_assertions::assert_eq!(
            replace_variables("${subject}|${to}", &session),
            "see ${to} and ${id|a@x.com"
        );
    }

    #[rstest::rstest]
    #[case("../../etc/passwd", "out/.._.._etc_passwd.eml")]
    #[case("..", "out/__.eml")]
    #[case("a\\b", "out/a_b.eml")]
    #[case("plain", "out/plain.eml")]
    fn path_values_stay_in_their_component(#[case] subject: &str, #[case] expected: &str) {
        let mut session = session();
        session.message = Some(ParsedMail {
            headers: vec![("Subject".to_string(), subject.to_string())],
            body: String::new(),
        });

        pretty_assertions::assert_eq!(
            replace_path_variables("out/${subject}.eml", &session),
            std::path::PathBuf::from(expected)
        );
    }

    #[test]
    fn sequence() {
        let mut session = session();
        session.sequence = 2;
        pretty_assertions::assert_eq!(
            replace_variables("${id}_${sequence}", &session),
            "5c2a0e4e-8c8d-4b5f-9a57-64b6d0c5a1f0_2"
        );
    }
}
