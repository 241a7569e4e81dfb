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

/// we use Vec instead of a HashMap because header ordering is important.
pub type MailHeaders = Vec<(String, String)>;

/// A message as persisted by the relay: an ordered header section and a body.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ParsedMail {
    /// Unfolded headers, in their original order.
    pub headers: MailHeaders,
    /// Everything after the blank separator line, with `\r\n` line endings.
    pub body: String,
}

impl std::fmt::Display for ParsedMail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.headers {
            write!(f, "{key}: {value}\r\n")?;
        }
        f.write_str("\r\n")?;
        f.write_str(&self.body)
    }
}

impl ParsedMail {
    /// get the value of the first header named `name`, case-insensitively.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over the values of every header named `name`.
    pub fn get_headers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    ///
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_header("Subject")
    }

    /// The `Message-ID` header, without the angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.get_header("Message-ID")
            .map(|id| id.trim_start_matches('<').trim_end_matches('>'))
    }

    /// Text of the body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.body
    }
}
