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

use crate::{MailHeaders, MailParser, ParsedMail, ParserError, ParserResult};

/// Split the header section from the body, unfolding the headers.
///
/// The body is kept as is. A line which is neither a header nor a continuation
/// starts the body even without the blank separator line.
#[derive(Default)]
pub struct BasicParser;

impl MailParser for BasicParser {
    fn parse_sync(&mut self, raw: Vec<String>) -> ParserResult<ParsedMail> {
        let mut headers = MailHeaders::new();
        let mut stream = raw.into_iter().peekable();

        while let Some(line) = stream.peek() {
            if line.is_empty() {
                stream.next();
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let (_, value) = headers.last_mut().ok_or_else(|| {
                    ParserError::InvalidMail(format!(
                        "continuation line without a header: {line:?}"
                    ))
                })?;
                value.push(' ');
                value.push_str(line.trim_start());
            } else if let Some((name, value)) = line.split_once(':') {
                if name.is_empty() || name.contains(char::is_whitespace) {
                    break;
                }
                headers.push((name.to_string(), value.trim().to_string()));
            } else {
                break;
            }

            stream.next();
        }

        let body = stream.fold(String::new(), |mut body, line| {
            body.push_str(&line);
            body.push_str("\r\n");
            body
        });

        tracing::trace!(headers = headers.len(), body = body.len(), "Message parsed.");

        Ok(ParsedMail { headers, body })
    }
}
