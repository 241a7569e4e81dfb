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

use crate::{HeaderRule, HeaderRules};

/// Longest incomplete line kept in memory while reading the header block.
pub const MAX_PENDING_LINE: usize = 64 * 1024;

/// Error produced while rewriting the headers of a stream.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A header line did not end before [`MAX_PENDING_LINE`] bytes.
    #[error("header line longer than {limit} bytes")]
    LineTooLong {
        ///
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Headers,
    Body,
}

/// Rewrite the header block of a message while it is streamed.
///
/// Bytes are fed in chunks of any size with [`HeaderTransform::push`], and the
/// output does not depend on how the input was split. Once the blank line
/// ending the header block is seen, the rest of the input is copied as is.
#[derive(Debug)]
pub struct HeaderTransform<'a> {
    rules: &'a HeaderRules,
    phase: Phase,
    pending: Vec<u8>,
    unseen: Vec<&'a str>,
    dropping: bool,
}

impl<'a> HeaderTransform<'a> {
    ///
    #[must_use]
    pub fn new(rules: &'a HeaderRules) -> Self {
        Self {
            rules,
            phase: Phase::Headers,
            pending: Vec::new(),
            unseen: rules
                .iter()
                .filter_map(|rule| match rule {
                    HeaderRule::Upsert { name, .. } => Some(name.as_str()),
                    HeaderRule::Append { .. } | HeaderRule::Remove { .. } => None,
                })
                .collect(),
            dropping: false,
        }
    }

    /// Has the end of the header block been reached.
    #[must_use]
    pub fn in_body(&self) -> bool {
        self.phase == Phase::Body
    }

    /// Feed the next chunk of the input, the output is appended to `out`.
    ///
    /// # Errors
    ///
    /// * an incomplete header line exceeds [`MAX_PENDING_LINE`]
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        let mut rest = chunk;

        while self.phase == Phase::Headers && !rest.is_empty() {
            if let Some(end) = rest.iter().position(|b| *b == b'\n') {
                self.pending.extend_from_slice(&rest[..=end]);
                rest = &rest[end + 1..];

                let line = std::mem::take(&mut self.pending);
                self.on_line(&line, out);
            } else {
                self.pending.extend_from_slice(rest);
                rest = &[];

                if self.pending.len() > MAX_PENDING_LINE {
                    return Err(TransformError::LineTooLong {
                        limit: MAX_PENDING_LINE,
                    });
                }
            }
        }

        out.extend_from_slice(rest);
        Ok(())
    }

    /// Signal the end of the input, flushing what is still buffered to `out`.
    ///
    /// If the input ended inside the header block, the last fragment is
    /// terminated with `\r\n` and the synthesized headers are written after it.
    pub fn finish(mut self, out: &mut Vec<u8>) {
        if self.phase == Phase::Body {
            return;
        }

        if !self.pending.is_empty() {
            let mut line = std::mem::take(&mut self.pending);
            line.extend_from_slice(b"\r\n");
            self.on_line(&line, out);
        }

        if self.phase == Phase::Headers {
            self.synthesize(b"\r\n", out);
        }
    }

    fn on_line(&mut self, line: &[u8], out: &mut Vec<u8>) {
        let content = line.strip_suffix(b"\n").unwrap_or(line);
        let content = content.strip_suffix(b"\r").unwrap_or(content);

        if content.is_empty() {
            self.synthesize(&line[content.len()..], out);
            out.extend_from_slice(line);
            self.phase = Phase::Body;
            tracing::trace!("End of the header block.");
            return;
        }

        if matches!(content.first(), Some(b' ' | b'\t')) {
            if !self.dropping {
                out.extend_from_slice(line);
            }
            return;
        }

        self.dropping = false;
        if let Some(colon) = content.iter().position(|b| *b == b':') {
            let name = &content[..colon];
            let name = &name[..name
                .iter()
                .rposition(|b| !b.is_ascii_whitespace())
                .map_or(0, |last| last + 1)];

            self.unseen
                .retain(|unseen| !unseen.as_bytes().eq_ignore_ascii_case(name));

            self.dropping = self.rules.iter().any(|rule| {
                matches!(rule, HeaderRule::Remove { name: removed } if removed.as_bytes().eq_ignore_ascii_case(name))
            });
        }

        if self.dropping {
            tracing::trace!(header = %String::from_utf8_lossy(content), "Header removed.");
        } else {
            out.extend_from_slice(line);
        }
    }

    fn synthesize(&self, terminator: &[u8], out: &mut Vec<u8>) {
        for rule in self.rules.iter() {
            let (name, value) = match rule {
                HeaderRule::Append { name, value } => (name, value),
                HeaderRule::Upsert { name, value } if self.unseen.contains(&name.as_str()) => {
                    (name, value)
                }
                HeaderRule::Upsert { .. } | HeaderRule::Remove { .. } => continue,
            };

            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(terminator);
        }
    }
}
