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

use crate::{ParsedMail, ParserError, ParserResult};

/// An abstract mail parser
pub trait MailParser: Default {
    /// Return a [`ParsedMail`] from the lines of a message, without their terminator.
    ///
    /// # Errors
    ///
    /// * the input is not compliant
    fn parse_sync(&mut self, raw: Vec<String>) -> ParserResult<ParsedMail>;

    /// Parse a message as read from the body cache.
    ///
    /// # Errors
    ///
    /// * the input is not valid utf8
    /// * see [`MailParser::parse_sync`]
    fn parse_bytes(&mut self, raw: &[u8]) -> ParserResult<ParsedMail> {
        let raw =
            std::str::from_utf8(raw).map_err(|error| ParserError::InvalidUtf8(error.valid_up_to()))?;

        self.parse_sync(
            raw.split_terminator('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect(),
        )
    }
}
