//! smtp-relay mail parser and header rewriting

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::use_self)] // false positive with enums

mod mail;

pub use mail::{MailHeaders, ParsedMail};

mod implementation {
    pub mod basic_parser;
}

pub use implementation::basic_parser::BasicParser;

mod traits {
    pub mod error;
    pub mod mail_parser;
}

pub use traits::{
    error::{ParserError, ParserResult},
    mail_parser::MailParser,
};

mod transform {
    pub mod header_transform;
    pub mod rules;
}

pub use transform::{
    header_transform::{HeaderTransform, TransformError, MAX_PENDING_LINE},
    rules::{HeaderRule, HeaderRules},
};
