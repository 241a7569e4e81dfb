//! smtp-relay delivery processors

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
#![allow(clippy::module_name_repetitions)]

mod file;
mod log;
mod smtp;

pub use file::{FileParams, FileProcessor};
pub use log::{LogParams, LogProcessor};
pub use smtp::{EnvelopeOverride, SmtpParams, SmtpProcessor};

use relay_engine::ProcessorRegistry;

/// Register the processors of this crate: `file`, `log` and `smtp`.
pub fn register_builtin(registry: &mut ProcessorRegistry) -> &mut ProcessorRegistry {
    registry
        .register("file", |args| {
            Ok(Box::new(FileProcessor::new(args.params()?)?))
        })
        .register("log", |args| Ok(Box::new(LogProcessor::new(args.params()?))))
        .register("smtp", |args| {
            Ok(Box::new(SmtpProcessor::new(args.params()?)?))
        })
}
