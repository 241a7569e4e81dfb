//! smtp-relay flow admission engine
//!
//! A [`Router`] holds the configured [`Flow`]s. For every event of an SMTP
//! session it runs the [`Filter`]s of each flow and records the outcome in the
//! [`relay_common::Session`]. Once a message is received, the [`Processor`]s of
//! every flow that admitted it are run by [`Router::dispatch`].
//!
//! Filters and processors are built from the configuration by the type tag of
//! each component, see [`Registry`].

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

mod counters;
mod filter;
mod flow;
mod processor;
mod registry;
mod router;
mod variables;

pub use counters::{CounterKey, Counters};
pub use filter::{Filter, HookContext};
pub use flow::{Flow, FlowFilter, FlowOutput};
pub use processor::{Processor, ProcessorOutcome};
pub use registry::{BuildArgs, FilterRegistry, ProcessorRegistry, Registry, RegistryError};
pub use router::{Admission, Router};
pub use variables::{replace_path_variables, replace_variables};
