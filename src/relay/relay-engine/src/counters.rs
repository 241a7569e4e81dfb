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

/// Outcome counted by the router.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CounterKey {
    /// A message dispatched to the processors of a flow.
    Accepted {
        ///
        flow: String,
    },
    /// A connection, authentication, sender, recipient or message refused.
    Rejected,
    /// A processor failed.
    Error {
        ///
        flow: String,
        ///
        output: String,
    },
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted { flow } => write!(f, "accepted{{flow={flow}}}"),
            Self::Rejected => f.write_str("rejected"),
            Self::Error { flow, output } => write!(f, "error{{flow={flow},output={output}}}"),
        }
    }
}

/// In-memory counters, shared by every session.
#[derive(Debug, Default)]
pub struct Counters {
    inner: std::sync::Mutex<std::collections::BTreeMap<CounterKey, u64>>,
}

impl Counters {
    pub(crate) fn increment(&self, key: CounterKey) {
        tracing::trace!(counter = %key, "Counter incremented.");
        *self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(key)
            .or_insert(0) += 1;
    }

    /// Copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> std::collections::BTreeMap<CounterKey, u64> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Value of one counter, `0` if never incremented.
    #[must_use]
    pub fn get(&self, key: &CounterKey) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or_default()
    }
}
