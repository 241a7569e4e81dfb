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

use crate::{Address, FlowState, Stage};
use relay_mail_parser::ParsedMail;

/// Admission state of every configured flow, by flow name.
pub type FlowStates = std::collections::BTreeMap<String, FlowState>;

/// Identify the state owned by one filter instance of one flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    flow: String,
    filter: String,
}

impl StateKey {
    ///
    #[must_use]
    pub fn new(flow: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            filter: filter.into(),
        }
    }

    ///
    #[must_use]
    pub fn flow(&self) -> &str {
        &self.flow
    }

    ///
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.flow, self.filter)
    }
}

/// Sender and recipients of the current transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Envelope {
    /// `None` before MAIL FROM and for the null reverse path `<>`.
    pub mail_from: Option<Address>,
    /// Accepted recipients, in the order of the RCPT TO commands.
    pub rcpt_to: Vec<Address>,
}

/// Everything known about one SMTP connection.
///
/// Created when the connection is accepted and dropped when it closes.
/// The transaction part is reset by [`Session::reset_transaction`].
#[derive(Debug)]
pub struct Session {
    /// Unique identifier of the connection.
    pub id: uuid::Uuid,
    /// Peer address.
    pub client_addr: std::net::SocketAddr,
    /// Local address the client connected to.
    pub server_addr: std::net::SocketAddr,
    /// Name of the server, as announced in the greetings.
    pub server_name: String,
    /// Time of the connection.
    pub timestamp: time::OffsetDateTime,
    /// Argument of the HELO/EHLO command.
    pub client_name: Option<String>,
    /// Name of the peer found by a reverse DNS lookup of its address.
    pub client_hostname: Option<String>,
    /// Messages received on the connection, the one being received included.
    pub sequence: u64,
    /// Progress of the transaction.
    pub stage: Stage,
    ///
    pub envelope: Envelope,
    /// Username of the last successful authentication.
    pub identity: Option<String>,
    /// Location of the persisted body of the message.
    pub body_path: Option<std::path::PathBuf>,
    /// The message, parsed once persisted.
    pub message: Option<ParsedMail>,
    /// Free-form values shared between the components of a session.
    pub context: std::collections::HashMap<String, serde_json::Value>,
    flows: FlowStates,
    baseline: FlowStates,
    state: std::collections::HashMap<StateKey, Box<dyn std::any::Any + Send + Sync>>,
}

impl Session {
    /// Open a session where every flow of `flows` is [`FlowState::Pending`].
    #[must_use]
    pub fn new<'a>(
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
        server_name: impl Into<String>,
        flows: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let flows = flows
            .into_iter()
            .map(|name| (name.to_string(), FlowState::Pending))
            .collect::<FlowStates>();

        Self {
            id: uuid::Uuid::new_v4(),
            client_addr,
            server_addr,
            server_name: server_name.into(),
            timestamp: time::OffsetDateTime::now_utc(),
            client_name: None,
            client_hostname: None,
            sequence: 0,
            stage: Stage::Connect,
            envelope: Envelope::default(),
            identity: None,
            body_path: None,
            message: None,
            context: std::collections::HashMap::new(),
            baseline: flows.clone(),
            flows,
            state: std::collections::HashMap::new(),
        }
    }

    /// Admission state of a flow, `None` if the flow is unknown to this session.
    #[must_use]
    pub fn flow_state(&self, flow: &str) -> Option<FlowState> {
        self.flows.get(flow).copied()
    }

    /// Overwrite the admission state of a flow.
    pub fn set_flow_state(&mut self, flow: &str, state: FlowState) {
        if let Some(current) = self.flows.get_mut(flow) {
            *current = state;
        } else {
            self.flows.insert(flow.to_string(), state);
        }
    }

    /// Iterate over the admission state of every flow.
    pub fn flows(&self) -> impl Iterator<Item = (&str, FlowState)> + '_ {
        self.flows.iter().map(|(name, state)| (name.as_str(), *state))
    }

    /// Names of the flows whose admission concluded in [`FlowState::Accepted`].
    pub fn accepted_flows(&self) -> impl Iterator<Item = &str> + '_ {
        self.flows()
            .filter(|(_, state)| *state == FlowState::Accepted)
            .map(|(name, _)| name)
    }

    /// Is there at least one flow still candidate for the message.
    #[must_use]
    pub fn has_live_flow(&self) -> bool {
        self.flows.values().any(|state| state.is_live())
    }

    /// Copy of the admission map.
    #[must_use]
    pub fn flows_snapshot(&self) -> FlowStates {
        self.flows.clone()
    }

    /// Replace the admission map by a previous snapshot.
    pub fn restore_flows(&mut self, snapshot: FlowStates) {
        self.flows = snapshot;
    }

    /// Remember the admission map as the starting point of every transaction.
    pub fn checkpoint(&mut self) {
        self.baseline = self.flows.clone();
    }

    /// Go back to the state reached after the connect and authenticate events.
    pub fn reset_transaction(&mut self) {
        self.flows = self.baseline.clone();
        self.envelope = Envelope::default();
        self.body_path = None;
        self.message = None;
        self.stage = if self.client_name.is_some() {
            Stage::Helo
        } else {
            Stage::Connect
        };
    }

    /// Get the state stored by a filter instance, if any of type `T`.
    #[must_use]
    pub fn state<T: std::any::Any>(&self, key: &StateKey) -> Option<&T> {
        self.state.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    /// Mutable version of [`Session::state`].
    pub fn state_mut<T: std::any::Any>(&mut self, key: &StateKey) -> Option<&mut T> {
        self.state
            .get_mut(key)
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Store a value for a filter instance, replacing the previous one.
    pub fn set_state<T: std::any::Any + Send + Sync>(&mut self, key: StateKey, value: T) {
        self.state.insert(key, Box::new(value));
    }

    /// Remove and return the state of a filter instance.
    ///
    /// The value is left in place if it is not of type `T`.
    pub fn take_state<T: std::any::Any>(&mut self, key: &StateKey) -> Option<T> {
        match self.state.remove(key)?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.state.insert(key.clone(), value);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, StateKey};
    use crate::{addr, FlowState, Stage};

    fn session() -> Session {
        Session::new(
            "127.0.0.1:49152".parse().unwrap(),
            "127.0.0.1:10025".parse().unwrap(),
            "relay.test",
            ["a", "b"],
        )
    }

    #[test]
    fn every_flow_starts_pending() {
        let session = session();
        pretty_assertions::assert_eq!(
            session.flows().collect::<Vec<_>>(),
            vec![("a", FlowState::Pending), ("b", FlowState::Pending)]
        );
        assert!(session.has_live_flow());
        assert_eq!(session.flow_state("c"), None);
    }

    #[test]
    fn typed_state_is_keyed_by_flow_and_filter() {
        let mut session = session();
        let first = StateKey::new("a", "whitelist_0");
        let second = StateKey::new("b", "whitelist_0");

        session.set_state(first.clone(), 1_u32);
        session.set_state(second.clone(), String::from("foo"));

        assert_eq!(session.state::<u32>(&first), Some(&1));
        assert_eq!(session.state::<u32>(&second), None);
        assert_eq!(session.state::<String>(&second).map(String::as_str), Some("foo"));

        *session.state_mut::<u32>(&first).unwrap() += 1;
        assert_eq!(session.take_state::<String>(&first), None);
        assert_eq!(session.take_state::<u32>(&first), Some(2));
        assert_eq!(session.state::<u32>(&first), None);
    }

    #[test]
    fn reset_goes_back_to_checkpoint() {
        let mut session = session();
        session.set_flow_state("a", FlowState::Accepted);
        session.set_flow_state("b", FlowState::Rejected);
        session.checkpoint();
        session.client_name = Some("client.test".to_string());

        session.set_flow_state("b", FlowState::Accepted);
        session.envelope.mail_from = Some(addr!("john@doe.com"));
        session.envelope.rcpt_to.push(addr!("jane@doe.com"));
        session.stage = Stage::RcptTo;

        session.reset_transaction();

        pretty_assertions::assert_eq!(session.flow_state("b"), Some(FlowState::Rejected));
        pretty_assertions::assert_eq!(session.envelope, super::Envelope::default());
        pretty_assertions::assert_eq!(session.stage, Stage::Helo);
        pretty_assertions::assert_eq!(session.accepted_flows().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn restore_snapshot() {
        let mut session = session();
        let snapshot = session.flows_snapshot();
        session.set_flow_state("a", FlowState::Rejected);
        session.set_flow_state("b", FlowState::Rejected);
        assert!(!session.has_live_flow());

        session.restore_flows(snapshot);
        assert!(session.has_live_flow());
    }
}
