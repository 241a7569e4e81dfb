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

use crate::{
    counters::{CounterKey, Counters},
    filter::Event,
    Flow, FilterRegistry, HookContext, ProcessorOutcome, ProcessorRegistry, RegistryError,
};
use relay_common::{auth::Credentials, Address, FlowState, Session};
use relay_config::Config;

/// Answer of the router for one event.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Admission {
    /// At least one flow is still a candidate.
    Admitted,
    /// No flow wants the connection, the command or the message.
    Refused,
}

impl Admission {
    ///
    #[must_use]
    pub const fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Run the admission of every flow for the events of a session, and the
/// processors of the admitted flows.
///
/// The router is shared by every session, it does not hold per-session data.
#[derive(Debug, Default)]
pub struct Router {
    flows: Vec<Flow>,
    counters: Counters,
}

impl Router {
    /// A router evaluating `flows` in this order.
    #[must_use]
    pub fn new(flows: Vec<Flow>) -> Self {
        Self {
            flows,
            counters: Counters::default(),
        }
    }

    /// Build every flow of the configuration, in the order of the file.
    ///
    /// # Errors
    ///
    /// * a component type is not registered
    /// * a component refused its parameters
    pub fn from_config(
        config: &Config,
        filters: &FilterRegistry,
        processors: &ProcessorRegistry,
    ) -> Result<Self, RegistryError> {
        let flows = config
            .flows
            .iter()
            .map(|(name, flow)| Flow::from_config(name, flow, filters, processors))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            flows = ?flows.iter().map(Flow::name).collect::<Vec<_>>(),
            "Router initialized."
        );
        Ok(Self::new(flows))
    }

    /// Add a flow, replacing the flow with the same name if any.
    ///
    /// Sessions opened before this call see the new flow as [`FlowState::Pending`].
    pub fn add_flow(&mut self, flow: Flow) -> Option<Flow> {
        if let Some(current) = self.flows.iter_mut().find(|i| i.name() == flow.name()) {
            return Some(std::mem::replace(current, flow));
        }
        self.flows.push(flow);
        None
    }

    /// Remove a flow by name.
    pub fn remove_flow(&mut self, name: &str) -> Option<Flow> {
        let index = self.flows.iter().position(|i| i.name() == name)?;
        Some(self.flows.remove(index))
    }

    /// Flows in evaluation order.
    #[must_use]
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Counters of the outcomes since the router was created.
    #[must_use]
    pub const fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Open a session where every flow is [`FlowState::Pending`].
    #[must_use]
    pub fn new_session(
        &self,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
        server_name: impl Into<String>,
    ) -> Session {
        Session::new(
            client_addr,
            server_addr,
            server_name,
            self.flows.iter().map(Flow::name),
        )
    }

    fn flow_state(session: &Session, flow: &Flow) -> FlowState {
        session.flow_state(flow.name()).unwrap_or(FlowState::Pending)
    }

    fn has_live_flow(&self, session: &Session) -> bool {
        self.flows
            .iter()
            .any(|flow| Self::flow_state(session, flow).is_live())
    }

    fn admission(&self, session: &Session) -> Admission {
        if self.has_live_flow(session) {
            Admission::Admitted
        } else {
            self.counters.increment(CounterKey::Rejected);
            Admission::Refused
        }
    }

    #[tracing::instrument(name = "admission", skip_all, fields(event = %event))]
    async fn run_event(&self, event: Event<'_>, session: &mut Session) {
        for flow in &self.flows {
            let mut state = Self::flow_state(session, flow);
            if flow.operator().skips(state) {
                tracing::trace!(flow = flow.name(), "Already accepted, skipped.");
                continue;
            }

            for instance in flow.filters() {
                let verdict = match event
                    .call(
                        instance.filter.as_ref(),
                        &mut HookContext::new(session, &instance.key),
                    )
                    .await
                {
                    Ok(verdict) => verdict,
                    Err(error) => {
                        tracing::warn!(
                            flow = flow.name(),
                            filter = instance.name(),
                            error = %format!("{error:#}"),
                            "Filter failed, flow rejected for this event."
                        );
                        state = FlowState::Rejected;
                        break;
                    }
                };

                let (next, stop) = flow.operator().vote(state, verdict);
                tracing::trace!(
                    flow = flow.name(),
                    filter = instance.name(),
                    %verdict,
                    from = %state,
                    to = %next,
                );
                state = next;
                if stop {
                    break;
                }
            }

            session.set_flow_state(flow.name(), state);
        }

        tracing::debug!(flows = ?session.flows().collect::<Vec<_>>());
    }

    /// A client connected. When admitted, the result becomes the starting
    /// point of every transaction of the session.
    pub async fn on_connect(&self, session: &mut Session) -> Admission {
        self.run_event(Event::Connect, session).await;

        let admission = self.admission(session);
        if admission.is_admitted() {
            session.checkpoint();
        }
        admission
    }

    /// A client completed a SASL exchange.
    ///
    /// When admitted, the identity is stored in the session and the result becomes
    /// the starting point of every transaction. When refused, the admission map is
    /// left as it was before the attempt.
    pub async fn on_auth(
        &self,
        credentials: &Credentials,
        session: &mut Session,
    ) -> (Admission, String) {
        let snapshot = session.flows_snapshot();
        self.run_event(Event::Auth(credentials), session).await;

        let identity = credentials.identity().to_string();
        let admission = self.admission(session);
        if admission.is_admitted() {
            session.identity = Some(identity.clone());
            session.checkpoint();
        } else {
            session.restore_flows(snapshot);
        }
        (admission, identity)
    }

    /// `MAIL FROM`. When refused, the admission map is left as it was before the command.
    pub async fn on_mail_from(
        &self,
        address: Option<&Address>,
        session: &mut Session,
    ) -> Admission {
        let snapshot = session.flows_snapshot();
        self.run_event(Event::MailFrom(address), session).await;

        let admission = self.admission(session);
        if admission.is_admitted() {
            session.envelope.mail_from = address.cloned();
        } else {
            session.restore_flows(snapshot);
        }
        admission
    }

    /// `RCPT TO`, once per recipient.
    ///
    /// Every flow not explicitly accepted is dropped. If no flow remains, the
    /// recipient is refused and the admission map is restored, the recipients
    /// already accepted are not affected.
    pub async fn on_rcpt_to(&self, address: &Address, session: &mut Session) -> Admission {
        let snapshot = session.flows_snapshot();
        self.run_event(Event::RcptTo(address), session).await;

        for flow in &self.flows {
            let state = Self::flow_state(session, flow);
            session.set_flow_state(flow.name(), state.settle());
        }

        let admission = self.admission(session);
        if admission.is_admitted() {
            session.envelope.rcpt_to.push(address.clone());
        } else {
            session.restore_flows(snapshot);
        }
        admission
    }

    /// The message has been persisted and parsed.
    pub async fn on_data(&self, session: &mut Session) -> Admission {
        self.run_event(Event::Data, session).await;
        self.admission(session)
    }

    /// Run the processors of every accepted flow, flows and processors in order.
    ///
    /// A failing processor is logged and counted, the others still run.
    #[tracing::instrument(name = "dispatch", skip_all)]
    pub async fn dispatch(&self, session: &Session) -> Vec<ProcessorOutcome> {
        let mut outcomes = vec![];

        for flow in self
            .flows
            .iter()
            .filter(|flow| session.flow_state(flow.name()) == Some(FlowState::Accepted))
        {
            self.counters.increment(CounterKey::Accepted {
                flow: flow.name().to_string(),
            });

            for output in flow.outputs() {
                let error = match output.processor.on_mail(session).await {
                    Ok(()) => {
                        tracing::debug!(flow = flow.name(), output = output.name(), "Processed.");
                        None
                    }
                    Err(error) => {
                        let error = format!("{error:#}");
                        tracing::warn!(
                            flow = flow.name(),
                            output = output.name(),
                            %error,
                            "Processor failed."
                        );
                        self.counters.increment(CounterKey::Error {
                            flow: flow.name().to_string(),
                            output: output.name().to_string(),
                        });
                        Some(error)
                    }
                };

                outcomes.push(ProcessorOutcome {
                    flow: flow.name().to_string(),
                    output: output.name().to_string(),
                    error,
                });
            }
        }

        tracing::info!(
            outcomes = outcomes.len(),
            failed = outcomes.iter().filter(|i| !i.is_ok()).count(),
            "Message dispatched."
        );
        outcomes
    }
}
