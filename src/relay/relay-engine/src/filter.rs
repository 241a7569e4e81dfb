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

use relay_common::{auth::Credentials, Address, Session, StateKey, Verdict};

/// Access given to a filter hook: the session, and the state owned by this
/// filter instance.
///
/// The state is keyed by `(flow, filter)`, two instances of the same filter
/// never see each other's values.
pub struct HookContext<'a> {
    session: &'a mut Session,
    key: &'a StateKey,
}

impl<'a> HookContext<'a> {
    ///
    pub fn new(session: &'a mut Session, key: &'a StateKey) -> Self {
        Self { session, key }
    }

    ///
    #[must_use]
    pub fn session(&self) -> &Session {
        &*self.session
    }

    ///
    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Identity of the filter instance being run.
    #[must_use]
    pub fn key(&self) -> &StateKey {
        self.key
    }

    /// See [`Session::state`].
    #[must_use]
    pub fn state<T: std::any::Any>(&self) -> Option<&T> {
        self.session.state(self.key)
    }

    /// See [`Session::state_mut`].
    pub fn state_mut<T: std::any::Any>(&mut self) -> Option<&mut T> {
        self.session.state_mut(self.key)
    }

    /// See [`Session::set_state`].
    pub fn set_state<T: std::any::Any + Send + Sync>(&mut self, value: T) {
        self.session.set_state(self.key.clone(), value);
    }

    /// See [`Session::take_state`].
    pub fn take_state<T: std::any::Any>(&mut self) -> Option<T> {
        self.session.take_state(self.key)
    }
}

/// A component voting on the admission of its flow.
///
/// Every hook defaults to [`Verdict::Abstain`]. Returning an error is a fault,
/// counted as a [`Verdict::Reject`] by the router.
#[async_trait::async_trait]
pub trait Filter: Send + Sync {
    /// A client connected.
    async fn on_connect(&self, _ctx: &mut HookContext<'_>) -> anyhow::Result<Verdict> {
        Ok(Verdict::Abstain)
    }

    /// The client completed a SASL exchange.
    async fn on_auth(
        &self,
        _credentials: &Credentials,
        _ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Ok(Verdict::Abstain)
    }

    /// `MAIL FROM`, `None` for the null reverse path.
    async fn on_mail_from(
        &self,
        _address: Option<&Address>,
        _ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Ok(Verdict::Abstain)
    }

    /// `RCPT TO`, called once per recipient.
    async fn on_rcpt_to(
        &self,
        _address: &Address,
        _ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        Ok(Verdict::Abstain)
    }

    /// The message has been persisted at `session.body_path` and parsed in
    /// `session.message`.
    async fn on_data(&self, _ctx: &mut HookContext<'_>) -> anyhow::Result<Verdict> {
        Ok(Verdict::Abstain)
    }
}

/// The protocol events a filter votes on.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Event<'a> {
    Connect,
    Auth(&'a Credentials),
    MailFrom(Option<&'a Address>),
    RcptTo(&'a Address),
    Data,
}

impl Event<'_> {
    pub(crate) async fn call(
        self,
        filter: &dyn Filter,
        ctx: &mut HookContext<'_>,
    ) -> anyhow::Result<Verdict> {
        match self {
            Event::Connect => filter.on_connect(ctx).await,
            Event::Auth(credentials) => filter.on_auth(credentials, ctx).await,
            Event::MailFrom(address) => filter.on_mail_from(address, ctx).await,
            Event::RcptTo(address) => filter.on_rcpt_to(address, ctx).await,
            Event::Data => filter.on_data(ctx).await,
        }
    }
}

impl std::fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Event::Connect => "connect",
            Event::Auth(_) => "auth",
            Event::MailFrom(_) => "mail_from",
            Event::RcptTo(_) => "rcpt_to",
            Event::Data => "data",
        })
    }
}
