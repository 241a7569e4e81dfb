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

/// Answer of a filter hook for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[must_use]
pub enum Verdict {
    /// The filter admits the flow for this event.
    Accept,
    /// The filter vetoes the flow for this event.
    Reject,
    /// The filter has no opinion, the next filter is evaluated.
    Abstain,
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Self::Accept
        } else {
            Self::Reject
        }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Abstain, Self::from)
    }
}

/// Admission state of one flow in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    /// No filter took a definitive position yet.
    Pending,
    /// A sufficient vote has been cast.
    Accepted,
    /// Rejected by the last event that evaluated it. The next event can admit it again.
    Rejected,
}

impl FlowState {
    /// Is the flow still a candidate for the message.
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Recipient checkpoint: a flow nobody admitted explicitly is dropped.
    #[must_use]
    pub const fn settle(self) -> Self {
        match self {
            Self::Pending => Self::Rejected,
            otherwise => otherwise,
        }
    }
}

/// How the votes of the filters of a flow are combined.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, serde::Deserialize, serde::Serialize,
)]
pub enum Operator {
    /// Every filter with an opinion must accept.
    #[default]
    #[serde(rename = "AND")]
    #[strum(serialize = "AND")]
    And,
    /// One accepting filter is enough.
    #[serde(rename = "OR")]
    #[strum(serialize = "OR")]
    Or,
}

impl Operator {
    /// An `OR` flow already accepted is not evaluated anymore.
    #[must_use]
    pub const fn skips(self, state: FlowState) -> bool {
        matches!((self, state), (Self::Or, FlowState::Accepted))
    }

    /// Apply the verdict of one filter to the state of the flow.
    ///
    /// Returns the new state, and `true` if the remaining filters of the flow
    /// must not be evaluated for this event.
    #[must_use]
    pub const fn vote(self, state: FlowState, verdict: Verdict) -> (FlowState, bool) {
        match (self, verdict) {
            (_, Verdict::Abstain) | (Self::Or, Verdict::Reject) => (state, false),
            (Self::Or, Verdict::Accept) => (FlowState::Accepted, true),
            (Self::And, Verdict::Accept) => (FlowState::Accepted, false),
            (Self::And, Verdict::Reject) => (FlowState::Rejected, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FlowState, Operator, Verdict};

    #[rstest::rstest]
    #[case(Operator::And, FlowState::Pending, Verdict::Abstain, (FlowState::Pending, false))]
    #[case(Operator::And, FlowState::Pending, Verdict::Accept, (FlowState::Accepted, false))]
    #[case(Operator::And, FlowState::Accepted, Verdict::Reject, (FlowState::Rejected, true))]
    #[case(Operator::And, FlowState::Rejected, Verdict::Accept, (FlowState::Accepted, false))]
    #[case(Operator::And, FlowState::Rejected, Verdict::Abstain, (FlowState::Rejected, false))]
    #[case(Operator::Or, FlowState::Pending, Verdict::Reject, (FlowState::Pending, false))]
    #[case(Operator::Or, FlowState::Pending, Verdict::Accept, (FlowState::Accepted, true))]
    #[case(Operator::Or, FlowState::Rejected, Verdict::Reject, (FlowState::Rejected, false))]
    #[case(Operator::Or, FlowState::Rejected, Verdict::Accept, (FlowState::Accepted, true))]
    fn transition(
        #[case] operator: Operator,
        #[case] state: FlowState,
        #[case] verdict: Verdict,
        #[case] expected: (FlowState, bool),
    ) {
        pretty_assertions::assert_eq!(operator.vote(state, verdict), expected);
    }

    #[test]
    fn or_accepted_is_skipped() {
        assert!(Operator::Or.skips(FlowState::Accepted));
        assert!(!Operator::Or.skips(FlowState::Rejected));
        assert!(!Operator::And.skips(FlowState::Accepted));
    }

    #[test]
    fn settle() {
        pretty_assertions::assert_eq!(FlowState::Pending.settle(), FlowState::Rejected);
        pretty_assertions::assert_eq!(FlowState::Accepted.settle(), FlowState::Accepted);
        assert!(!FlowState::Rejected.is_live());
    }

    #[test]
    fn verdict_from_option() {
        pretty_assertions::assert_eq!(Verdict::from(None), Verdict::Abstain);
        pretty_assertions::assert_eq!(Verdict::from(Some(true)), Verdict::Accept);
        pretty_assertions::assert_eq!(Verdict::from(Some(false)), Verdict::Reject);
    }

    #[test]
    fn operator_serde() {
        pretty_assertions::assert_eq!(
            serde_json::from_str::<Operator>(r#""OR""#).unwrap(),
            Operator::Or
        );
        pretty_assertions::assert_eq!(Operator::default(), Operator::And);
    }
}
