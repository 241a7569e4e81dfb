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

use relay_common::Session;
use relay_engine::Processor;

/// Parameters of the `log` processor.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogParams {
    /// Fields of the message to log, any other name is looked up in the headers.
    #[serde(default = "LogParams::default_fields")]
    pub fields: Vec<String>,
}

impl LogParams {
    fn default_fields() -> Vec<String> {
        ["from", "to", "cc", "bcc", "subject", "text"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            fields: Self::default_fields(),
        }
    }
}

/// Log a summary of every message at level `info`.
#[derive(Debug)]
pub struct LogProcessor {
    fields: Vec<String>,
}

fn join(values: impl Iterator<Item = String>) -> Option<String> {
    let values = values.collect::<Vec<_>>();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

impl LogProcessor {
    ///
    #[must_use]
    pub fn new(params: LogParams) -> Self {
        Self {
            fields: params.fields,
        }
    }

    /// Recipients of the envelope absent from the `To` and `Cc` headers.
    fn bcc(session: &Session) -> Option<String> {
        let message = session.message.as_ref()?;
        let visible = message
            .get_headers("To")
            .chain(message.get_headers("Cc"))
            .collect::<Vec<_>>();

        join(
            session
                .envelope
                .rcpt_to
                .iter()
                .filter(|rcpt| !visible.iter().any(|header| header.contains(rcpt.full())))
                .map(ToString::to_string),
        )
    }

    fn field(session: &Session, field: &str) -> Option<String> {
        let message = session.message.as_ref();
        let header = |name: &str| {
            message.and_then(|message| join(message.get_headers(name).map(str::to_string)))
        };

        match field {
            "from" => header("From").or_else(|| {
                session
                    .envelope
                    .mail_from
                    .as_ref()
                    .map(ToString::to_string)
            }),
            "to" => header("To")
                .or_else(|| join(session.envelope.rcpt_to.iter().map(ToString::to_string))),
            "cc" => header("Cc"),
            "bcc" => Self::bcc(session),
            "subject" => header("Subject"),
            "text" => message.map(|message| message.text().to_string()),
            otherwise => header(otherwise),
        }
    }

    /// The block written in the logs.
    #[must_use]
    pub fn render(&self, session: &Session) -> String {
        let separator = "-".repeat(80);
        let now = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();

        let mut content = format!(
            "Email received {now} from {}\n{separator}\n",
            session.client_addr.ip()
        );
        for field in &self.fields {
            if let Some(value) = Self::field(session, field) {
                content.push_str(&format!("{field}: {value}\n"));
            }
        }
        content.push_str(&separator);
        content.push('\n');
        content
    }
}

#[async_trait::async_trait]
impl Processor for LogProcessor {
    async fn on_mail(&self, session: &Session) -> anyhow::Result<()> {
        tracing::info!("{}", self.render(session));
        Ok(())
    }
}
