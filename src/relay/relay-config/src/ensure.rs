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
    config::field::{FieldComponent, FieldServerSMTP},
    Config,
};
use relay_common::{CodeID, Reply, ReplyCode};

fn name_components(flow: &str, components: &mut [FieldComponent]) -> anyhow::Result<()> {
    for (index, component) in components.iter_mut().enumerate() {
        anyhow::ensure!(
            !component.r#type.is_empty(),
            "flow `{flow}`: component #{index} has an empty type"
        );
        component
            .name
            .get_or_insert_with(|| format!("{}_{index}", component.r#type));
    }

    let mut names = components
        .iter()
        .map(FieldComponent::name)
        .collect::<Vec<_>>();
    names.sort_unstable();
    if let Some(duplicate) = names.windows(2).find(|pair| pair[0] == pair[1]) {
        anyhow::bail!("flow `{flow}`: component `{}` is defined twice", duplicate[0]);
    }

    Ok(())
}

impl Config {
    /// Complete the reply dictionary: default values for the missing entries,
    /// `{name}` substituted, and the EHLO reply generated.
    pub(crate) fn complete_codes(&mut self) {
        let name = self.server.name.clone();
        let default_values = FieldServerSMTP::default_smtp_codes();
        let reply_codes = &mut self.server.smtp.codes;

        for (key, value) in default_values {
            reply_codes.entry(key).or_insert(value);
        }
        for reply in reply_codes.values_mut() {
            *reply = reply.format(&[("name", name.as_str())]);
        }

        let mechanisms = &self.server.smtp.auth.mechanisms;
        let ehlo = [
            Some(name),
            Some("8BITMIME".to_string()),
            Some("SMTPUTF8".to_string()),
            (!mechanisms.is_empty()).then(|| {
                format!(
                    "AUTH {}",
                    mechanisms
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            }),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        reply_codes.insert(
            CodeID::Ehlo,
            Reply::new_multiline(ReplyCode::Code { code: 250 }, ehlo),
        );
    }

    pub(crate) fn ensure(mut self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !self.server.interfaces.addr.is_empty(),
            "At least one interface must be listened"
        );
        anyhow::ensure!(
            self.server.client_count_max == -1 || self.server.client_count_max > 0,
            "`server.client_count_max` must be positive or -1"
        );
        anyhow::ensure!(
            !self.cache.path.is_empty(),
            "`cache.path` must not be empty"
        );

        for (name, flow) in &mut self.flows.0 {
            anyhow::ensure!(!name.is_empty(), "a flow has an empty name");
            name_components(name, &mut flow.filters)?;
            name_components(name, &mut flow.outputs)?;
        }

        self.complete_codes();
        Ok(self)
    }
}
