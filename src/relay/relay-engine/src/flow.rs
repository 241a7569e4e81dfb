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

use crate::{BuildArgs, Filter, FilterRegistry, Processor, ProcessorRegistry, RegistryError};
use relay_common::{Operator, StateKey};
use relay_config::field::FieldFlow;

/// A filter instance of a flow.
pub struct FlowFilter {
    pub(crate) key: StateKey,
    pub(crate) filter: Box<dyn Filter>,
}

impl FlowFilter {
    ///
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.filter()
    }
}

/// A processor instance of a flow.
pub struct FlowOutput {
    pub(crate) name: String,
    pub(crate) processor: Box<dyn Processor>,
}

impl FlowOutput {
    ///
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A routing pipeline: ordered filters deciding the admission, ordered
/// processors run on the admitted messages.
pub struct Flow {
    name: String,
    operator: Operator,
    filters: Vec<FlowFilter>,
    outputs: Vec<FlowOutput>,
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("operator", &self.operator)
            .field(
                "filters",
                &self.filters.iter().map(FlowFilter::name).collect::<Vec<_>>(),
            )
            .field(
                "outputs",
                &self.outputs.iter().map(FlowOutput::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Flow {
    /// An empty flow, see [`Flow::with_filter`] and [`Flow::with_output`].
    #[must_use]
    pub fn new(name: impl Into<String>, operator: Operator) -> Self {
        Self {
            name: name.into(),
            operator,
            filters: vec![],
            outputs: vec![],
        }
    }

    /// Append a filter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, filter: Box<dyn Filter>) -> Self {
        self.filters.push(FlowFilter {
            key: StateKey::new(self.name.clone(), name),
            filter,
        });
        self
    }

    /// Append a processor.
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>, processor: Box<dyn Processor>) -> Self {
        self.outputs.push(FlowOutput {
            name: name.into(),
            processor,
        });
        self
    }

    /// Build every component of the flow with the registries.
    ///
    /// # Errors
    ///
    /// * see [`crate::Registry::build`]
    pub fn from_config(
        name: &str,
        config: &FieldFlow,
        filters: &FilterRegistry,
        processors: &ProcessorRegistry,
    ) -> Result<Self, RegistryError> {
        let mut flow = Self::new(name, config.filters_operator);

        for component in &config.filters {
            let params = component.params();
            let filter = filters.build(
                &component.r#type,
                &BuildArgs {
                    flow: name,
                    name: component.name(),
                    params: &params,
                },
            )?;
            flow = flow.with_filter(component.name(), filter);
        }

        for component in &config.outputs {
            let params = component.params();
            let processor = processors.build(
                &component.r#type,
                &BuildArgs {
                    flow: name,
                    name: component.name(),
                    params: &params,
                },
            )?;
            flow = flow.with_output(component.name(), processor);
        }

        tracing::debug!(flow = name, ?flow, "Flow built.");
        Ok(flow)
    }

    ///
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    ///
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Filters in evaluation order.
    #[must_use]
    pub fn filters(&self) -> &[FlowFilter] {
        &self.filters
    }

    /// Processors in dispatch order.
    #[must_use]
    pub fn outputs(&self) -> &[FlowOutput] {
        &self.outputs
    }
}
