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

use crate::{Filter, Processor};

/// Error produced while building a component from the configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No constructor is registered for this type.
    #[error("unknown {kind} type `{tag}`")]
    UnknownComponentType {
        /// Family of the component (`filter` or `processor`).
        kind: &'static str,
        /// The type requested.
        tag: String,
    },
    /// The constructor refused the parameters.
    #[error("cannot build {kind} `{flow}/{name}` of type `{tag}`")]
    Construction {
        /// Family of the component (`filter` or `processor`).
        kind: &'static str,
        /// The type requested.
        tag: String,
        /// Flow of the component.
        flow: String,
        /// Name of the component in its flow.
        name: String,
        /// Inner error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// What a constructor receives.
#[derive(Debug, Clone, Copy)]
pub struct BuildArgs<'a> {
    /// Name of the flow owning the component.
    pub flow: &'a str,
    /// Name of the component in its flow.
    pub name: &'a str,
    /// Type specific parameters, a json object.
    pub params: &'a serde_json::Value,
}

impl BuildArgs<'_> {
    /// Deserialize the parameters.
    ///
    /// # Errors
    ///
    /// * the parameters do not match `P`
    pub fn params<P: serde::de::DeserializeOwned>(&self) -> anyhow::Result<P> {
        Ok(P::deserialize(self.params)?)
    }
}

type Constructor<T> = Box<dyn Fn(&BuildArgs<'_>) -> anyhow::Result<Box<T>> + Send + Sync>;

/// Constructors of one family of component, by type tag.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    constructors: std::collections::BTreeMap<String, Constructor<T>>,
}

/// Registry of the [`Filter`] types.
pub type FilterRegistry = Registry<dyn Filter>;
/// Registry of the [`Processor`] types.
pub type ProcessorRegistry = Registry<dyn Processor>;

impl Registry<dyn Filter> {
    /// An empty registry of filters.
    #[must_use]
    pub fn filters() -> Self {
        Self::new("filter")
    }
}

impl Registry<dyn Processor> {
    /// An empty registry of processors.
    #[must_use]
    pub fn processors() -> Self {
        Self::new("processor")
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized> Registry<T> {
    /// An empty registry, `kind` naming the family in the errors.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: std::collections::BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one with the same tag.
    pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&BuildArgs<'_>) -> anyhow::Result<Box<T>> + Send + Sync + 'static,
    {
        let tag = tag.into();
        tracing::trace!(kind = self.kind, %tag, "Registering constructor.");
        self.constructors.insert(tag, Box::new(constructor));
        self
    }

    ///
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Tags registered, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build an instance of the type `tag`.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::UnknownComponentType`] if `tag` is not registered
    /// * [`RegistryError::Construction`] if the constructor failed
    pub fn build(&self, tag: &str, args: &BuildArgs<'_>) -> Result<Box<T>, RegistryError> {
        let constructor =
            self.constructors
                .get(tag)
                .ok_or_else(|| RegistryError::UnknownComponentType {
                    kind: self.kind,
                    tag: tag.to_string(),
                })?;

        constructor(args).map_err(|error| RegistryError::Construction {
            kind: self.kind,
            tag: tag.to_string(),
            flow: args.flow.to_string(),
            name: args.name.to_string(),
            source: error.into(),
        })
    }
}
