//! Instrument registry with name uniqueness and text exposition.
//!
//! Wraps a `prometheus_client` [`Registry`]. Registration happens during
//! startup; afterwards the registry is only read by [`MetricsRegistry::snapshot`],
//! while observations go straight to the (atomic) instrument handles.

use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::{Metric, Registry};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;

/// Content type of the OpenMetrics text exposition produced by [`MetricsRegistry::snapshot`].
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Errors raised by the metrics registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric '{0}' is already registered")]
    DuplicateName(String),

    #[error("failed to encode metrics: {0}")]
    Render(#[from] std::fmt::Error),
}

/// A rendered point-in-time view of every registered instrument.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Encoded metric families.
    pub body: String,
    /// Content type describing `body`.
    pub content_type: &'static str,
}

/// Owns the set of registered instruments.
pub struct MetricsRegistry {
    inner: RwLock<RegistryInner>,
}

struct RegistryInner {
    registry: Registry,
    names: HashSet<String>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                registry: Registry::default(),
                names: HashSet::new(),
            }),
        }
    }

    /// Register an instrument under `name`.
    ///
    /// Counters are exposed with a `_total` suffix appended by the encoder,
    /// so a counter registered as `http_requests` is scraped as
    /// `http_requests_total`.
    pub fn register(
        &self,
        name: &str,
        help: &str,
        metric: impl Metric,
    ) -> Result<(), MetricsError> {
        let mut inner = self.inner.write();
        let RegistryInner { registry, names } = &mut *inner;

        claim(names, name.to_string())?;
        registry.register(name, help, metric);
        Ok(())
    }

    /// Register a group of instruments sharing a name prefix and a constant label.
    ///
    /// Uniqueness is checked against the fully prefixed names.
    pub fn register_group<F>(
        &self,
        prefix: &str,
        label: (&str, &str),
        build: F,
    ) -> Result<(), MetricsError>
    where
        F: FnOnce(&mut GroupRegistrar<'_>) -> Result<(), MetricsError>,
    {
        let mut inner = self.inner.write();
        let RegistryInner { registry, names } = &mut *inner;

        let sub_registry = registry
            .sub_registry_with_prefix(prefix)
            .sub_registry_with_label((
                Cow::Owned(label.0.to_string()),
                Cow::Owned(label.1.to_string()),
            ));

        let mut registrar = GroupRegistrar {
            prefix,
            registry: sub_registry,
            names,
        };
        build(&mut registrar)
    }

    /// Whether an instrument with the given (fully prefixed) name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().names.contains(name)
    }

    /// Number of registered instruments.
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    /// Whether no instrument has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every registered instrument.
    ///
    /// Only a read lock is taken; concurrent observations proceed on the
    /// instruments' own atomics.
    pub fn snapshot(&self) -> Result<Snapshot, MetricsError> {
        let inner = self.inner.read();
        let mut body = String::new();
        encode(&mut body, &inner.registry)?;

        Ok(Snapshot {
            body,
            content_type: OPENMETRICS_CONTENT_TYPE,
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers instruments into a prefixed, labelled group.
pub struct GroupRegistrar<'a> {
    prefix: &'a str,
    registry: &'a mut Registry,
    names: &'a mut HashSet<String>,
}

impl GroupRegistrar<'_> {
    /// Register an instrument; it is exposed as `<prefix>_<name>`.
    pub fn register(
        &mut self,
        name: &str,
        help: &str,
        metric: impl Metric,
    ) -> Result<(), MetricsError> {
        claim(self.names, format!("{}_{}", self.prefix, name))?;
        self.registry.register(name, help, metric);
        Ok(())
    }
}

fn claim(names: &mut HashSet<String>, name: String) -> Result<(), MetricsError> {
    if names.contains(&name) {
        return Err(MetricsError::DuplicateName(name));
    }
    names.insert(name);
    Ok(())
}
