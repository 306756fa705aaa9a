use std::sync::RwLock;

use prometheus::{Encoder, Registry, TextEncoder};

use crate::global::GlobalMetrics;
use crate::per_validator::PerValidatorMetrics;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("label schema already frozen as {existing:?}, cannot register {attempted:?}")]
    SchemaConflict {
        existing: Vec<String>,
        attempted: Vec<String>,
    },
}

/// Owned by the orchestrator and injected into each probe (§9 "Global mutable metrics state").
///
/// The per-validator label schema is unknown until the first successful, non-empty watched-set
/// load; [`MetricsRegistry::init_per_validator_schema`] is the "first-time-seen" hook every
/// probe consults before touching a per-validator family. Subsequent calls with the same schema
/// are no-ops; a call with a different schema is refused (I4).
pub struct MetricsRegistry {
    registry: Registry,
    pub global: GlobalMetrics,
    per_validator: RwLock<Option<PerValidatorMetrics>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();
        let global = GlobalMetrics::register(&registry);
        Self {
            registry,
            global,
            per_validator: RwLock::new(None),
        }
    }

    /// Idempotent one-shot initialiser (§4.5, §9). `label_keys` is the labels file's key
    /// schema, sorted for deterministic label ordering.
    pub fn init_per_validator_schema(&self, label_keys: &[String]) -> Result<(), MetricsError> {
        let mut sorted = label_keys.to_vec();
        sorted.sort();

        let guard = self.per_validator.read().expect("lock not poisoned");
        if let Some(existing) = guard.as_ref() {
            return if existing.schema() == sorted.as_slice() {
                Ok(())
            } else {
                Err(MetricsError::SchemaConflict {
                    existing: existing.schema().to_vec(),
                    attempted: sorted,
                })
            };
        }
        drop(guard);

        let mut guard = self.per_validator.write().expect("lock not poisoned");
        // Re-check: another caller may have initialised between the read and write lock.
        if guard.is_none() {
            *guard = Some(PerValidatorMetrics::register(&self.registry, &sorted));
        }
        Ok(())
    }

    /// `None` until [`Self::init_per_validator_schema`] has been called at least once (B3).
    pub fn per_validator(&self) -> Option<std::sync::RwLockReadGuard<'_, Option<PerValidatorMetrics>>> {
        let guard = self.per_validator.read().expect("lock not poisoned");
        if guard.is_some() {
            Some(guard)
        } else {
            None
        }
    }

    /// The Prometheus text-exposition payload served on the scrape endpoint (§6).
    pub fn encode(&self) -> Vec<u8> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .expect("text encoding never fails for well-formed metric families");
        buffer
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_none_before_first_load() {
        let registry = MetricsRegistry::new();
        assert!(registry.per_validator().is_none());
    }

    #[test]
    fn repeated_same_schema_is_a_no_op() {
        let registry = MetricsRegistry::new();
        registry
            .init_per_validator_schema(&["team".to_owned()])
            .unwrap();
        registry
            .init_per_validator_schema(&["team".to_owned()])
            .unwrap();
        assert!(registry.per_validator().is_some());
    }

    #[test]
    fn conflicting_schema_is_rejected() {
        let registry = MetricsRegistry::new();
        registry
            .init_per_validator_schema(&["team".to_owned()])
            .unwrap();
        let err = registry
            .init_per_validator_schema(&["other".to_owned()])
            .unwrap_err();
        assert!(matches!(err, MetricsError::SchemaConflict { .. }));
    }

    #[test]
    fn encode_includes_global_metric_names() {
        let registry = MetricsRegistry::new();
        registry.global.bad_relay_count.inc();
        let text = String::from_utf8(registry.encode()).unwrap();
        assert!(text.contains("bad_relay_count"));
    }
}
