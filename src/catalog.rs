//! Sensor catalog and system configuration.
//!
//! The catalog is the set of sensor names rules are allowed to reference.
//! It is built once at compiler startup from the system configuration
//! document and never mutated afterwards.
//!
//! Recognized configuration keys:
//!
//! | Key | Effect |
//! |---|---|
//! | `version` | informational |
//! | `validSensors` | sensor names; duplicates deduplicated silently |
//! | `cycleTime` | emitted evaluator's poll interval (ms) |
//! | `bufferCapacity` | default temporal-buffer size (samples) |
//!
//! Anything else in the document is ignored.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::CompileError;

/// Poll interval used when the configuration does not specify `cycleTime`.
pub const DEFAULT_CYCLE_TIME_MS: u64 = 100;

// --- Catalog -----------------------------------------------------------------

/// Immutable set of valid sensor names.
#[derive(Debug, Clone, Default)]
pub struct SensorCatalog {
    sensors: BTreeSet<String>,
}

impl SensorCatalog {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        SensorCatalog { sensors: names.into_iter().collect() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sensors.contains(name)
    }

    pub fn all(&self) -> &BTreeSet<String> {
        &self.sensors
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

// --- System configuration ----------------------------------------------------

/// Wire shape of the system configuration document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemConfigDoc {
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    valid_sensors: Option<Vec<String>>,
    #[serde(default)]
    cycle_time: Option<u64>,
    #[serde(default)]
    buffer_capacity: Option<usize>,
}

/// Loaded system configuration.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub version: Option<i64>,
    /// Deduplicated sensor names, in first-seen order.
    pub valid_sensors: Vec<String>,
    pub cycle_time_ms: u64,
    /// Per-installation override for the derived buffer capacity.
    pub buffer_capacity: Option<usize>,
}

impl SystemConfig {
    /// Load and validate a configuration document.
    ///
    /// Fails with a config error when the document is not valid YAML or when
    /// `validSensors` is absent (compiling without a catalog is meaningless).
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text).map_err(|msg| CompileError::Config(format!("{}: {msg}", path.display())))
    }

    /// Parse a configuration document from text.
    pub fn from_str(text: &str) -> Result<Self, String> {
        let doc: SystemConfigDoc = serde_yaml::from_str(text).map_err(|err| err.to_string())?;

        let raw = doc.valid_sensors.ok_or("missing required key `validSensors`")?;
        let mut seen = BTreeSet::new();
        let mut valid_sensors = Vec::with_capacity(raw.len());
        for name in raw {
            if seen.insert(name.clone()) {
                valid_sensors.push(name);
            }
        }

        Ok(SystemConfig {
            version: doc.version,
            valid_sensors,
            cycle_time_ms: doc.cycle_time.unwrap_or(DEFAULT_CYCLE_TIME_MS),
            buffer_capacity: doc.buffer_capacity,
        })
    }

    /// Build the immutable catalog from this configuration.
    pub fn catalog(&self) -> SensorCatalog {
        SensorCatalog::new(self.valid_sensors.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let cfg = SystemConfig::from_str(
            "version: 3\nvalidSensors:\n  - temperature_f\n  - temperature_c\ncycleTime: 250\nbufferCapacity: 64\n",
        )
        .unwrap();

        assert_eq!(cfg.version, Some(3));
        assert_eq!(cfg.valid_sensors, vec!["temperature_f", "temperature_c"]);
        assert_eq!(cfg.cycle_time_ms, 250);
        assert_eq!(cfg.buffer_capacity, Some(64));

        let catalog = cfg.catalog();
        assert!(catalog.contains("temperature_f"));
        assert!(!catalog.contains("humidity"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn deduplicates_sensors_silently() {
        let cfg = SystemConfig::from_str("validSensors: [a, b, a, c, b]\n").unwrap();
        assert_eq!(cfg.valid_sensors, vec!["a", "b", "c"]);
    }

    #[test]
    fn applies_defaults() {
        let cfg = SystemConfig::from_str("validSensors: [a]\n").unwrap();
        assert_eq!(cfg.cycle_time_ms, DEFAULT_CYCLE_TIME_MS);
        assert_eq!(cfg.buffer_capacity, None);
        assert_eq!(cfg.version, None);
    }

    #[test]
    fn ignores_unknown_keys() {
        let cfg = SystemConfig::from_str("validSensors: [a]\nredisConnection: localhost\nretries: 3\n").unwrap();
        assert_eq!(cfg.valid_sensors, vec!["a"]);
    }

    #[test]
    fn missing_valid_sensors_is_an_error() {
        let err = SystemConfig::from_str("cycleTime: 100\n").unwrap_err();
        assert!(err.contains("validSensors"), "unexpected message: {err}");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(SystemConfig::from_str("validSensors: [a\n").is_err());
    }
}
