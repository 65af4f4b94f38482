use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

use super::backend::DetectorBackend;
use super::backends::{BrightSpotBackend, ScriptedBackend, StubBackend};

/// Named detector backends, of which the tracking loop takes exactly one.
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DetectorBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registry holding every backend the settings can build.
    ///
    /// `scripted` is only registered when a script path is configured.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(BrightSpotBackend::new(settings.threshold));
        registry.register(StubBackend::new());
        if let Some(path) = &settings.script_path {
            registry.register(ScriptedBackend::from_path(path)?);
        }
        Ok(registry)
    }

    /// Register a backend under its own name, replacing any earlier one.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        self.backends.insert(backend.name().to_string(), Box::new(backend));
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove and return a backend by name.
    pub fn take(&mut self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        self.backends.remove(name).ok_or_else(|| {
            anyhow!(
                "detector backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
