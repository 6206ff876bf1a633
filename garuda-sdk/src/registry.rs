//! The SDK Library: a process-wide registry mapping REST names to entity
//! factories, grouped into named bundles so a server can host more than one
//! generated SDK side by side (e.g. a stable API and a beta one) without the
//! operations pipeline needing to know which bundle a request belongs to.

use crate::entity::EntityInstance;
use crate::error::SdkError;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

type Factory = Arc<dyn Fn() -> EntityInstance + Send + Sync>;

/// A named collection of entity factories, keyed by REST name.
#[derive(Clone)]
pub struct SdkBundle {
    name: String,
    factories: DashMap<String, Factory>,
}

impl SdkBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a default-constructible entity type under `rest_name`.
    pub fn register<F>(&self, rest_name: impl Into<String>, factory: F)
    where
        F: Fn() -> EntityInstance + Send + Sync + 'static,
    {
        self.factories.insert(rest_name.into(), Arc::new(factory));
    }

    /// Constructs a fresh, empty instance of the entity type registered
    /// under `rest_name`.
    pub fn instantiate(&self, rest_name: &str) -> Result<EntityInstance, SdkError> {
        self.factories
            .get(rest_name)
            .map(|factory| factory())
            .ok_or_else(|| SdkError::EntityTypeNotFound {
                rest_name: rest_name.to_string(),
            })
    }

    pub fn has(&self, rest_name: &str) -> bool {
        self.factories.contains_key(rest_name)
    }
}

/// The process-wide registry of [`SdkBundle`]s. Exactly one `SdkLibrary`
/// exists per process; it is populated once at startup (typically from
/// `CoreController::new`) and read from many tasks concurrently afterward.
pub struct SdkLibrary {
    bundles: DashMap<String, SdkBundle>,
    default_bundle: String,
}

impl SdkLibrary {
    pub fn new(default_bundle: impl Into<String>) -> Self {
        Self {
            bundles: DashMap::new(),
            default_bundle: default_bundle.into(),
        }
    }

    pub fn register_bundle(&self, bundle: SdkBundle) {
        self.bundles.insert(bundle.name().to_string(), bundle);
    }

    pub fn bundle(&self, name: &str) -> Option<SdkBundle> {
        self.bundles.get(name).map(|b| b.clone())
    }

    pub fn default_bundle(&self) -> Result<SdkBundle, SdkError> {
        self.bundle(&self.default_bundle)
            .ok_or_else(|| SdkError::BundleNotFound {
                name: self.default_bundle.clone(),
            })
    }

    /// Resolves an entity type against the default bundle. Servers hosting a
    /// single SDK (the common case) use this exclusively.
    pub fn instantiate(&self, rest_name: &str) -> Result<EntityInstance, SdkError> {
        self.default_bundle()?.instantiate(rest_name)
    }
}

/// Returns the process-wide [`SdkLibrary`], initializing it on first access.
/// Installing bundles after the first call still works (the cell holds the
/// library, not a frozen snapshot of its bundles).
pub fn global() -> &'static SdkLibrary {
    static LIBRARY: OnceLock<SdkLibrary> = OnceLock::new();
    LIBRARY.get_or_init(|| SdkLibrary::new("default"))
}
