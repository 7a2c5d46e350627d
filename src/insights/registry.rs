use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;

use super::types::InsightModule;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Insight {id}@{version} is already registered")]
    DuplicateRegistration { id: String, version: String },

    #[error("Insight {id}@{version} is not registered")]
    NotRegistered { id: String, version: String },

    #[error("Invalid insight version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("Insight {id}@{version} factory produced {actual_id}@{actual_version}")]
    IdentityMismatch {
        id: String,
        version: String,
        actual_id: String,
        actual_version: String,
    },

    #[error("Registry lock poisoned")]
    LockFailed,
}

type ModuleFactory = Box<dyn Fn() -> Arc<dyn InsightModule> + Send + Sync>;

struct Registration {
    factory: ModuleFactory,
    instance: OnceLock<Arc<dyn InsightModule>>,
}

/// Parsed `MAJOR.MINOR.PATCH`; pre-release suffixes are not accepted.
pub fn parse_version(version: &str) -> Result<(u64, u64, u64), RegistryError> {
    let invalid = || RegistryError::InvalidVersion(version.to_string());
    let mut parts = version.split('.').map(|p| p.parse::<u64>().map_err(|_| invalid()));
    let major = parts.next().ok_or_else(invalid)??;
    let minor = parts.next().ok_or_else(invalid)??;
    let patch = parts.next().ok_or_else(invalid)??;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((major, minor, patch))
}

/// Versioned insight module registry.
///
/// Populated explicitly at start-up (see [`super::register_builtin_modules`]).
/// Instances are created on first lookup and shared afterwards, one per
/// `(id, version)`.
#[derive(Default)]
pub struct InsightRegistry {
    entries: RwLock<HashMap<(String, String), Arc<Registration>>>,
}

impl InsightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M, F>(&self, id: &str, version: &str, factory: F) -> Result<(), RegistryError>
    where
        M: InsightModule + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        parse_version(version)?;
        let mut entries = self.entries.write().map_err(|_| RegistryError::LockFailed)?;
        let key = (id.to_string(), version.to_string());
        if entries.contains_key(&key) {
            return Err(RegistryError::DuplicateRegistration {
                id: key.0,
                version: key.1,
            });
        }
        let factory: ModuleFactory = Box::new(move || Arc::new(factory()) as Arc<dyn InsightModule>);
        entries.insert(
            key,
            Arc::new(Registration {
                factory,
                instance: OnceLock::new(),
            }),
        );
        tracing::debug!(insight = id, version, "Registered insight module");
        Ok(())
    }

    pub fn get(&self, id: &str, version: &str) -> Result<Arc<dyn InsightModule>, RegistryError> {
        let registration = {
            let entries = self.entries.read().map_err(|_| RegistryError::LockFailed)?;
            entries
                .get(&(id.to_string(), version.to_string()))
                .cloned()
                .ok_or_else(|| RegistryError::NotRegistered {
                    id: id.to_string(),
                    version: version.to_string(),
                })?
        };
        let module = Arc::clone(registration.instance.get_or_init(|| (registration.factory)()));
        if module.id() != id || module.version() != version {
            return Err(RegistryError::IdentityMismatch {
                id: id.to_string(),
                version: version.to_string(),
                actual_id: module.id().to_string(),
                actual_version: module.version().to_string(),
            });
        }
        Ok(module)
    }

    /// Every registered module, ordered by id then ascending version.
    pub fn get_all(&self) -> Result<Vec<Arc<dyn InsightModule>>, RegistryError> {
        self.keys()?
            .iter()
            .map(|(id, version)| self.get(id, version))
            .collect()
    }

    /// Registered versions of `id`, ascending.
    pub fn list_versions(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::LockFailed)?;
        let mut versions: Vec<String> = entries
            .keys()
            .filter(|(key_id, _)| key_id == id)
            .map(|(_, v)| v.clone())
            .collect();
        versions.sort_by_key(|v| parse_version(v).unwrap_or_default());
        Ok(versions)
    }

    pub fn is_registered(&self, id: &str, version: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(&(id.to_string(), version.to_string())))
            .unwrap_or(false)
    }

    pub fn assert_registered(&self, id: &str, version: &str) -> Result<(), RegistryError> {
        if self.is_registered(id, version) {
            Ok(())
        } else {
            Err(RegistryError::NotRegistered {
                id: id.to_string(),
                version: version.to_string(),
            })
        }
    }

    pub fn keys(&self) -> Result<Vec<(String, String)>, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::LockFailed)?;
        let mut keys: Vec<(String, String)> = entries.keys().cloned().collect();
        keys.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| parse_version(&a.1).unwrap_or_default().cmp(&parse_version(&b.1).unwrap_or_default()))
        });
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::insights::modules::{InsulinResistanceModule, LipidRatiosModule};
    use crate::insights::types::InsightResult;
    use crate::models::enums::InsightCategory;
    use crate::models::AnalysisContext;

    struct VersionedModule(&'static str);

    impl InsightModule for VersionedModule {
        fn id(&self) -> &str {
            "versioned"
        }
        fn version(&self) -> &str {
            self.0
        }
        fn category(&self) -> InsightCategory {
            InsightCategory::Metabolic
        }
        fn required_biomarkers(&self) -> &[&str] {
            &[]
        }
        fn analyze(&self, _context: &AnalysisContext) -> Vec<InsightResult> {
            Vec::new()
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = InsightRegistry::new();
        registry
            .register("insulin_resistance", "1.0.0", InsulinResistanceModule::new)
            .unwrap();
        let err = registry
            .register("insulin_resistance", "1.0.0", InsulinResistanceModule::new)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_lookup_fails() {
        let registry = InsightRegistry::new();
        let err = registry.get("lipid_ratios", "1.0.0").err().unwrap();
        assert!(matches!(err, RegistryError::NotRegistered { .. }));
        assert!(registry.assert_registered("lipid_ratios", "1.0.0").is_err());
    }

    #[test]
    fn instance_is_created_once() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let registry = InsightRegistry::new();
        registry
            .register("lipid_ratios", "1.0.0", || {
                BUILT.fetch_add(1, Ordering::SeqCst);
                LipidRatiosModule::new()
            })
            .unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
        let a = registry.get("lipid_ratios", "1.0.0").unwrap();
        let b = registry.get("lipid_ratios", "1.0.0").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn versions_sort_numerically() {
        let registry = InsightRegistry::new();
        for v in ["1.10.0", "1.2.0", "0.9.1"] {
            registry.register("versioned", v, move || VersionedModule(v)).unwrap();
        }
        assert_eq!(registry.list_versions("versioned").unwrap(), vec!["0.9.1", "1.2.0", "1.10.0"]);
        assert_eq!(registry.get_all().unwrap().len(), 3);
        assert!(registry.is_registered("versioned", "1.2.0"));
    }

    #[test]
    fn invalid_version_rejected() {
        let registry = InsightRegistry::new();
        let err = registry
            .register("versioned", "1.0", || VersionedModule("1.0"))
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidVersion("1.0".into()));
        assert!(parse_version("1.0.0-beta").is_err());
    }

    #[test]
    fn factory_identity_is_checked() {
        let registry = InsightRegistry::new();
        registry
            .register("versioned", "2.0.0", || VersionedModule("1.0.0"))
            .unwrap();
        let err = registry.get("versioned", "2.0.0").err().unwrap();
        assert!(matches!(err, RegistryError::IdentityMismatch { .. }));
    }
}
