use crate::{FixedSchedulePolicy, PlaceholderPolicy, Policy};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Process-wide immutable `service_name -> Policy` mapping.
///
/// Built once at the composition root and shared via `Arc` into every worker;
/// there is no interior mutability because policies never change at runtime.
#[derive(Clone)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, Arc<dyn Policy>>,
}

impl PolicyRegistry {
    /// The default registry: RRSM's concrete schedule, plus registered
    /// placeholders for ESM and EMSC so the scheduler can look up any
    /// service name uniformly.
    pub fn default_registry() -> Self {
        let mut policies: BTreeMap<String, Arc<dyn Policy>> = BTreeMap::new();
        let rrsm = FixedSchedulePolicy::rrsm();
        policies.insert(rrsm.service_name().to_string(), Arc::new(rrsm));
        for svc in ["ESM", "EMSC"] {
            policies.insert(svc.to_string(), Arc::new(PlaceholderPolicy::new(svc)));
        }
        Self { policies }
    }

    pub fn get(&self, service: &str) -> Option<Arc<dyn Policy>> {
        self.policies.get(service).cloned()
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_rrsm_esm_emsc() {
        let r = PolicyRegistry::default_registry();
        assert!(r.get("RRSM").is_some());
        assert!(r.get("ESM").is_some());
        assert!(r.get("EMSC").is_some());
        assert!(r.get("UNKNOWN").is_none());
    }
}
