use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("material {0:?} already registered with different metadata")]
    DuplicateDefinition(String),

    #[error("no contact rule for pair and no default rule set")]
    MissingDefaultRule,
}

/// Opaque handle for a registered surface material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

/// Optional per-material metadata. Contact parameters live in pairwise
/// rules, not here; this only tags the surface for effect handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Sound id played by impact listeners when this surface is struck.
    pub sound: Option<String>,
}

/// Friction/restitution parameters for one unordered material pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactRule {
    pub friction: f64,
    pub restitution: f64,
}

impl ContactRule {
    /// Out-of-range values are clamped rather than rejected so a transient
    /// bad configuration never turns into per-frame failures.
    pub fn new(friction: f64, restitution: f64) -> Self {
        Self {
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }
}

struct MaterialEntry {
    name: String,
    desc: MaterialDesc,
}

/// Named surface materials plus pairwise contact rules.
///
/// At most one rule exists per unordered pair; re-registering a pair
/// overwrites the previous rule.
#[derive(Default)]
pub struct MaterialRegistry {
    materials: Vec<MaterialEntry>,
    by_name: HashMap<String, MaterialId>,
    rules: HashMap<(MaterialId, MaterialId), ContactRule>,
    default_rule: Option<ContactRule>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a material by name. Idempotent: an existing name returns
    /// the existing id as long as the metadata is compatible (unset or
    /// equal).
    pub fn register(&mut self, name: &str) -> Result<MaterialId, RegistryError> {
        self.register_with(name, MaterialDesc::default())
    }

    pub fn register_with(
        &mut self,
        name: &str,
        desc: MaterialDesc,
    ) -> Result<MaterialId, RegistryError> {
        if let Some(&id) = self.by_name.get(name) {
            let existing = &mut self.materials[id.0 as usize];
            if desc == MaterialDesc::default() || desc == existing.desc {
                return Ok(id);
            }
            if existing.desc == MaterialDesc::default() {
                existing.desc = desc;
                return Ok(id);
            }
            return Err(RegistryError::DuplicateDefinition(name.to_string()));
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(MaterialEntry {
            name: name.to_string(),
            desc,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn name(&self, id: MaterialId) -> Option<&str> {
        self.materials.get(id.0 as usize).map(|m| m.name.as_str())
    }

    pub fn sound_tag(&self, id: MaterialId) -> Option<&str> {
        self.materials
            .get(id.0 as usize)
            .and_then(|m| m.desc.sound.as_deref())
    }

    /// Registers the rule for an unordered pair, replacing any prior rule.
    pub fn register_contact_rule(&mut self, a: MaterialId, b: MaterialId, rule: ContactRule) {
        self.rules.insert(pair_key(a, b), ContactRule::new(rule.friction, rule.restitution));
    }

    /// Rule applied when no specific pair has been registered.
    pub fn set_default_rule(&mut self, rule: ContactRule) {
        self.default_rule = Some(ContactRule::new(rule.friction, rule.restitution));
    }

    pub fn resolve(&self, a: MaterialId, b: MaterialId) -> Result<ContactRule, RegistryError> {
        self.rules
            .get(&pair_key(a, b))
            .copied()
            .or(self.default_rule)
            .ok_or(RegistryError::MissingDefaultRule)
    }
}

fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register("steel").unwrap();
        let b = registry.register("steel").unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.name(a), Some("steel"));
    }

    #[test]
    fn test_incompatible_metadata_conflicts() {
        let mut registry = MaterialRegistry::new();
        registry
            .register_with("steel", MaterialDesc { sound: Some("clang".into()) })
            .unwrap();
        // Plain re-registration dedups.
        assert!(registry.register("steel").is_ok());
        // A different tag does not.
        let err = registry
            .register_with("steel", MaterialDesc { sound: Some("thud".into()) })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDefinition(_)));
    }

    #[test]
    fn test_metadata_upgrade_from_default() {
        let mut registry = MaterialRegistry::new();
        let id = registry.register("wood").unwrap();
        registry
            .register_with("wood", MaterialDesc { sound: Some("knock".into()) })
            .unwrap();
        assert_eq!(registry.sound_tag(id), Some("knock"));
    }

    #[test]
    fn test_rule_replacement_wins() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register("cube").unwrap();
        let b = registry.register("floor").unwrap();
        registry.register_contact_rule(a, b, ContactRule::new(0.5, 0.2));
        registry.register_contact_rule(b, a, ContactRule::new(0.1, 0.7));
        let rule = registry.resolve(a, b).unwrap();
        assert_eq!(rule.friction, 0.1);
        assert_eq!(rule.restitution, 0.7);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register("a").unwrap();
        let b = registry.register("b").unwrap();
        assert!(matches!(registry.resolve(a, b), Err(RegistryError::MissingDefaultRule)));
        registry.set_default_rule(ContactRule::new(0.3, 0.0));
        assert_eq!(registry.resolve(a, b).unwrap().friction, 0.3);
    }

    #[test]
    fn test_rule_values_clamped() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register("a").unwrap();
        let b = registry.register("b").unwrap();
        registry.register_contact_rule(a, b, ContactRule::new(-1.0, 3.0));
        let rule = registry.resolve(a, b).unwrap();
        assert_eq!(rule.friction, 0.0);
        assert_eq!(rule.restitution, 1.0);
    }
}
