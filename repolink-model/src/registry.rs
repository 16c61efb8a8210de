//! Wire type name ↔ local type registry.
//!
//! One registry per repository connection. Registration happens at
//! connection setup; afterwards the registry is only read.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::schema::{ContentTypeDescriptor, TypeHandle};

/// Maps repository type names to local type descriptors.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeRegistry {
    names: HashMap<String, TypeHandle>,
    descriptors: HashMap<TypeHandle, Arc<ContentTypeDescriptor>>,
    defaults: HashMap<TypeHandle, String>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under `wire_name`.
    ///
    /// Re-registering a name replaces the previous mapping (last write wins),
    /// so application code can override library defaults.
    pub fn register(&mut self, wire_name: impl Into<String>, descriptor: ContentTypeDescriptor) -> &mut Self {
        let wire_name = wire_name.into();
        let local_type = descriptor.local_type.clone();
        if let Some(previous) = self.names.insert(wire_name.clone(), local_type.clone()) {
            if previous != local_type {
                debug!(wire_name = %wire_name, from = %previous, to = %local_type, "content type registration replaced");
            }
        }
        self.descriptors.insert(local_type, Arc::new(descriptor));
        self
    }

    /// Picks the wire name used for `local_type` when several are registered.
    pub fn set_default_name(&mut self, local_type: &TypeHandle, wire_name: &str) -> ModelResult<()> {
        if self.names.get(wire_name) != Some(local_type) {
            return Err(ModelError::UnknownTypeName(wire_name.to_string()));
        }
        self.defaults.insert(local_type.clone(), wire_name.to_string());
        Ok(())
    }

    pub fn resolve_type(&self, wire_name: &str) -> Option<&TypeHandle> {
        self.names.get(wire_name)
    }

    pub fn descriptor(&self, local_type: &TypeHandle) -> Option<Arc<ContentTypeDescriptor>> {
        self.descriptors.get(local_type).cloned()
    }

    pub fn descriptor_for_name(&self, wire_name: &str) -> Option<Arc<ContentTypeDescriptor>> {
        self.resolve_type(wire_name).and_then(|t| self.descriptor(t))
    }

    /// Every wire name registered for `local_type`, sorted.
    pub fn names_of(&self, local_type: &TypeHandle) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .filter(|(_, t)| *t == local_type)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    /// Resolves the wire name of a local type.
    ///
    /// `None` resolves to the empty string. A type with no registered name
    /// resolves to its own name. Several names without a default is an error
    /// listing all of them.
    pub fn resolve_name(&self, local_type: Option<&TypeHandle>) -> ModelResult<String> {
        let Some(local_type) = local_type else {
            return Ok(String::new());
        };
        let mut names = self.names_of(local_type);
        match names.len() {
            0 => Ok(local_type.name().to_string()),
            1 => Ok(names.remove(0)),
            _ => {
                if let Some(default) = self
                    .defaults
                    .get(local_type)
                    .filter(|n| self.names.get(n.as_str()) == Some(local_type))
                {
                    return Ok(default.clone());
                }
                Err(ModelError::AmbiguousTypeName {
                    local_type: local_type.name().to_string(),
                    names,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Decides whether content of one local type may stand in for another.
///
/// Used when a polymorphic payload names a type that differs from the one
/// the caller asked for.
pub trait TypeComparator: Send + Sync {
    fn is_assignable(&self, registry: &ContentTypeRegistry, candidate: &TypeHandle, target: &TypeHandle) -> bool;
}

/// Walks the `base` chain of registered descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyComparator;

impl TypeComparator for HierarchyComparator {
    fn is_assignable(&self, registry: &ContentTypeRegistry, candidate: &TypeHandle, target: &TypeHandle) -> bool {
        let mut current = Some(candidate.clone());
        // Bounded walk; a misconfigured base cycle cannot loop forever.
        for _ in 0..=registry.descriptors.len() {
            let Some(handle) = current else {
                return false;
            };
            if &handle == target {
                return true;
            }
            current = registry.descriptor(&handle).and_then(|d| d.base.clone());
        }
        false
    }
}
