use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
};

use thiserror::Error;

use scene_component::{
    component_number::component_number_from_name, CrdtReader, CrdtReaderError, FromCrdtReader,
    SceneComponentId, SceneCrdtTimestamp, SceneEntityId, ToCrdtWriter,
};

use crate::{crdt::CrdtMessage, growonly::GrowOnlyComponent, lww::LwwComponent};

pub trait CrdtValue: FromCrdtReader + ToCrdtWriter + 'static {}
impl<T: FromCrdtReader + ToCrdtWriter + 'static> CrdtValue for T {}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CrdtType {
    Lww,
    GrowOnly,
}

/// result of merging one inbound message into a component table
pub enum MergeOutcome {
    /// remote state stored
    Accepted,
    /// already converged
    Unchanged,
    /// remote is stale or lost the tiebreak; the carried message restates
    /// current local state for the sender
    Rejected(CrdtMessage),
}

/// Type-erased handle to one component table, letting the engine merge,
/// flush and clean up without knowing the value type.
pub trait CrdtInterface {
    fn component_id(&self) -> SceneComponentId;
    fn crdt_type(&self) -> CrdtType;

    fn update_from_crdt(
        &mut self,
        entity: SceneEntityId,
        timestamp: SceneCrdtTimestamp,
        data: Option<&mut CrdtReader>,
    ) -> Result<MergeOutcome, CrdtReaderError>;

    /// drain dirty state into outbound messages
    fn take_updates(&mut self, out: &mut Vec<CrdtMessage>);

    /// clear an entity's row without dirty-marking (no re-broadcast)
    fn entity_deleted(&mut self, entity: SceneEntityId);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry is sealed, component {0} registered too late")]
    Sealed(String),
    #[error("component {name} is already registered as {id:?}")]
    DuplicateName { name: String, id: SceneComponentId },
    #[error("component {name} derives {id:?}, already taken by {existing}")]
    NumberCollision {
        name: String,
        existing: String,
        id: SceneComponentId,
    },
}

/// All registered component definitions, keyed by component number.
/// Registration derives the number from the name and is sealed once the
/// engine starts; lookups after that are infallible in practice.
#[derive(Default)]
pub struct ComponentRegistry {
    // ordered so flush emission is deterministic across peers
    definitions: BTreeMap<SceneComponentId, Box<dyn CrdtInterface>>,
    names: HashMap<SceneComponentId, String>,
    sealed: bool,
}

impl ComponentRegistry {
    fn check_registration(
        &self,
        name: &str,
    ) -> Result<SceneComponentId, RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed(name.to_owned()));
        }
        let id = component_number_from_name(name);
        if let Some(existing) = self.names.get(&id) {
            if existing == name {
                return Err(RegistryError::DuplicateName {
                    name: name.to_owned(),
                    id,
                });
            }
            return Err(RegistryError::NumberCollision {
                name: name.to_owned(),
                existing: existing.clone(),
                id,
            });
        }
        Ok(id)
    }

    pub fn register_lww<T: CrdtValue>(
        &mut self,
        name: &str,
    ) -> Result<SceneComponentId, RegistryError> {
        let id = self.check_registration(name)?;
        self.definitions.insert(id, Box::new(LwwComponent::<T>::new(id)));
        self.names.insert(id, name.to_owned());
        Ok(id)
    }

    pub fn register_grow_only<T: CrdtValue>(
        &mut self,
        name: &str,
        max_elements: usize,
        timestamp_of: fn(&T) -> u32,
    ) -> Result<SceneComponentId, RegistryError> {
        let id = self.check_registration(name)?;
        self.definitions.insert(
            id,
            Box::new(GrowOnlyComponent::<T>::new(id, max_elements, timestamp_of)),
        );
        self.names.insert(id, name.to_owned());
        Ok(id)
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn id_of(&self, name: &str) -> Option<SceneComponentId> {
        let id = component_number_from_name(name);
        self.definitions.contains_key(&id).then_some(id)
    }

    pub fn name_of(&self, id: SceneComponentId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn lww<T: CrdtValue>(&self, id: SceneComponentId) -> Option<&LwwComponent<T>> {
        self.definitions.get(&id)?.as_any().downcast_ref()
    }

    pub fn lww_mut<T: CrdtValue>(&mut self, id: SceneComponentId) -> Option<&mut LwwComponent<T>> {
        self.definitions.get_mut(&id)?.as_any_mut().downcast_mut()
    }

    pub fn grow_only<T: CrdtValue>(&self, id: SceneComponentId) -> Option<&GrowOnlyComponent<T>> {
        self.definitions.get(&id)?.as_any().downcast_ref()
    }

    pub fn grow_only_mut<T: CrdtValue>(
        &mut self,
        id: SceneComponentId,
    ) -> Option<&mut GrowOnlyComponent<T>> {
        self.definitions.get_mut(&id)?.as_any_mut().downcast_mut()
    }

    pub(crate) fn definition_mut(
        &mut self,
        id: SceneComponentId,
    ) -> Option<&mut (dyn CrdtInterface + 'static)> {
        self.definitions
            .get_mut(&id)
            .map(|definition| &mut **definition)
    }

    pub(crate) fn take_updates(&mut self, out: &mut Vec<CrdtMessage>) {
        for definition in self.definitions.values_mut() {
            definition.take_updates(out);
        }
    }

    pub(crate) fn entity_deleted(&mut self, entity: SceneEntityId) {
        for definition in self.definitions.values_mut() {
            definition.entity_deleted(entity);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn static_names_resolve_to_static_numbers() {
        let mut registry = ComponentRegistry::default();
        let id = registry
            .register_lww::<scene_component::transform_and_parent::TransformAndParent>(
                "core::Transform",
            )
            .unwrap();
        assert_eq!(id, SceneComponentId::TRANSFORM);
        assert_eq!(registry.id_of("core::Transform"), Some(id));
        assert_eq!(registry.name_of(id), Some("core::Transform"));
    }

    #[test]
    fn duplicate_name_is_an_error() {
        let mut registry = ComponentRegistry::default();
        registry.register_lww::<u32>("user::Counter").unwrap();
        assert!(matches!(
            registry.register_lww::<u32>("user::Counter"),
            Err(RegistryError::DuplicateName { .. })
        ));
    }

    #[test]
    fn sealed_registry_rejects_registration() {
        let mut registry = ComponentRegistry::default();
        registry.seal();
        assert!(matches!(
            registry.register_lww::<u32>("user::Late"),
            Err(RegistryError::Sealed(_))
        ));
    }

    #[test]
    fn typed_access_requires_the_matching_type() {
        let mut registry = ComponentRegistry::default();
        let id = registry.register_lww::<u32>("user::Counter").unwrap();
        assert!(registry.lww::<u32>(id).is_some());
        // wrong value type or wrong crdt flavor both miss
        assert!(registry.lww::<u64>(id).is_none());
        assert!(registry.grow_only::<u32>(id).is_none());
    }
}
