use std::{
    any::Any,
    collections::{HashMap, VecDeque},
};

use scene_component::{
    CrdtReader, CrdtReaderError, SceneComponentId, SceneCrdtTimestamp, SceneEntityId, ToCrdtWriter,
};

use crate::{
    crdt::{append_component, CrdtMessage},
    registry::{CrdtInterface, CrdtType, CrdtValue, MergeOutcome},
};

#[derive(Debug, Clone)]
pub struct GrowOnlyEntry<T> {
    pub timestamp: u32,
    pub value: T,
}

/// The per-entity value set: kept sorted ascending by the value-derived
/// timestamp, bounded by evicting from the front. Only shared references
/// ever leave the definition, so the view is read-only by construction.
#[derive(Debug, Clone)]
pub struct GrowOnlySet<T> {
    entries: VecDeque<GrowOnlyEntry<T>>,
}

impl<T> Default for GrowOnlySet<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::default(),
        }
    }
}

impl<T> GrowOnlySet<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// values in non-decreasing timestamp order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub fn entries(&self) -> impl Iterator<Item = &GrowOnlyEntry<T>> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&T> {
        self.entries.back().map(|entry| &entry.value)
    }

    fn insert(&mut self, timestamp: u32, value: T, max_elements: usize) {
        // values mostly arrive in order, so scan from the back. equal
        // timestamps keep arrival order
        let index = self
            .entries
            .iter()
            .rposition(|entry| entry.timestamp <= timestamp)
            .map(|index| index + 1)
            .unwrap_or(0);
        self.entries.insert(index, GrowOnlyEntry { timestamp, value });

        while self.entries.len() > max_elements {
            self.entries.pop_front();
        }
    }
}

/// Grow-only component table. Elements are only ever added (locally or from
/// the wire) and only leave by hitting the size bound; there is nothing to
/// conflict on, so no corrective traffic exists for this flavor.
pub struct GrowOnlyComponent<T> {
    component_id: SceneComponentId,
    max_elements: usize,
    timestamp_of: fn(&T) -> u32,
    data: HashMap<SceneEntityId, GrowOnlySet<T>>,
    pending: Vec<CrdtMessage>,
}

impl<T> GrowOnlyComponent<T> {
    pub fn new(
        component_id: SceneComponentId,
        max_elements: usize,
        timestamp_of: fn(&T) -> u32,
    ) -> Self {
        Self {
            component_id,
            max_elements,
            timestamp_of,
            data: HashMap::default(),
            pending: Vec::default(),
        }
    }

    pub fn component_id(&self) -> SceneComponentId {
        self.component_id
    }

    pub fn get(&self, entity: SceneEntityId) -> Option<&GrowOnlySet<T>> {
        self.data.get(&entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SceneEntityId, &GrowOnlySet<T>)> {
        self.data.iter().map(|(entity, set)| (*entity, set))
    }
}

impl<T: CrdtValue> GrowOnlyComponent<T> {
    /// append a local value and queue its broadcast
    pub fn add(&mut self, entity: SceneEntityId, value: T) {
        let timestamp = (self.timestamp_of)(&value);
        self.pending
            .push(append_component(entity, self.component_id, &value.to_vec()));
        self.data
            .entry(entity)
            .or_default()
            .insert(timestamp, value, self.max_elements);
    }
}

impl<T: CrdtValue> CrdtInterface for GrowOnlyComponent<T> {
    fn component_id(&self) -> SceneComponentId {
        self.component_id
    }

    fn crdt_type(&self) -> CrdtType {
        CrdtType::GrowOnly
    }

    fn update_from_crdt(
        &mut self,
        entity: SceneEntityId,
        _timestamp: SceneCrdtTimestamp,
        data: Option<&mut CrdtReader>,
    ) -> Result<MergeOutcome, CrdtReaderError> {
        let Some(reader) = data else {
            // appends always carry a payload
            return Err(CrdtReaderError::OutOfBounds);
        };
        let value = T::from_reader(reader)?;
        let timestamp = (self.timestamp_of)(&value);
        self.data
            .entry(entity)
            .or_default()
            .insert(timestamp, value, self.max_elements);
        Ok(MergeOutcome::Accepted)
    }

    fn take_updates(&mut self, out: &mut Vec<CrdtMessage>) {
        out.append(&mut self.pending);
    }

    fn entity_deleted(&mut self, entity: SceneEntityId) {
        self.data.remove(&entity);
        // a deleted entity's queued appends would only be dropped by every
        // peer on arrival
        self.pending.retain(|message| message.entity != entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use crate::crdt::CrdtMessageType;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Stamped {
        t: u32,
        payload: u32,
    }

    impl scene_component::FromCrdtReader for Stamped {
        fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
            Ok(Self {
                t: buf.read_u32()?,
                payload: buf.read_u32()?,
            })
        }
    }

    impl ToCrdtWriter for Stamped {
        fn to_writer(&self, buf: &mut scene_component::CrdtWriter) {
            buf.write_u32(self.t);
            buf.write_u32(self.payload);
        }
    }

    fn stamped(t: u32) -> Stamped {
        Stamped { t, payload: t * 10 }
    }

    fn make() -> GrowOnlyComponent<Stamped> {
        GrowOnlyComponent::new(SceneComponentId(2100), 3, |value| value.t)
    }

    fn entity() -> SceneEntityId {
        SceneEntityId::new(512, 0)
    }

    #[test]
    fn values_are_kept_in_timestamp_order() {
        let mut state = make();
        state.add(entity(), stamped(10));
        state.add(entity(), stamped(30));
        state.add(entity(), stamped(20));

        let timestamps: Vec<_> = state
            .get(entity())
            .unwrap()
            .entries()
            .map(|entry| entry.timestamp)
            .collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[test]
    fn oldest_values_are_evicted_at_the_bound() {
        let mut state = make();
        for t in [10, 30, 20] {
            state.add(entity(), stamped(t));
        }
        // older than everything held: evicted immediately
        state.add(entity(), stamped(5));
        let timestamps: Vec<_> = state
            .get(entity())
            .unwrap()
            .entries()
            .map(|entry| entry.timestamp)
            .collect();
        assert_eq!(timestamps, vec![10, 20, 30]);

        state.add(entity(), stamped(40));
        let values: Vec<_> = state.get(entity()).unwrap().iter().cloned().collect();
        assert_eq!(values, vec![stamped(20), stamped(30), stamped(40)]);
    }

    #[test]
    fn every_local_add_queues_an_append() {
        let mut state = make();
        state.add(entity(), stamped(10));
        state.add(entity(), stamped(5));

        let mut out = Vec::default();
        state.take_updates(&mut out);
        assert_eq!(out.len(), 2);
        assert!(out
            .iter()
            .all(|message| message.message_type == CrdtMessageType::AppendValue));

        out.clear();
        state.take_updates(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn inbound_appends_are_always_accepted() {
        let mut state = make();
        let bytes = stamped(20).to_vec();
        let mut reader = CrdtReader::new(&bytes);
        let outcome = state
            .update_from_crdt(entity(), SceneCrdtTimestamp(0), Some(&mut reader))
            .unwrap();
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_eq!(state.get(entity()).unwrap().newest(), Some(&stamped(20)));

        // no outbound is generated for inbound values
        let mut out = Vec::default();
        state.take_updates(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn entity_deleted_drops_rows_and_pending_appends() {
        let mut state = make();
        state.add(entity(), stamped(10));
        state.entity_deleted(entity());

        assert!(state.get(entity()).is_none());
        let mut out = Vec::default();
        state.take_updates(&mut out);
        assert!(out.is_empty());
    }
}
