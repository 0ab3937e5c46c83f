use std::{
    any::Any,
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use scene_component::{
    CrdtReader, CrdtReaderError, SceneComponentId, SceneCrdtTimestamp, SceneEntityId, ToCrdtWriter,
};

use crate::{
    crdt::{put_component, CrdtMessage},
    entity::EntityError,
    registry::{CrdtInterface, CrdtType, CrdtValue, MergeOutcome},
};

/// Last-write-wins component table: one value and one Lamport timestamp per
/// entity, plus the set of entities mutated locally since the last flush.
///
/// Values are stored deserialized; the raw bytes needed for the
/// equal-timestamp tiebreak are produced on demand, so serialization cost is
/// only paid at flush time and on actual conflicts.
pub struct LwwComponent<T> {
    component_id: SceneComponentId,
    data: HashMap<SceneEntityId, T>,
    timestamps: HashMap<SceneEntityId, SceneCrdtTimestamp>,
    dirty: HashSet<SceneEntityId>,
}

impl<T> LwwComponent<T> {
    pub fn new(component_id: SceneComponentId) -> Self {
        Self {
            component_id,
            data: HashMap::default(),
            timestamps: HashMap::default(),
            dirty: HashSet::default(),
        }
    }

    pub fn component_id(&self) -> SceneComponentId {
        self.component_id
    }

    pub fn has(&self, entity: SceneEntityId) -> bool {
        self.data.contains_key(&entity)
    }

    pub fn get(&self, entity: SceneEntityId) -> Result<&T, EntityError> {
        self.data.get(&entity).ok_or(EntityError::NotFound(entity))
    }

    pub fn get_opt(&self, entity: SceneEntityId) -> Option<&T> {
        self.data.get(&entity)
    }

    /// mutable access marks the row dirty regardless of whether the caller
    /// ends up changing it
    pub fn get_mut(&mut self, entity: SceneEntityId) -> Option<&mut T> {
        let value = self.data.get_mut(&entity)?;
        self.dirty.insert(entity);
        Some(value)
    }

    pub fn create(&mut self, entity: SceneEntityId, value: T) -> Result<(), EntityError> {
        if self.data.contains_key(&entity) {
            return Err(EntityError::AlreadyExists(entity));
        }
        self.data.insert(entity, value);
        self.dirty.insert(entity);
        Ok(())
    }

    pub fn create_or_replace(&mut self, entity: SceneEntityId, value: T) {
        self.data.insert(entity, value);
        self.dirty.insert(entity);
    }

    /// remove the row, leaving a tombstone timestamp behind at the next
    /// flush. deleting an absent row is a no-op.
    pub fn delete(&mut self, entity: SceneEntityId) -> bool {
        if self.data.remove(&entity).is_some() {
            self.dirty.insert(entity);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SceneEntityId, &T)> {
        self.data.iter().map(|(entity, value)| (*entity, value))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn timestamp(&self, entity: SceneEntityId) -> Option<SceneCrdtTimestamp> {
        self.timestamps.get(&entity).copied()
    }
}

impl<T: CrdtValue> LwwComponent<T> {
    fn current_state(&self, entity: SceneEntityId) -> CrdtMessage {
        let timestamp = self.timestamp(entity).unwrap_or_default();
        let bytes = self.data.get(&entity).map(ToCrdtWriter::to_vec);
        put_component(entity, self.component_id, timestamp, bytes.as_deref())
    }
}

impl<T: CrdtValue> CrdtInterface for LwwComponent<T> {
    fn component_id(&self) -> SceneComponentId {
        self.component_id
    }

    fn crdt_type(&self) -> CrdtType {
        CrdtType::Lww
    }

    fn update_from_crdt(
        &mut self,
        entity: SceneEntityId,
        new_timestamp: SceneCrdtTimestamp,
        maybe_new_data: Option<&mut CrdtReader>,
    ) -> Result<MergeOutcome, CrdtReaderError> {
        if let Some(current) = self.timestamps.get(&entity) {
            match current.cmp(&new_timestamp) {
                // current is newer, converge the peer back
                Ordering::Greater => return Ok(MergeOutcome::Rejected(self.current_state(entity))),
                // current is older, accept
                Ordering::Less => (),
                Ordering::Equal => {
                    // deterministic tiebreak on the serialized bytes; a
                    // tombstone orders below any payload
                    let current_bytes = self.data.get(&entity).map(ToCrdtWriter::to_vec);
                    let new_bytes = maybe_new_data.as_ref().map(|reader| reader.as_slice());
                    match new_bytes.cmp(&current_bytes.as_deref()) {
                        Ordering::Greater => (),
                        Ordering::Equal => return Ok(MergeOutcome::Unchanged),
                        Ordering::Less => {
                            return Ok(MergeOutcome::Rejected(self.current_state(entity)))
                        }
                    }
                }
            }
        }

        match maybe_new_data {
            Some(reader) => {
                let value = T::from_reader(reader)?;
                self.data.insert(entity, value);
            }
            None => {
                self.data.remove(&entity);
            }
        }
        // accepted remote state is not re-broadcast: the timestamp moves,
        // the dirty set does not
        self.timestamps.insert(entity, new_timestamp);
        Ok(MergeOutcome::Accepted)
    }

    fn take_updates(&mut self, out: &mut Vec<CrdtMessage>) {
        let mut flushed: Vec<_> = self.dirty.drain().collect();
        flushed.sort_unstable();

        for entity in flushed {
            let timestamp = self.timestamps.entry(entity).or_default();
            timestamp.0 += 1;
            let timestamp = *timestamp;
            let bytes = self.data.get(&entity).map(ToCrdtWriter::to_vec);
            out.push(put_component(
                entity,
                self.component_id,
                timestamp,
                bytes.as_deref(),
            ));
        }
    }

    fn entity_deleted(&mut self, entity: SceneEntityId) {
        self.data.remove(&entity);
        self.timestamps.remove(&entity);
        self.dirty.remove(&entity);
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

    const COMPONENT: SceneComponentId = SceneComponentId(1999);

    fn entity() -> SceneEntityId {
        SceneEntityId::new(512, 0)
    }

    fn merge(
        state: &mut LwwComponent<u32>,
        timestamp: u32,
        data: Option<&[u8]>,
    ) -> MergeOutcome {
        let mut reader = data.map(CrdtReader::new);
        state
            .update_from_crdt(entity(), SceneCrdtTimestamp(timestamp), reader.as_mut())
            .unwrap()
    }

    fn assert_entry_eq(state: &LwwComponent<u32>, timestamp: u32, data: Option<u32>) {
        assert_eq!(state.timestamp(entity()), Some(SceneCrdtTimestamp(timestamp)));
        assert_eq!(state.get_opt(entity()).copied(), data);
    }

    #[test]
    fn put_to_none_should_accept() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        let outcome = merge(&mut state, 0, Some(&1231u32.to_le_bytes()));
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_entry_eq(&state, 0, Some(1231));
    }

    #[test]
    fn put_twice_is_idempotent() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        let bytes = 1231u32.to_le_bytes();
        merge(&mut state, 0, Some(&bytes));
        let outcome = merge(&mut state, 0, Some(&bytes));
        assert!(matches!(outcome, MergeOutcome::Unchanged));
        assert_entry_eq(&state, 0, Some(1231));
    }

    #[test]
    fn put_newer_should_accept() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 0, Some(&1231u32.to_le_bytes()));
        let outcome = merge(&mut state, 1, Some(&999u32.to_le_bytes()));
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_entry_eq(&state, 1, Some(999));
    }

    #[test]
    fn put_older_should_reject_with_corrective() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 7, Some(&1231u32.to_le_bytes()));
        let outcome = merge(&mut state, 5, Some(&999u32.to_le_bytes()));

        let MergeOutcome::Rejected(corrective) = outcome else {
            panic!("expected corrective");
        };
        assert_eq!(corrective.message_type, CrdtMessageType::PutComponent);
        assert_eq!(corrective.entity, entity());
        // corrective carries the current state at the current timestamp
        let mut reader = CrdtReader::new(&corrective.frame);
        let _length = reader.read_u32().unwrap();
        let _message_type = reader.read_u32().unwrap();
        let _entity = reader.read_u32().unwrap();
        assert_eq!(reader.read_u32().unwrap(), COMPONENT.0);
        assert_eq!(reader.read_u32().unwrap(), 7);

        assert_entry_eq(&state, 7, Some(1231));
    }

    #[test]
    fn equal_timestamp_higher_bytes_win() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 5, Some(&1u32.to_le_bytes()));
        let outcome = merge(&mut state, 5, Some(&2u32.to_le_bytes()));
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_entry_eq(&state, 5, Some(2));

        // and the lower loses, returning current state
        let outcome = merge(&mut state, 5, Some(&1u32.to_le_bytes()));
        assert!(matches!(outcome, MergeOutcome::Rejected(_)));
        assert_entry_eq(&state, 5, Some(2));
    }

    #[test]
    fn delete_same_timestamp_should_reject() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 1, Some(&1u32.to_le_bytes()));
        let outcome = merge(&mut state, 1, None);
        assert!(matches!(outcome, MergeOutcome::Rejected(_)));
        assert_entry_eq(&state, 1, Some(1));
    }

    #[test]
    fn delete_newer_should_accept() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 1, Some(&1u32.to_le_bytes()));
        let outcome = merge(&mut state, 2, None);
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_entry_eq(&state, 2, None);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 1, Some(&1u32.to_le_bytes()));
        merge(&mut state, 2, None);
        let outcome = merge(&mut state, 2, None);
        assert!(matches!(outcome, MergeOutcome::Unchanged));
        assert_entry_eq(&state, 2, None);
    }

    #[test]
    fn put_wins_over_delete_at_equal_timestamp() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        merge(&mut state, 2, None);
        let outcome = merge(&mut state, 2, Some(&3u32.to_le_bytes()));
        assert!(matches!(outcome, MergeOutcome::Accepted));
        assert_entry_eq(&state, 2, Some(3));
    }

    #[test]
    fn local_writes_flush_with_incremented_timestamp() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        state.create(entity(), 11).unwrap();

        let mut out = Vec::default();
        state.take_updates(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message_type, CrdtMessageType::PutComponent);
        assert_eq!(state.timestamp(entity()), Some(SceneCrdtTimestamp(1)));

        // nothing dirty, nothing flushed
        out.clear();
        state.take_updates(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn local_delete_flushes_a_tombstone() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        state.create(entity(), 11).unwrap();
        let mut out = Vec::default();
        state.take_updates(&mut out);

        assert!(state.delete(entity()));
        out.clear();
        state.take_updates(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message_type, CrdtMessageType::DeleteComponent);
        assert_eq!(state.timestamp(entity()), Some(SceneCrdtTimestamp(2)));
    }

    #[test]
    fn create_on_existing_row_fails_without_mutating() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        state.create(entity(), 11).unwrap();
        assert_eq!(
            state.create(entity(), 22),
            Err(EntityError::AlreadyExists(entity()))
        );
        assert_eq!(state.get(entity()).unwrap(), &11);
    }

    #[test]
    fn get_mut_marks_dirty() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        state.create(entity(), 11).unwrap();
        let mut out = Vec::default();
        state.take_updates(&mut out);

        *state.get_mut(entity()).unwrap() = 42;
        out.clear();
        state.take_updates(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(state.timestamp(entity()), Some(SceneCrdtTimestamp(2)));
    }

    #[test]
    fn entity_deleted_clears_rows_without_dirty_marking() {
        let mut state = LwwComponent::<u32>::new(COMPONENT);
        state.create(entity(), 11).unwrap();
        state.entity_deleted(entity());

        assert!(!state.has(entity()));
        assert_eq!(state.timestamp(entity()), None);
        let mut out = Vec::default();
        state.take_updates(&mut out);
        assert!(out.is_empty());
    }
}
