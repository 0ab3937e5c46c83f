use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use scene_component::SceneEntityId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntityError {
    #[error("all entity numbers are in use")]
    NumbersExhausted,
    #[error("entity {0} already has this component")]
    AlreadyExists(SceneEntityId),
    #[error("entity {0} has no such component")]
    NotFound(SceneEntityId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityState {
    /// never seen; messages for it promote it to used
    Unknown,
    /// live at this exact version
    Used,
    /// this version (or a later one) has been retired; never reissued
    Removed,
    /// host-controlled number below 512; referenced, never allocated here
    Reserved,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
enum SlotStatus {
    #[default]
    Unborn,
    Live,
    Dead,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    // highest version observed for this number
    version: u16,
    status: SlotStatus,
}

const FIRST_USER_NUMBER: u16 = 512;

/// Allocates entity identifiers and tracks liveness per (number, version)
/// pair. One slot per possible number; a slot only ever moves to higher
/// versions, so a removed pair can never be reissued.
pub struct EntityContainer {
    slots: Vec<Slot>,
    pending_removal: HashSet<SceneEntityId>,
    // numbers whose latest version died and can be recycled
    free: Vec<u16>,
    next_fresh: u32,
}

impl Default for EntityContainer {
    fn default() -> Self {
        Self {
            slots: vec![Slot::default(); 1 << 16],
            pending_removal: HashSet::default(),
            free: Vec::default(),
            next_fresh: FIRST_USER_NUMBER as u32,
        }
    }
}

impl EntityContainer {
    pub fn state(&self, entity: SceneEntityId) -> EntityState {
        if entity.is_reserved() {
            return EntityState::Reserved;
        }

        let slot = &self.slots[entity.number as usize];
        if slot.version > entity.version {
            return EntityState::Removed;
        }
        if slot.version < entity.version {
            return EntityState::Unknown;
        }
        match slot.status {
            SlotStatus::Unborn => EntityState::Unknown,
            SlotStatus::Live => EntityState::Used,
            SlotStatus::Dead => EntityState::Removed,
        }
    }

    /// Allocate a new entity, preferring to recycle a removed number (at the
    /// next version) over consuming a fresh one. Running out of numbers is
    /// unrecoverable for the scene.
    pub fn generate(&mut self) -> Result<SceneEntityId, EntityError> {
        while let Some(number) = self.free.pop() {
            let slot = self.slots[number as usize];
            // entries go stale when an inbound message revives the number
            if slot.status != SlotStatus::Dead || slot.version == u16::MAX {
                continue;
            }
            let entity = SceneEntityId::new(number, slot.version + 1);
            self.slots[number as usize] = Slot {
                version: entity.version,
                status: SlotStatus::Live,
            };
            return Ok(entity);
        }

        while self.next_fresh <= u16::MAX as u32 {
            let number = self.next_fresh as u16;
            self.next_fresh += 1;
            let slot = &mut self.slots[number as usize];
            if slot.status != SlotStatus::Unborn {
                continue;
            }
            slot.status = SlotStatus::Live;
            return Ok(SceneEntityId::new(number, slot.version));
        }

        Err(EntityError::NumbersExhausted)
    }

    /// Queue a live entity for removal at the end of the tick. Removing an
    /// entity that was never seen retires its pair immediately.
    pub fn remove(&mut self, entity: SceneEntityId) {
        match self.state(entity) {
            EntityState::Used => {
                self.pending_removal.insert(entity);
            }
            EntityState::Unknown => {
                let slot = &mut self.slots[entity.number as usize];
                slot.version = entity.version;
                slot.status = SlotStatus::Dead;
                self.free.push(entity.number);
                debug!("retired unseen entity {entity}");
            }
            EntityState::Removed | EntityState::Reserved => (),
        }
    }

    /// Clear the pending list, retiring each entity; the result drives
    /// DELETE_ENTITY emission. Sorted so emission order is deterministic.
    pub fn release_pending(&mut self) -> Vec<SceneEntityId> {
        let mut released: Vec<_> = self.pending_removal.drain().collect();
        released.sort_unstable();

        for entity in &released {
            let slot = &mut self.slots[entity.number as usize];
            // an inbound message may have moved the slot past this version
            // already; the release still stands for the old pair
            if slot.version == entity.version && slot.status == SlotStatus::Live {
                slot.status = SlotStatus::Dead;
                self.free.push(entity.number);
            }
        }
        released
    }

    /// Reconcile with an observed live remote entity. A version above the
    /// current one retires every earlier version of the number; if one of
    /// those was live its component rows must be cleared, so it is returned.
    pub fn update_used(&mut self, entity: SceneEntityId) -> Option<SceneEntityId> {
        if entity.is_reserved() {
            return None;
        }

        let slot = &mut self.slots[entity.number as usize];
        if slot.version < entity.version {
            let displaced = (slot.status == SlotStatus::Live)
                .then(|| SceneEntityId::new(entity.number, slot.version));
            slot.version = entity.version;
            slot.status = SlotStatus::Live;
            if let Some(displaced) = displaced {
                self.pending_removal.remove(&displaced);
                debug!("{entity} displaces {displaced}");
            }
            return displaced;
        }

        if slot.version == entity.version && slot.status == SlotStatus::Unborn {
            slot.status = SlotStatus::Live;
        }
        None
    }

    /// Reconcile with an observed remote removal, retiring the pair and all
    /// earlier versions. As with `update_used`, a displaced live entity is
    /// handed back for cleanup.
    pub fn update_removed(&mut self, entity: SceneEntityId) -> Option<SceneEntityId> {
        if entity.is_reserved() {
            return None;
        }

        let slot = &mut self.slots[entity.number as usize];
        if slot.version > entity.version || slot.status == SlotStatus::Dead {
            return None;
        }

        let displaced = (slot.status == SlotStatus::Live && slot.version < entity.version)
            .then(|| SceneEntityId::new(entity.number, slot.version));

        let was_live = slot.status == SlotStatus::Live;
        slot.version = entity.version;
        slot.status = SlotStatus::Dead;
        self.free.push(entity.number);

        if was_live {
            self.pending_removal
                .retain(|pending| pending.number != entity.number);
        }
        displaced
    }
}
