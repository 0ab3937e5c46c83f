use std::collections::HashSet;

use num_traits::FromPrimitive;
use tracing::{debug, error, warn};

use scene_component::{
    components::{EngineInfo, InputResult},
    CrdtReader, CrdtReaderError, SceneComponentId, SceneCrdtTimestamp, SceneEntityId,
};

use crate::{
    crdt::{delete_entity, stream::CrdtStreamReader, CrdtMessage, CrdtMessageType},
    entity::{EntityContainer, EntityError, EntityState},
    events::{EventBus, EventSource},
    input::InputState,
    registry::{ComponentRegistry, CrdtType, MergeOutcome},
    schedule::{ScheduleError, Scheduler, TaskFn, PRIORITY_INPUT_SYSTEM},
    transport::{SceneTransport, TransportId},
};

const POINTER_RESULT_SET_SIZE: usize = 100;

/// Everything a system may touch during its invocation: the component
/// tables, the entity container, input state and the task queue. The
/// runtime owns it; systems borrow it for one call.
#[derive(Default)]
pub struct SceneWorld {
    registry: ComponentRegistry,
    entities: EntityContainer,
    input: InputState,
    tasks: Vec<TaskFn>,
    tick_number: u32,
    total_runtime: f32,
}

impl SceneWorld {
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn add_entity(&mut self) -> Result<SceneEntityId, EntityError> {
        self.entities.generate()
    }

    /// marked entities live on until the end of the tick, when their
    /// components are dropped and a DELETE_ENTITY goes out
    pub fn remove_entity(&mut self, entity: SceneEntityId) {
        self.entities.remove(entity);
    }

    pub fn entity_state(&self, entity: SceneEntityId) -> EntityState {
        self.entities.state(entity)
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// one-shot work to run before the next tick's systems; failures are
    /// logged and dropped
    pub fn enqueue_task(
        &mut self,
        task: impl FnOnce(&mut SceneWorld) -> anyhow::Result<()> + 'static,
    ) {
        self.tasks.push(Box::new(task));
    }

    pub fn tick_number(&self) -> u32 {
        self.tick_number
    }

    /// seconds of scene runtime accumulated over all ticks
    pub fn total_runtime(&self) -> f32 {
        self.total_runtime
    }

    /// the host-authored counters, if the host has sent them yet
    pub fn engine_info(&self) -> Option<EngineInfo> {
        self.registry
            .lww::<EngineInfo>(SceneComponentId::ENGINE_INFO)?
            .get_opt(SceneEntityId::ROOT)
            .copied()
    }

    pub(crate) fn take_tasks(&mut self) -> Vec<TaskFn> {
        std::mem::take(&mut self.tasks)
    }

    pub(crate) fn update_input_state(&mut self) {
        let Self {
            registry, input, ..
        } = self;
        match registry.grow_only::<InputResult>(SceneComponentId::POINTER_RESULT) {
            Some(results) => {
                input.update_from(results.iter().flat_map(|(_, set)| set.iter()));
            }
            None => input.begin_tick(),
        }
    }
}

struct TransportEntry {
    id: TransportId,
    transport: Box<dyn SceneTransport>,
}

struct PendingCorrective {
    source: TransportId,
    message: CrdtMessage,
}

/// The runtime core. Each `on_update` drains inbound CRDT traffic, runs the
/// systems in priority order and flushes dirty component state to every
/// transport.
pub struct SceneRuntime {
    world: SceneWorld,
    scheduler: Scheduler,
    transports: Vec<TransportEntry>,
    correctives: Vec<PendingCorrective>,
    events: EventBus,
    event_source: Option<Box<dyn EventSource>>,
    next_transport_id: u32,
    started: bool,
}

impl Default for SceneRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRuntime {
    pub fn new() -> Self {
        let mut runtime = Self {
            world: SceneWorld::default(),
            scheduler: Scheduler::default(),
            transports: Vec::default(),
            correctives: Vec::default(),
            events: EventBus::default(),
            event_source: None,
            next_transport_id: 0,
            started: false,
        };

        // the components the runtime itself consumes; a fresh registry
        // cannot refuse them
        runtime
            .world
            .registry
            .register_lww::<EngineInfo>("core::EngineInfo")
            .expect("fresh registry");
        runtime
            .world
            .registry
            .register_grow_only::<InputResult>(
                "core::PointerEventsResult",
                POINTER_RESULT_SET_SIZE,
                InputResult::timestamp_of,
            )
            .expect("fresh registry");

        runtime
            .scheduler
            .add_system(PRIORITY_INPUT_SYSTEM, "core::input-state", |world, _| {
                world.update_input_state()
            })
            .expect("fresh scheduler");

        runtime
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    pub fn add_transport(&mut self, transport: Box<dyn SceneTransport>) -> TransportId {
        let id = TransportId(self.next_transport_id);
        self.next_transport_id += 1;
        self.transports.push(TransportEntry { id, transport });
        id
    }

    pub fn add_system(
        &mut self,
        priority: u32,
        name: impl Into<String>,
        func: impl FnMut(&mut SceneWorld, f32) + 'static,
    ) -> Result<(), ScheduleError> {
        self.scheduler.add_system(priority, name, func)
    }

    pub fn remove_system(&mut self, name: &str) -> bool {
        self.scheduler.remove_system(name)
    }

    pub fn observe(
        &mut self,
        event_id: impl Into<String>,
        observer: impl FnMut(&serde_json::Value) + 'static,
    ) {
        self.events.observe(event_id, observer);
    }

    pub fn set_event_source(&mut self, source: Box<dyn EventSource>) {
        self.event_source = Some(source);
    }

    /// Seal the registry and apply each transport's initial-state snapshot
    /// through the normal receive path.
    pub fn on_start(&mut self) {
        if self.started {
            warn!("on_start called twice");
            return;
        }
        self.world.registry.seal();

        let mut deferred_deletes = Vec::default();
        for entry in &mut self.transports {
            for frame in entry.transport.initial_state() {
                if let Err(error) = process_frame(
                    &mut self.world,
                    &mut self.correctives,
                    entry.id,
                    &frame,
                    &mut deferred_deletes,
                ) {
                    error!("malformed initial state from transport {:?}: {error}", entry.id);
                    break;
                }
            }
        }
        apply_deferred_deletes(&mut self.world, &mut self.correctives, deferred_deletes);

        self.started = true;
    }

    /// One tick: receive and merge, run systems, flush outbound.
    pub fn on_update(&mut self, dt: f32) {
        // host events fan out before anything else observes the tick
        if let Some(source) = self.event_source.as_mut() {
            for event in source.poll_events() {
                self.events.dispatch(&event);
            }
        }

        // phase 1: drain every transport, deferring entity deletions until
        // all component ops in the batch have merged
        let mut deferred_deletes = Vec::default();
        for entry in &mut self.transports {
            for frame in entry.transport.drain_inbound() {
                if let Err(error) = process_frame(
                    &mut self.world,
                    &mut self.correctives,
                    entry.id,
                    &frame,
                    &mut deferred_deletes,
                ) {
                    error!("malformed crdt batch from transport {:?}: {error}", entry.id);
                    break;
                }
            }
        }
        apply_deferred_deletes(&mut self.world, &mut self.correctives, deferred_deletes);

        self.world.tick_number += 1;
        self.world.total_runtime += dt;

        self.scheduler.run(&mut self.world, dt);

        // phase 2
        self.send_updates();
    }

    fn send_updates(&mut self) {
        let released = self.world.entities.release_pending();
        for entity in &released {
            self.world.registry.entity_deleted(*entity);
            self.correctives
                .retain(|corrective| corrective.message.entity != *entity);
        }

        let mut outbound = Vec::default();
        self.world.registry.take_updates(&mut outbound);
        for entity in released {
            outbound.push(delete_entity(entity));
        }

        // a fresh update for the same row supersedes a queued corrective
        let fresh: HashSet<(SceneEntityId, Option<SceneComponentId>)> = outbound
            .iter()
            .map(|message| (message.entity, message.component))
            .collect();
        let correctives: Vec<PendingCorrective> = self
            .correctives
            .drain(..)
            .filter(|corrective| {
                !fresh.contains(&(corrective.message.entity, corrective.message.component))
            })
            .collect();

        for entry in &mut self.transports {
            // one contiguous buffer per transport per tick. correctives go
            // only to the transport that delivered the stale write
            let mut buffer = Vec::default();
            for corrective in correctives.iter().filter(|c| c.source == entry.id) {
                buffer.extend_from_slice(&corrective.message.frame);
            }
            for message in &outbound {
                if entry.transport.filter(message) {
                    buffer.extend_from_slice(&message.frame);
                }
            }
            if let Err(error) = entry.transport.send(&buffer) {
                warn!("transport {:?} send failed: {error:#}", entry.id);
            }
        }
    }
}

fn process_frame(
    world: &mut SceneWorld,
    correctives: &mut Vec<PendingCorrective>,
    source: TransportId,
    frame: &[u8],
    deferred_deletes: &mut Vec<SceneEntityId>,
) -> Result<(), CrdtReaderError> {
    let mut stream = CrdtStreamReader::new(frame);
    while let Some(raw) = stream.next_message()? {
        let mut body = raw.body;
        match CrdtMessageType::from_u32(raw.message_type) {
            Some(CrdtMessageType::PutComponent) | Some(CrdtMessageType::AppendValue) => {
                let entity: SceneEntityId = body.read()?;
                let component: SceneComponentId = body.read()?;
                let timestamp: SceneCrdtTimestamp = body.read()?;
                let content_len = body.read_u32()? as usize;
                if content_len != body.len() {
                    return Err(CrdtReaderError::OutOfBounds);
                }
                let expected = match raw.message_type {
                    4 => CrdtType::GrowOnly,
                    _ => CrdtType::Lww,
                };
                apply_component_op(
                    world,
                    correctives,
                    source,
                    expected,
                    entity,
                    component,
                    timestamp,
                    Some(&mut body),
                )?;
            }
            Some(CrdtMessageType::DeleteComponent) => {
                let entity: SceneEntityId = body.read()?;
                let component: SceneComponentId = body.read()?;
                let timestamp: SceneCrdtTimestamp = body.read()?;
                apply_component_op(
                    world,
                    correctives,
                    source,
                    CrdtType::Lww,
                    entity,
                    component,
                    timestamp,
                    None,
                )?;
            }
            Some(CrdtMessageType::DeleteEntity) => {
                deferred_deletes.push(body.read()?);
            }
            None => {
                // a frame from a newer peer; its body was already skipped
                debug!("unhandled crdt message type {}", raw.message_type);
            }
        }
    }
    Ok(())
}

fn apply_component_op(
    world: &mut SceneWorld,
    correctives: &mut Vec<PendingCorrective>,
    source: TransportId,
    expected: CrdtType,
    entity: SceneEntityId,
    component: SceneComponentId,
    timestamp: SceneCrdtTimestamp,
    data: Option<&mut CrdtReader>,
) -> Result<(), CrdtReaderError> {
    match world.registry.definition_mut(component) {
        None => {
            debug!("skipping op for unknown component {component:?}");
            return Ok(());
        }
        Some(definition) if definition.crdt_type() != expected => {
            warn!("crdt flavor mismatch for component {component:?}");
            return Ok(());
        }
        Some(_) => (),
    }

    if world.entities.state(entity) == EntityState::Removed {
        debug!("dropping op for removed entity {entity}");
        return Ok(());
    }

    // a higher version implies every lower one is gone, rows included
    if let Some(displaced) = world.entities.update_used(entity) {
        world.registry.entity_deleted(displaced);
    }

    let Some(definition) = world.registry.definition_mut(component) else {
        return Ok(());
    };
    if let MergeOutcome::Rejected(message) = definition.update_from_crdt(entity, timestamp, data)? {
        correctives.push(PendingCorrective { source, message });
    }
    Ok(())
}

fn apply_deferred_deletes(
    world: &mut SceneWorld,
    correctives: &mut Vec<PendingCorrective>,
    deletes: Vec<SceneEntityId>,
) {
    for entity in deletes {
        // clear rows without dirty-marking so nothing is re-broadcast
        world.registry.entity_deleted(entity);
        if let Some(displaced) = world.entities.update_removed(entity) {
            world.registry.entity_deleted(displaced);
        }
        correctives
            .retain(|corrective| corrective.message.entity != entity);
    }
}
