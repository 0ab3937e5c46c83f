//! Scene-side runtime core: an entity-component store replicated to the
//! host renderer (and any other peers) over a CRDT wire protocol. The scene
//! mutates components locally; each tick the runtime merges inbound state,
//! runs the registered systems in priority order and flushes dirty rows as
//! outbound messages. Conflicts resolve deterministically, so peers
//! converge without a coordinator.

pub mod crdt;
pub mod engine;
pub mod entity;
pub mod events;
pub mod growonly;
pub mod input;
pub mod lww;
pub mod registry;
pub mod schedule;
pub mod transport;

pub use engine::{SceneRuntime, SceneWorld};
pub use entity::{EntityContainer, EntityError, EntityState};
pub use events::{event_ids, EventBus, EventSource, HostEvent};
pub use growonly::{GrowOnlyComponent, GrowOnlySet};
pub use input::InputState;
pub use lww::LwwComponent;
pub use registry::{ComponentRegistry, CrdtType, CrdtValue, MergeOutcome, RegistryError};
pub use schedule::{ScheduleError, Scheduler, PRIORITY_INPUT_SYSTEM, PRIORITY_REGULAR};
pub use transport::{
    ChannelTransport, RendererInterface, RendererTransport, SceneTransport, TransportId,
};
