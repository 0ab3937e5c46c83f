use std::sync::mpsc::{channel, Receiver, Sender};

use scene_component::component_number::USER_RANGE_BASE;

use crate::crdt::CrdtMessage;

/// opaque handle assigned at registration; inbound messages are tagged with
/// it so nothing is ever echoed back to its own source
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TransportId(pub u32);

/// A bidirectional endpoint carrying CRDT frames. The engine calls
/// `drain_inbound` at the start of each tick and `send` once at the end,
/// with the tick's whole outbound batch as one contiguous buffer.
pub trait SceneTransport {
    fn send(&mut self, frame: &[u8]) -> anyhow::Result<()>;

    /// frames received since the previous tick, in arrival order
    fn drain_inbound(&mut self) -> Vec<Vec<u8>>;

    /// opt out of messages this endpoint has no use for
    fn filter(&self, message: &CrdtMessage) -> bool {
        let _ = message;
        true
    }

    /// frames describing pre-existing state, applied once at engine start
    fn initial_state(&mut self) -> Vec<Vec<u8>> {
        Vec::default()
    }
}

/// The host renderer surface the runtime drives. Sending a batch is also the
/// delivery point for the renderer's own updates: the response frames become
/// next tick's inbound.
pub trait RendererInterface {
    fn crdt_send_to_renderer(&mut self, frame: &[u8]) -> Vec<Vec<u8>>;
    fn crdt_get_state(&mut self) -> Vec<Vec<u8>>;
}

pub struct RendererTransport {
    host: Box<dyn RendererInterface>,
    inbound: Vec<Vec<u8>>,
}

impl RendererTransport {
    pub fn new(host: Box<dyn RendererInterface>) -> Self {
        Self {
            host,
            inbound: Vec::default(),
        }
    }
}

impl SceneTransport for RendererTransport {
    fn send(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        let responses = self.host.crdt_send_to_renderer(frame);
        self.inbound.extend(responses);
        Ok(())
    }

    fn drain_inbound(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inbound)
    }

    fn filter(&self, message: &CrdtMessage) -> bool {
        // user-defined components are of no interest to the renderer
        match message.component {
            Some(component) => component.0 < USER_RANGE_BASE,
            None => true,
        }
    }

    fn initial_state(&mut self) -> Vec<Vec<u8>> {
        self.host.crdt_get_state()
    }
}

/// In-process transport over a pair of channels; the test and loopback
/// workhorse. A closed peer turns sends into logged errors, not panics.
pub struct ChannelTransport {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// two endpoints wired to each other
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_sender, b_receiver) = channel();
        let (b_sender, a_receiver) = channel();
        (
            ChannelTransport {
                sender: a_sender,
                receiver: a_receiver,
            },
            ChannelTransport {
                sender: b_sender,
                receiver: b_receiver,
            },
        )
    }
}

impl SceneTransport for ChannelTransport {
    fn send(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        if frame.is_empty() {
            return Ok(());
        }
        self.sender
            .send(frame.to_vec())
            .map_err(|_| anyhow::anyhow!("peer endpoint closed"))
    }

    fn drain_inbound(&mut self) -> Vec<Vec<u8>> {
        self.receiver.try_iter().collect()
    }
}
