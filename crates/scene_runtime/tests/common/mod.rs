#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use scene_runtime::{crdt::stream::CrdtStreamReader, SceneTransport};

/// transport backed by shared buffers so tests can inject inbound frames
/// and inspect everything the engine sent
#[derive(Default)]
pub struct Buffers {
    pub inbound: Vec<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
}

pub struct TestTransport {
    buffers: Rc<RefCell<Buffers>>,
}

pub fn test_transport() -> (TestTransport, Rc<RefCell<Buffers>>) {
    let buffers = Rc::new(RefCell::new(Buffers::default()));
    (
        TestTransport {
            buffers: buffers.clone(),
        },
        buffers,
    )
}

impl SceneTransport for TestTransport {
    fn send(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        self.buffers.borrow_mut().sent.push(frame.to_vec());
        Ok(())
    }

    fn drain_inbound(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.buffers.borrow_mut().inbound)
    }
}

/// a decoded wire message, for asserting on sent buffers
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub message_type: u32,
    pub entity: u32,
    pub component: Option<u32>,
    pub timestamp: Option<u32>,
    pub data: Option<Vec<u8>>,
}

pub fn parse_frame(frame: &[u8]) -> Vec<ParsedMessage> {
    let mut messages = Vec::default();
    let mut stream = CrdtStreamReader::new(frame);
    while let Some(raw) = stream.next_message().expect("well-formed frame") {
        let mut body = raw.body;
        let parsed = match raw.message_type {
            // put / append
            1 | 4 => {
                let entity = body.read_u32().unwrap();
                let component = body.read_u32().unwrap();
                let timestamp = body.read_u32().unwrap();
                let data = body.read_bytes().unwrap().to_vec();
                ParsedMessage {
                    message_type: raw.message_type,
                    entity,
                    component: Some(component),
                    timestamp: Some(timestamp),
                    data: Some(data),
                }
            }
            // delete component
            2 => ParsedMessage {
                message_type: 2,
                entity: body.read_u32().unwrap(),
                component: Some(body.read_u32().unwrap()),
                timestamp: Some(body.read_u32().unwrap()),
                data: None,
            },
            // delete entity
            3 => ParsedMessage {
                message_type: 3,
                entity: body.read_u32().unwrap(),
                component: None,
                timestamp: None,
                data: None,
            },
            other => panic!("unexpected message type {other}"),
        };
        messages.push(parsed);
    }
    messages
}

pub fn parsed_sent(buffers: &Rc<RefCell<Buffers>>) -> Vec<ParsedMessage> {
    let buffers = buffers.borrow();
    buffers
        .sent
        .iter()
        .flat_map(|frame| parse_frame(frame))
        .collect()
}

pub fn clear_sent(buffers: &Rc<RefCell<Buffers>>) {
    buffers.borrow_mut().sent.clear();
}
