use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;

use scene_component::{
    CrdtWriter, SceneComponentId, SceneCrdtTimestamp, SceneEntityId, ToCrdtWriter,
};

pub mod stream;

pub const CRDT_HEADER_SIZE: usize = 8;

#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrdtMessageType {
    PutComponent = 1,
    DeleteComponent = 2,

    DeleteEntity = 3,
    AppendValue = 4,
}

impl ToCrdtWriter for CrdtMessageType {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u32(ToPrimitive::to_u32(self).unwrap())
    }
}

/// A framed outbound message: the wire bytes plus the routing fields
/// transports filter on, so fan-out never needs to re-parse the frame.
#[derive(Debug, Clone)]
pub struct CrdtMessage {
    pub message_type: CrdtMessageType,
    pub entity: SceneEntityId,
    pub component: Option<SceneComponentId>,
    pub frame: Vec<u8>,
}

// helpers to make message byte streams
pub fn put_component(
    entity_id: SceneEntityId,
    component_id: SceneComponentId,
    timestamp: SceneCrdtTimestamp,
    maybe_entry: Option<&[u8]>,
) -> CrdtMessage {
    let content_len = maybe_entry.map(|entry| entry.len()).unwrap_or(0);
    let length = content_len + 12 + if maybe_entry.is_some() { 4 } else { 0 } + 8;

    let mut buf = Vec::with_capacity(length);
    let mut writer = CrdtWriter::new(&mut buf);
    writer.write_u32(length as u32);

    let message_type = if maybe_entry.is_some() {
        CrdtMessageType::PutComponent
    } else {
        CrdtMessageType::DeleteComponent
    };
    writer.write(&message_type);

    writer.write(&entity_id);
    writer.write(&component_id);
    writer.write(&timestamp);

    if let Some(entry) = maybe_entry {
        writer.write_u32(content_len as u32);
        writer.write_raw(entry)
    }

    CrdtMessage {
        message_type,
        entity: entity_id,
        component: Some(component_id),
        frame: buf,
    }
}

pub fn append_component(
    entity_id: SceneEntityId,
    component_id: SceneComponentId,
    entry: &[u8],
) -> CrdtMessage {
    let content_len = entry.len();
    let length = content_len + 12 + 4 + 8;

    let mut buf = Vec::with_capacity(length);
    let mut writer = CrdtWriter::new(&mut buf);
    writer.write_u32(length as u32);
    writer.write(&CrdtMessageType::AppendValue);

    writer.write(&entity_id);
    writer.write(&component_id);
    writer.write(&SceneCrdtTimestamp(0));

    writer.write_u32(content_len as u32);
    writer.write_raw(entry);

    CrdtMessage {
        message_type: CrdtMessageType::AppendValue,
        entity: entity_id,
        component: Some(component_id),
        frame: buf,
    }
}

pub fn delete_entity(entity_id: SceneEntityId) -> CrdtMessage {
    let mut buf = Vec::with_capacity(12);
    let mut writer = CrdtWriter::new(&mut buf);

    writer.write_u32(12);
    writer.write(&CrdtMessageType::DeleteEntity);
    writer.write(&entity_id);

    CrdtMessage {
        message_type: CrdtMessageType::DeleteEntity,
        entity: entity_id,
        component: None,
        frame: buf,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_frame_length_matches_header() {
        let message = put_component(
            SceneEntityId::new(512, 0),
            SceneComponentId::TRANSFORM,
            SceneCrdtTimestamp(1),
            Some(&[1, 2, 3, 4]),
        );
        let header_length = u32::from_le_bytes(message.frame[0..4].try_into().unwrap());
        assert_eq!(header_length as usize, message.frame.len());
        assert_eq!(message.frame.len(), 8 + 12 + 4 + 4);
    }

    #[test]
    fn put_without_entry_is_a_delete_component() {
        let message = put_component(
            SceneEntityId::new(512, 0),
            SceneComponentId::TRANSFORM,
            SceneCrdtTimestamp(3),
            None,
        );
        assert_eq!(message.message_type, CrdtMessageType::DeleteComponent);
        assert_eq!(message.frame.len(), 8 + 12);
    }

    #[test]
    fn delete_entity_frame_is_12_bytes() {
        let message = delete_entity(SceneEntityId::new(600, 0));
        assert_eq!(message.frame.len(), 12);
        let header_length = u32::from_le_bytes(message.frame[0..4].try_into().unwrap());
        assert_eq!(header_length, 12);
    }
}
