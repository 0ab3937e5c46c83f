// walks a batch of consecutive framed messages. partial trailing messages
// are never consumed; frames claiming a length below the header size mean
// the stream itself is corrupt and abort the batch.

use scene_component::{CrdtReader, CrdtReaderError};

use super::CRDT_HEADER_SIZE;

pub struct RawCrdtMessage<'a> {
    pub message_type: u32,
    pub body: CrdtReader<'a>,
}

pub struct CrdtStreamReader<'a> {
    reader: CrdtReader<'a>,
}

impl<'a> CrdtStreamReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            reader: CrdtReader::new(buffer),
        }
    }

    pub fn next_message(&mut self) -> Result<Option<RawCrdtMessage<'a>>, CrdtReaderError> {
        if self.reader.len() < CRDT_HEADER_SIZE {
            return Ok(None);
        }

        // peek the header before consuming anything
        let mut peek = CrdtReader::new(self.reader.as_slice());
        let length = peek.read_u32()? as usize;
        if length < CRDT_HEADER_SIZE {
            return Err(CrdtReaderError::OutOfBounds);
        }
        if length > self.reader.len() {
            // partial message, wait for the rest
            return Ok(None);
        }

        let mut message = self.reader.take_reader(length);
        let _length = message.read_u32()?;
        let message_type = message.read_u32()?;

        Ok(Some(RawCrdtMessage {
            message_type,
            body: message,
        }))
    }
}
