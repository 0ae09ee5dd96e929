use std::io::{self, Cursor};

use crate::message::{read_string, write_string};
use crate::routing::identifier::Identifier;
use crate::routing::NodeRef;

#[derive(Debug)]
pub struct FindSuccessor {
    pub identifier: Identifier,
}

#[derive(Debug)]
pub struct SuccessorFound {
    pub node: NodeRef,
}

#[derive(Debug)]
pub struct PredecessorGet;

#[derive(Debug)]
pub struct PredecessorReply {
    pub node: Option<NodeRef>,
}

#[derive(Debug)]
pub struct Notify {
    pub node: NodeRef,
}

#[derive(Debug)]
pub struct NotifyAck;

#[derive(Debug)]
pub struct Ping;

#[derive(Debug)]
pub struct Pong;

#[derive(Debug)]
pub struct StoragePut {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
pub struct StorageGet {
    pub key: String,
}

#[derive(Debug)]
pub struct StorageDelete {
    pub key: String,
}

#[derive(Debug)]
pub struct StoragePutSuccess {
    pub key: String,
}

#[derive(Debug)]
pub struct StorageGetSuccess {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
pub struct StorageDeleteSuccess {
    pub key: String,
}

#[derive(Debug)]
pub struct StorageFailure {
    pub key: String,
}

/// Reads a node reference encoded as two string fields.
///
/// The identifier travels as a decimal string; a reference with both
/// fields empty marks an absent node.
pub(crate) fn read_node_ref(cursor: &mut Cursor<&[u8]>) -> io::Result<Option<NodeRef>> {
    let id = read_string(cursor)?;
    let address = read_string(cursor)?;

    if id.is_empty() && address.is_empty() {
        return Ok(None);
    }

    let id = Identifier::from_decimal(&id).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "Invalid identifier encoding")
    })?;

    Ok(Some(NodeRef { id, address }))
}

pub(crate) fn write_node_ref(buffer: &mut Vec<u8>, node: Option<&NodeRef>) -> io::Result<()> {
    match node {
        Some(node) => {
            write_string(buffer, &node.id.to_decimal())?;
            write_string(buffer, &node.address)
        }
        None => {
            write_string(buffer, "")?;
            write_string(buffer, "")
        }
    }
}

fn require_node(node: Option<NodeRef>) -> io::Result<NodeRef> {
    node.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing node reference"))
}

impl FindSuccessor {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let encoded = read_string(&mut cursor)?;

        let identifier = Identifier::from_decimal(&encoded).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Invalid identifier encoding")
        })?;

        Ok(FindSuccessor { identifier })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.identifier.to_decimal())
    }
}

impl SuccessorFound {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let node = require_node(read_node_ref(&mut cursor)?)?;

        Ok(SuccessorFound { node })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_node_ref(buffer, Some(&self.node))
    }
}

impl PredecessorReply {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let node = read_node_ref(&mut cursor)?;

        Ok(PredecessorReply { node })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_node_ref(buffer, self.node.as_ref())
    }
}

impl Notify {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let node = require_node(read_node_ref(&mut cursor)?)?;

        Ok(Notify { node })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_node_ref(buffer, Some(&self.node))
    }
}

impl StoragePut {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;
        let value = read_string(&mut cursor)?;

        Ok(StoragePut { key, value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)?;
        write_string(buffer, &self.value)
    }
}

impl StorageGet {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(StorageGet { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl StorageDelete {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(StorageDelete { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl StoragePutSuccess {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(StoragePutSuccess { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl StorageGetSuccess {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;
        let value = read_string(&mut cursor)?;

        Ok(StorageGetSuccess { key, value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)?;
        write_string(buffer, &self.value)
    }
}

impl StorageDeleteSuccess {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(StorageDeleteSuccess { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl StorageFailure {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(StorageFailure { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn round_trip(msg: &Message) -> Message {
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();
        Message::parse(&buffer).unwrap()
    }

    #[test]
    fn find_successor_carries_a_decimal_identifier() {
        let identifier = Identifier::from(12345u64).finger_start(40, 160);
        let msg = Message::FindSuccessor(FindSuccessor { identifier });

        match round_trip(&msg) {
            Message::FindSuccessor(parsed) => assert_eq!(identifier, parsed.identifier),
            msg => panic!("unexpected message {}", msg),
        }
    }

    #[test]
    fn absent_predecessor_is_encoded_as_empty_fields() {
        let msg = Message::PredecessorReply(PredecessorReply { node: None });

        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();

        // size, type and two empty strings
        assert_eq!(8, buffer.len());

        match Message::parse(&buffer).unwrap() {
            Message::PredecessorReply(parsed) => assert!(parsed.node.is_none()),
            msg => panic!("unexpected message {}", msg),
        }
    }

    #[test]
    fn present_node_refs_survive_the_round_trip() {
        let node = NodeRef::new("127.0.0.1:9000", 8);
        let msg = Message::SuccessorFound(SuccessorFound { node: node.clone() });

        match round_trip(&msg) {
            Message::SuccessorFound(parsed) => {
                assert_eq!(node.id, parsed.node.id);
                assert_eq!(node.address, parsed.node.address);
            }
            msg => panic!("unexpected message {}", msg),
        }
    }

    #[test]
    fn notify_without_a_node_is_rejected() {
        let msg = Message::PredecessorReply(PredecessorReply { node: None });
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();

        // rewrite the type tag to NOTIFY, which requires a node
        buffer[2] = (1054 >> 8) as u8;
        buffer[3] = (1054 & 0xff) as u8;

        assert!(Message::parse(&buffer).is_err());
    }

    #[test]
    fn storage_put_keeps_key_and_value_apart() {
        let msg = Message::StoragePut(StoragePut {
            key: "alpha".to_string(),
            value: "beta".to_string(),
        });

        match round_trip(&msg) {
            Message::StoragePut(parsed) => {
                assert_eq!("alpha", parsed.key);
                assert_eq!("beta", parsed.value);
            }
            msg => panic!("unexpected message {}", msg),
        }
    }
}
