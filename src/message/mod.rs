//! Implementation of the wire message types, split into api and
//! peer-to-peer messages.
//!
//! The [`Message`] enum combines these messages and provides an
//! abstraction for sending messages over a TCP stream using the
//! [`Connection`] struct. Every message is framed by its total size and a
//! type tag, both 16 bit network-endian integers; string fields are
//! length-prefixed UTF-8 and identifiers travel as decimal strings so
//! that any ring width up to 160 bits fits without bignum encodings.
//!
//! [`Message`]: enum.Message.html
//! [`Connection`]: ../network/struct.Connection.html

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::prelude::*;
use std::io::{self, Cursor};

pub mod api;
pub mod p2p;

/// This enum contains the different message types supported by this
/// module.
///
/// For each message type, there exists a corresponding struct holding the
/// contents of this message.
///
/// # Api message types
///
/// Client-facing messages accepted on the api interface:
///
/// * [`Put`](#variant.Put)
/// * [`Get`](#variant.Get)
/// * [`Delete`](#variant.Delete)
/// * [`Success`](#variant.Success)
/// * [`Failure`](#variant.Failure)
///
/// # P2P message types
///
/// Messages exchanged between peers:
///
/// * [`StoragePut`](#variant.StoragePut)
/// * [`StorageGet`](#variant.StorageGet)
/// * [`StorageDelete`](#variant.StorageDelete)
/// * [`StoragePutSuccess`](#variant.StoragePutSuccess)
/// * [`StorageGetSuccess`](#variant.StorageGetSuccess)
/// * [`StorageDeleteSuccess`](#variant.StorageDeleteSuccess)
/// * [`StorageFailure`](#variant.StorageFailure)
/// * [`FindSuccessor`](#variant.FindSuccessor)
/// * [`SuccessorFound`](#variant.SuccessorFound)
/// * [`PredecessorGet`](#variant.PredecessorGet)
/// * [`PredecessorReply`](#variant.PredecessorReply)
/// * [`Notify`](#variant.Notify)
/// * [`NotifyAck`](#variant.NotifyAck)
/// * [`Ping`](#variant.Ping)
/// * [`Pong`](#variant.Pong)
#[derive(Debug)]
pub enum Message {
    /// Store the given key-value pair in the network.
    Put(api::Put),
    /// Look up the value stored for the given key.
    Get(api::Get),
    /// Remove the value stored for the given key.
    Delete(api::Delete),
    /// A previous api request succeeded.
    Success(api::Success),
    /// A previous api request failed or found nothing.
    Failure(api::Failure),
    /// Store a pair at the peer responsible for it.
    StoragePut(p2p::StoragePut),
    /// Obtain the value for a key from the responsible peer.
    StorageGet(p2p::StorageGet),
    /// Remove a pair from the responsible peer.
    StorageDelete(p2p::StorageDelete),
    /// Reply to a successful `STORAGE PUT`.
    StoragePutSuccess(p2p::StoragePutSuccess),
    /// Reply to a successful `STORAGE GET`, carrying the value.
    StorageGetSuccess(p2p::StorageGetSuccess),
    /// Reply to a successful `STORAGE DELETE`.
    StorageDeleteSuccess(p2p::StorageDeleteSuccess),
    /// A storage operation failed at the responsible peer.
    StorageFailure(p2p::StorageFailure),
    /// Resolve the node responsible for an identifier.
    FindSuccessor(p2p::FindSuccessor),
    /// Reply to `FIND SUCCESSOR` with the responsible node.
    SuccessorFound(p2p::SuccessorFound),
    /// Query the predecessor of a peer.
    PredecessorGet(p2p::PredecessorGet),
    /// Reply to `PREDECESSOR GET`; the node may be absent.
    PredecessorReply(p2p::PredecessorReply),
    /// Tell a peer about a potential predecessor.
    Notify(p2p::Notify),
    /// Acknowledge a `NOTIFY`.
    NotifyAck(p2p::NotifyAck),
    /// Liveness probe.
    Ping(p2p::Ping),
    /// Reply to `PING`.
    Pong(p2p::Pong),
}

impl Message {
    pub const MAX_LENGTH: usize = 64000;

    const PUT: u16 = 650;
    const GET: u16 = 651;
    const DELETE: u16 = 652;
    const SUCCESS: u16 = 653;
    const FAILURE: u16 = 654;

    const STORAGE_PUT: u16 = 1000;
    const STORAGE_GET: u16 = 1001;
    const STORAGE_DELETE: u16 = 1002;
    const STORAGE_PUT_SUCCESS: u16 = 1003;
    const STORAGE_GET_SUCCESS: u16 = 1004;
    const STORAGE_DELETE_SUCCESS: u16 = 1005;
    const STORAGE_FAILURE: u16 = 1006;

    const FIND_SUCCESSOR: u16 = 1050;
    const SUCCESSOR_FOUND: u16 = 1051;
    const PREDECESSOR_GET: u16 = 1052;
    const PREDECESSOR_REPLY: u16 = 1053;
    const NOTIFY: u16 = 1054;
    const NOTIFY_ACK: u16 = 1055;
    const PING: u16 = 1056;
    const PONG: u16 = 1057;

    pub fn parse(buffer: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buffer);
        let size = cursor.read_u16::<NetworkEndian>()? as usize;
        let msg_type = cursor.read_u16::<NetworkEndian>()?;

        if buffer.len() != size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Non-matching message size",
            ));
        }

        let msg = match msg_type {
            Self::PUT => Message::Put(api::Put::parse(cursor)?),
            Self::GET => Message::Get(api::Get::parse(cursor)?),
            Self::DELETE => Message::Delete(api::Delete::parse(cursor)?),
            Self::SUCCESS => Message::Success(api::Success::parse(cursor)?),
            Self::FAILURE => Message::Failure(api::Failure::parse(cursor)?),
            Self::STORAGE_PUT => Message::StoragePut(p2p::StoragePut::parse(cursor)?),
            Self::STORAGE_GET => Message::StorageGet(p2p::StorageGet::parse(cursor)?),
            Self::STORAGE_DELETE => Message::StorageDelete(p2p::StorageDelete::parse(cursor)?),
            Self::STORAGE_PUT_SUCCESS => {
                Message::StoragePutSuccess(p2p::StoragePutSuccess::parse(cursor)?)
            }
            Self::STORAGE_GET_SUCCESS => {
                Message::StorageGetSuccess(p2p::StorageGetSuccess::parse(cursor)?)
            }
            Self::STORAGE_DELETE_SUCCESS => {
                Message::StorageDeleteSuccess(p2p::StorageDeleteSuccess::parse(cursor)?)
            }
            Self::STORAGE_FAILURE => Message::StorageFailure(p2p::StorageFailure::parse(cursor)?),
            Self::FIND_SUCCESSOR => Message::FindSuccessor(p2p::FindSuccessor::parse(cursor)?),
            Self::SUCCESSOR_FOUND => Message::SuccessorFound(p2p::SuccessorFound::parse(cursor)?),
            Self::PREDECESSOR_GET => Message::PredecessorGet(p2p::PredecessorGet),
            Self::PREDECESSOR_REPLY => {
                Message::PredecessorReply(p2p::PredecessorReply::parse(cursor)?)
            }
            Self::NOTIFY => Message::Notify(p2p::Notify::parse(cursor)?),
            Self::NOTIFY_ACK => Message::NotifyAck(p2p::NotifyAck),
            Self::PING => Message::Ping(p2p::Ping),
            Self::PONG => Message::Pong(p2p::Pong),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Invalid message type",
                ))
            }
        };

        Ok(msg)
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        // reserve two bytes for size
        buffer.write_u16::<NetworkEndian>(0)?;

        match self {
            Message::Put(put) => {
                buffer.write_u16::<NetworkEndian>(Self::PUT)?;
                put.write_bytes(buffer)?;
            }
            Message::Get(get) => {
                buffer.write_u16::<NetworkEndian>(Self::GET)?;
                get.write_bytes(buffer)?;
            }
            Message::Delete(delete) => {
                buffer.write_u16::<NetworkEndian>(Self::DELETE)?;
                delete.write_bytes(buffer)?;
            }
            Message::Success(success) => {
                buffer.write_u16::<NetworkEndian>(Self::SUCCESS)?;
                success.write_bytes(buffer)?;
            }
            Message::Failure(failure) => {
                buffer.write_u16::<NetworkEndian>(Self::FAILURE)?;
                failure.write_bytes(buffer)?;
            }
            Message::StoragePut(storage_put) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_PUT)?;
                storage_put.write_bytes(buffer)?;
            }
            Message::StorageGet(storage_get) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_GET)?;
                storage_get.write_bytes(buffer)?;
            }
            Message::StorageDelete(storage_delete) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_DELETE)?;
                storage_delete.write_bytes(buffer)?;
            }
            Message::StoragePutSuccess(put_success) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_PUT_SUCCESS)?;
                put_success.write_bytes(buffer)?;
            }
            Message::StorageGetSuccess(get_success) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_GET_SUCCESS)?;
                get_success.write_bytes(buffer)?;
            }
            Message::StorageDeleteSuccess(delete_success) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_DELETE_SUCCESS)?;
                delete_success.write_bytes(buffer)?;
            }
            Message::StorageFailure(storage_failure) => {
                buffer.write_u16::<NetworkEndian>(Self::STORAGE_FAILURE)?;
                storage_failure.write_bytes(buffer)?;
            }
            Message::FindSuccessor(find_successor) => {
                buffer.write_u16::<NetworkEndian>(Self::FIND_SUCCESSOR)?;
                find_successor.write_bytes(buffer)?;
            }
            Message::SuccessorFound(successor_found) => {
                buffer.write_u16::<NetworkEndian>(Self::SUCCESSOR_FOUND)?;
                successor_found.write_bytes(buffer)?;
            }
            Message::PredecessorGet(_) => {
                buffer.write_u16::<NetworkEndian>(Self::PREDECESSOR_GET)?;
            }
            Message::PredecessorReply(predecessor_reply) => {
                buffer.write_u16::<NetworkEndian>(Self::PREDECESSOR_REPLY)?;
                predecessor_reply.write_bytes(buffer)?;
            }
            Message::Notify(notify) => {
                buffer.write_u16::<NetworkEndian>(Self::NOTIFY)?;
                notify.write_bytes(buffer)?;
            }
            Message::NotifyAck(_) => {
                buffer.write_u16::<NetworkEndian>(Self::NOTIFY_ACK)?;
            }
            Message::Ping(_) => {
                buffer.write_u16::<NetworkEndian>(Self::PING)?;
            }
            Message::Pong(_) => {
                buffer.write_u16::<NetworkEndian>(Self::PONG)?;
            }
        }

        // write size at beginning of buffer
        let size = buffer.len();

        if size > Self::MAX_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Message exceeded maximum length",
            ));
        }

        buffer.as_mut_slice().write_u16::<NetworkEndian>(size as u16)?;

        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Message::Put(_) => "PUT",
            Message::Get(_) => "GET",
            Message::Delete(_) => "DELETE",
            Message::Success(_) => "SUCCESS",
            Message::Failure(_) => "FAILURE",
            Message::StoragePut(_) => "STORAGE PUT",
            Message::StorageGet(_) => "STORAGE GET",
            Message::StorageDelete(_) => "STORAGE DELETE",
            Message::StoragePutSuccess(_) => "STORAGE PUT SUCCESS",
            Message::StorageGetSuccess(_) => "STORAGE GET SUCCESS",
            Message::StorageDeleteSuccess(_) => "STORAGE DELETE SUCCESS",
            Message::StorageFailure(_) => "STORAGE FAILURE",
            Message::FindSuccessor(_) => "FIND SUCCESSOR",
            Message::SuccessorFound(_) => "SUCCESSOR FOUND",
            Message::PredecessorGet(_) => "PREDECESSOR GET",
            Message::PredecessorReply(_) => "PREDECESSOR REPLY",
            Message::Notify(_) => "NOTIFY",
            Message::NotifyAck(_) => "NOTIFY ACK",
            Message::Ping(_) => "PING",
            Message::Pong(_) => "PONG",
        };

        f.write_str(name)
    }
}

/// Reads a length-prefixed UTF-8 string field.
pub(crate) fn read_string(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let length = cursor.read_u16::<NetworkEndian>()? as usize;

    let mut bytes = vec![0; length];
    cursor.read_exact(&mut bytes)?;

    String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid utf-8 in string field"))
}

/// Writes a length-prefixed UTF-8 string field.
pub(crate) fn write_string(buffer: &mut Vec<u8>, value: &str) -> io::Result<()> {
    if value.len() > usize::from(u16::max_value()) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "String field exceeds maximum length",
        ));
    }

    buffer.write_u16::<NetworkEndian>(value.len() as u16)?;
    buffer.write_all(value.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();
        Message::parse(&buffer).unwrap()
    }

    #[test]
    fn framing_carries_the_total_size() {
        let msg = Message::Ping(p2p::Ping);
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();

        assert_eq!(4, buffer.len());
        assert_eq!([0, 4], buffer[..2]);
    }

    #[test]
    fn parse_rejects_a_wrong_size_field() {
        let msg = Message::Ping(p2p::Ping);
        let mut buffer = Vec::new();
        msg.write_bytes(&mut buffer).unwrap();
        buffer.push(0);

        assert!(Message::parse(&buffer).is_err());
    }

    #[test]
    fn parse_rejects_unknown_message_types() {
        let buffer = [0u8, 4, 0xff, 0xff];
        assert!(Message::parse(&buffer).is_err());
    }

    #[test]
    fn unit_messages_survive_the_round_trip() {
        match round_trip(&Message::PredecessorGet(p2p::PredecessorGet)) {
            Message::PredecessorGet(_) => {}
            msg => panic!("unexpected message {}", msg),
        }

        match round_trip(&Message::Pong(p2p::Pong)) {
            Message::Pong(_) => {}
            msg => panic!("unexpected message {}", msg),
        }
    }
}
