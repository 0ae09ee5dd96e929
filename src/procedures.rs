//! A collection of procedures used in various places.

use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::error::MessageError;
use crate::message::p2p::{
    FindSuccessor, Notify, Ping, PredecessorGet, StorageDelete, StorageGet, StoragePut,
};
use crate::message::Message;
use crate::network::Connection;
use crate::routing::identifier::Identifier;
use crate::routing::{NodeRef, Routing};

/// Outbound peer calls plus the lookup algorithm built on top of them
///
/// Stabilization calls run with the short `rpc_timeout`; lookups and
/// storage forwarding, which a client is waiting on, get the longer
/// `lookup_timeout`.
#[derive(Clone)]
pub struct Procedures {
    rpc_timeout: Duration,
    lookup_timeout: Duration,
}

impl Procedures {
    pub fn new(config: &Config) -> Self {
        Self {
            rpc_timeout: config.ping_timeout,
            lookup_timeout: config.lookup_timeout,
        }
    }

    /// Resolves the node responsible for `identifier`.
    ///
    /// If the identifier falls into (current, successor] the successor is
    /// the answer. Otherwise the request is forwarded to the closest
    /// preceding finger, which resolves it recursively. A failed forward
    /// is answered with the local successor instead of an error; the
    /// stabilization loop repairs the finger that pointed at the dead
    /// peer on a later tick.
    ///
    /// The routing lock is only held while snapshotting, never during
    /// the forwarded call.
    pub fn resolve_successor(&self, routing: &Mutex<Routing>, identifier: &Identifier) -> NodeRef {
        let (current, successor, candidate) = {
            let routing = routing.lock().unwrap();

            (
                routing.current().clone(),
                routing.successor().clone(),
                routing.closest_preceding_finger(identifier),
            )
        };

        if identifier.in_range(&current.id, &successor.id, true, true) {
            return successor;
        }

        if candidate.id == current.id {
            // no finger made progress, the successor is the best guess
            return successor;
        }

        match self.find_successor(identifier, &candidate.address) {
            Ok(node) => node,
            Err(err) => {
                log::warn!(
                    "Lookup of {} via {} failed, falling back to successor: {}",
                    identifier,
                    candidate.address,
                    err
                );

                successor
            }
        }
    }

    /// Asks the peer at `peer_addr` to resolve `identifier`.
    pub fn find_successor(
        &self,
        identifier: &Identifier,
        peer_addr: &str,
    ) -> crate::Result<NodeRef> {
        log::debug!("Finding successor of {} via {}", identifier, peer_addr);

        let mut con = Connection::open(peer_addr, self.lookup_timeout)?;
        let find_successor = FindSuccessor {
            identifier: *identifier,
        };

        let msg = con.request(&Message::FindSuccessor(find_successor))?;

        if let Message::SuccessorFound(successor_found) = msg {
            log::debug!(
                "Successor of {} is {}",
                identifier,
                successor_found.node
            );

            Ok(successor_found.node)
        } else {
            Err(Box::new(MessageError::new(msg)))
        }
    }

    /// Queries the current predecessor of the peer at `peer_addr`.
    pub fn get_predecessor(&self, peer_addr: &str) -> crate::Result<Option<NodeRef>> {
        log::debug!("Getting predecessor of peer {}", peer_addr);

        let mut con = Connection::open(peer_addr, self.rpc_timeout)?;

        let msg = con.request(&Message::PredecessorGet(PredecessorGet))?;

        if let Message::PredecessorReply(predecessor_reply) = msg {
            Ok(predecessor_reply.node)
        } else {
            Err(Box::new(MessageError::new(msg)))
        }
    }

    /// Tells the peer at `peer_addr` that `current` might be its
    /// predecessor.
    pub fn notify(&self, current: &NodeRef, peer_addr: &str) -> crate::Result<()> {
        log::debug!("Notifying peer {}", peer_addr);

        let mut con = Connection::open(peer_addr, self.rpc_timeout)?;
        let notify = Notify {
            node: current.clone(),
        };

        let msg = con.request(&Message::Notify(notify))?;

        if let Message::NotifyAck(_) = msg {
            Ok(())
        } else {
            Err(Box::new(MessageError::new(msg)))
        }
    }

    /// Probes the peer at `peer_addr` for liveness.
    pub fn ping(&self, peer_addr: &str) -> crate::Result<()> {
        let mut con = Connection::open(peer_addr, self.rpc_timeout)?;

        let msg = con.request(&Message::Ping(Ping))?;

        if let Message::Pong(_) = msg {
            Ok(())
        } else {
            Err(Box::new(MessageError::new(msg)))
        }
    }

    /// Stores a pair at the peer responsible for it.
    pub fn put_value(&self, peer_addr: &str, key: &str, value: &str) -> crate::Result<bool> {
        log::debug!("Put value for key {} to peer {}", key, peer_addr);

        let storage_put = StoragePut {
            key: key.to_string(),
            value: value.to_string(),
        };

        let mut con = Connection::open(peer_addr, self.lookup_timeout)?;
        let msg = con.request(&Message::StoragePut(storage_put))?;

        match msg {
            Message::StoragePutSuccess(_) => Ok(true),
            Message::StorageFailure(_) => {
                log::warn!("Peer {} refused to store key {}", peer_addr, key);

                Ok(false)
            }
            msg => Err(Box::new(MessageError::new(msg))),
        }
    }

    /// Fetches the value for `key` from the peer responsible for it.
    pub fn get_value(&self, peer_addr: &str, key: &str) -> crate::Result<Option<String>> {
        log::debug!("Get value for key {} from peer {}", key, peer_addr);

        let storage_get = StorageGet {
            key: key.to_string(),
        };

        let mut con = Connection::open(peer_addr, self.lookup_timeout)?;
        let msg = con.request(&Message::StorageGet(storage_get))?;

        match msg {
            Message::StorageGetSuccess(storage_success) => Ok(Some(storage_success.value)),
            Message::StorageFailure(_) => Ok(None),
            msg => Err(Box::new(MessageError::new(msg))),
        }
    }

    /// Removes the pair for `key` from the peer responsible for it.
    pub fn delete_value(&self, peer_addr: &str, key: &str) -> crate::Result<bool> {
        log::debug!("Delete value for key {} from peer {}", key, peer_addr);

        let storage_delete = StorageDelete {
            key: key.to_string(),
        };

        let mut con = Connection::open(peer_addr, self.lookup_timeout)?;
        let msg = con.request(&Message::StorageDelete(storage_delete))?;

        match msg {
            Message::StorageDeleteSuccess(_) => Ok(true),
            Message::StorageFailure(_) => Ok(false),
            msg => Err(Box::new(MessageError::new(msg))),
        }
    }
}
