use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::MessageError;
use crate::message::p2p::*;
use crate::message::Message;
use crate::network::{Connection, ServerHandler};
use crate::procedures::Procedures;
use crate::routing::identifier::Identifier;
use crate::routing::Routing;
use crate::storage::Storage;

/// Handler for peer-to-peer requests
///
/// Serves the routing operations `FIND SUCCESSOR`, `PREDECESSOR GET`,
/// `NOTIFY` and `PING` as well as the storage operations other peers
/// forward to the responsible node.
pub struct P2PHandler {
    routing: Arc<Mutex<Routing>>,
    storage: Arc<Mutex<Storage>>,
    procedures: Procedures,
    ring_bits: u8,
}

impl P2PHandler {
    /// Creates a new `P2PHandler` instance.
    pub fn new(
        routing: Arc<Mutex<Routing>>,
        storage: Arc<Mutex<Storage>>,
        config: &Config,
    ) -> Self {
        let procedures = Procedures::new(config);

        Self {
            routing,
            storage,
            procedures,
            ring_bits: config.ring_bits,
        }
    }

    fn responsible_for(&self, identifier: &Identifier) -> bool {
        let routing = self.routing.lock().unwrap();

        routing.responsible_for(identifier)
    }

    fn handle_find_successor(
        &self,
        mut con: Connection,
        find_successor: FindSuccessor,
    ) -> crate::Result<()> {
        let identifier = find_successor.identifier;

        log::debug!("Received FIND SUCCESSOR request for {}", identifier);

        let node = self.procedures.resolve_successor(&self.routing, &identifier);

        log::debug!("Replying with SUCCESSOR FOUND naming {}", node);

        con.send(&Message::SuccessorFound(SuccessorFound { node }))?;

        Ok(())
    }

    fn handle_predecessor_get(&self, mut con: Connection) -> crate::Result<()> {
        let node = {
            let routing = self.routing.lock().unwrap();

            routing.predecessor().cloned()
        };

        con.send(&Message::PredecessorReply(PredecessorReply { node }))?;

        Ok(())
    }

    fn handle_notify(&self, mut con: Connection, notify: Notify) -> crate::Result<()> {
        log::debug!("Received NOTIFY from {}", notify.node);

        {
            let mut routing = self.routing.lock().unwrap();
            routing.notify(notify.node);
        }

        con.send(&Message::NotifyAck(NotifyAck))?;

        Ok(())
    }

    fn handle_ping(&self, mut con: Connection) -> crate::Result<()> {
        con.send(&Message::Pong(Pong))?;

        Ok(())
    }

    fn handle_storage_put(
        &self,
        mut con: Connection,
        storage_put: StoragePut,
    ) -> crate::Result<()> {
        let key = storage_put.key;
        let identifier = Identifier::hash(&key, self.ring_bits);

        log::info!("Received STORAGE PUT request for key {}", key);

        let msg = if self.responsible_for(&identifier) {
            let mut storage = self.storage.lock().unwrap();
            storage.put(key.clone(), storage_put.value);

            Message::StoragePutSuccess(StoragePutSuccess { key })
        } else {
            log::warn!("Not responsible for key {}, replying with STORAGE FAILURE", key);

            Message::StorageFailure(StorageFailure { key })
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_storage_get(
        &self,
        mut con: Connection,
        storage_get: StorageGet,
    ) -> crate::Result<()> {
        let key = storage_get.key;
        let identifier = Identifier::hash(&key, self.ring_bits);

        log::info!("Received STORAGE GET request for key {}", key);

        let value = if self.responsible_for(&identifier) {
            let storage = self.storage.lock().unwrap();
            storage.get(&key)
        } else {
            log::warn!("Not responsible for key {}, replying with STORAGE FAILURE", key);

            None
        };

        let msg = match value {
            Some(value) => Message::StorageGetSuccess(StorageGetSuccess { key, value }),
            None => Message::StorageFailure(StorageFailure { key }),
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_storage_delete(
        &self,
        mut con: Connection,
        storage_delete: StorageDelete,
    ) -> crate::Result<()> {
        let key = storage_delete.key;
        let identifier = Identifier::hash(&key, self.ring_bits);

        log::info!("Received STORAGE DELETE request for key {}", key);

        let deleted = if self.responsible_for(&identifier) {
            let mut storage = self.storage.lock().unwrap();
            storage.delete(&key)
        } else {
            log::warn!("Not responsible for key {}, replying with STORAGE FAILURE", key);

            false
        };

        let msg = if deleted {
            Message::StorageDeleteSuccess(StorageDeleteSuccess { key })
        } else {
            Message::StorageFailure(StorageFailure { key })
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_connection(&self, mut con: Connection) -> crate::Result<()> {
        let msg = con.receive()?;

        log::debug!("P2P handler received message of type {}", msg);

        match msg {
            Message::FindSuccessor(find_successor) => {
                self.handle_find_successor(con, find_successor)
            }
            Message::PredecessorGet(_) => self.handle_predecessor_get(con),
            Message::Notify(notify) => self.handle_notify(con, notify),
            Message::Ping(_) => self.handle_ping(con),
            Message::StoragePut(storage_put) => self.handle_storage_put(con, storage_put),
            Message::StorageGet(storage_get) => self.handle_storage_get(con, storage_get),
            Message::StorageDelete(storage_delete) => {
                self.handle_storage_delete(con, storage_delete)
            }
            _ => Err(Box::new(MessageError::new(msg))),
        }
    }

    fn handle_error(&self, error: &dyn Error) {
        log::error!("Error in P2PHandler: {}", error)
    }
}

impl ServerHandler for P2PHandler {
    fn handle_connection(&self, connection: Connection) {
        if let Err(err) = self.handle_connection(connection) {
            self.handle_error(&*err);
        }
    }

    fn handle_error(&self, error: io::Error) {
        self.handle_error(&error)
    }
}
