use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::MessageError;
use crate::message::api::*;
use crate::message::Message;
use crate::network::{Connection, ServerHandler};
use crate::procedures::Procedures;
use crate::routing::identifier::Identifier;
use crate::routing::{NodeRef, Routing};

/// Handler for api requests
///
/// Every request carries a raw key. The handler hashes it into the ring,
/// resolves the responsible node with the core lookup and forwards the
/// storage operation to that node's peer interface; the node never
/// answers from its own store directly, so the api path and the peer
/// path stay identical.
pub struct ApiHandler {
    routing: Arc<Mutex<Routing>>,
    procedures: Procedures,
    ring_bits: u8,
}

impl ApiHandler {
    /// Creates a new `ApiHandler` instance.
    pub fn new(routing: Arc<Mutex<Routing>>, config: &Config) -> Self {
        let procedures = Procedures::new(config);

        Self {
            routing,
            procedures,
            ring_bits: config.ring_bits,
        }
    }

    fn resolve_owner(&self, key: &str) -> NodeRef {
        let identifier = Identifier::hash(key, self.ring_bits);

        self.procedures.resolve_successor(&self.routing, &identifier)
    }

    fn handle_put(&self, mut con: Connection, put: Put) -> crate::Result<()> {
        log::info!("Received PUT request for key {}", put.key);

        let owner = self.resolve_owner(&put.key);

        let msg = match self.procedures.put_value(&owner.address, &put.key, &put.value) {
            Ok(true) => Message::Success(Success {
                key: put.key,
                value: String::new(),
            }),
            Ok(false) => Message::Failure(Failure { key: put.key }),
            Err(err) => {
                log::warn!("Could not store key {} at {}: {}", put.key, owner, err);

                Message::Failure(Failure { key: put.key })
            }
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_get(&self, mut con: Connection, get: Get) -> crate::Result<()> {
        log::info!("Received GET request for key {}", get.key);

        let owner = self.resolve_owner(&get.key);

        let msg = match self.procedures.get_value(&owner.address, &get.key) {
            Ok(Some(value)) => Message::Success(Success {
                key: get.key,
                value,
            }),
            Ok(None) => Message::Failure(Failure { key: get.key }),
            Err(err) => {
                log::warn!("Could not get key {} from {}: {}", get.key, owner, err);

                Message::Failure(Failure { key: get.key })
            }
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_delete(&self, mut con: Connection, delete: Delete) -> crate::Result<()> {
        log::info!("Received DELETE request for key {}", delete.key);

        let owner = self.resolve_owner(&delete.key);

        let msg = match self.procedures.delete_value(&owner.address, &delete.key) {
            Ok(true) => Message::Success(Success {
                key: delete.key,
                value: String::new(),
            }),
            Ok(false) => Message::Failure(Failure { key: delete.key }),
            Err(err) => {
                log::warn!("Could not delete key {} at {}: {}", delete.key, owner, err);

                Message::Failure(Failure { key: delete.key })
            }
        };

        con.send(&msg)?;

        Ok(())
    }

    fn handle_connection(&self, mut con: Connection) -> crate::Result<()> {
        let msg = con.receive()?;

        log::debug!("Api handler received message of type {}", msg);

        match msg {
            Message::Put(put) => self.handle_put(con, put),
            Message::Get(get) => self.handle_get(con, get),
            Message::Delete(delete) => self.handle_delete(con, delete),
            _ => Err(Box::new(MessageError::new(msg))),
        }
    }

    fn handle_error(&self, error: &dyn Error) {
        log::error!("Error in ApiHandler: {}", error)
    }
}

impl ServerHandler for ApiHandler {
    fn handle_connection(&self, connection: Connection) {
        if let Err(err) = self.handle_connection(connection) {
            self.handle_error(&*err);
        }
    }

    fn handle_error(&self, error: io::Error) {
        self.handle_error(&error)
    }
}
