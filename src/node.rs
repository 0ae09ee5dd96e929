//! Lifecycle of a single overlay node.
//!
//! A [`Node`] bundles the routing state, the storage, the two listeners
//! and the stabilization thread. The hosting process creates it from a
//! [`Config`], calls [`start`] to bring up the servers, [`join`] to enter
//! a ring and [`stop`] to leave the process cleanly. Departure is not
//! announced to the ring; the remaining nodes notice through failing
//! pings, exactly like a crash.
//!
//! [`Node`]: struct.Node.html
//! [`Config`]: ../config/struct.Config.html
//! [`start`]: struct.Node.html#method.start
//! [`join`]: struct.Node.html#method.join
//! [`stop`]: struct.Node.html#method.stop

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::config::Config;
use crate::handler::{ApiHandler, P2PHandler};
use crate::network::Server;
use crate::procedures::Procedures;
use crate::routing::finger::FingerEntry;
use crate::routing::identifier::Identifier;
use crate::routing::{NodeRef, Routing};
use crate::stabilization::Stabilization;
use crate::storage::Storage;

/// One Chord node: routing state, storage and background workers
pub struct Node {
    config: Config,
    current: NodeRef,
    routing: Arc<Mutex<Routing>>,
    storage: Arc<Mutex<Storage>>,
    procedures: Procedures,
    running: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl Node {
    /// Creates a node for the given config.
    ///
    /// The identifier is derived from `listen_address`; until [`join`] is
    /// called the node forms a ring of its own.
    ///
    /// [`join`]: #method.join
    pub fn new(config: Config) -> crate::Result<Self> {
        config.validate()?;

        let current = NodeRef::new(&config.listen_address, config.ring_bits);
        let routing = Routing::new(current.clone(), config.ring_bits);
        let procedures = Procedures::new(&config);

        log::info!("Node {} created for address {}", current.id, current.address);

        Ok(Node {
            current,
            routing: Arc::new(Mutex::new(routing)),
            storage: Arc::new(Mutex::new(Storage::new())),
            procedures,
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            config,
        })
    }

    pub fn id(&self) -> Identifier {
        self.current.id
    }

    pub fn address(&self) -> &str {
        &self.current.address
    }

    pub fn successor(&self) -> NodeRef {
        self.routing.lock().unwrap().successor().clone()
    }

    pub fn predecessor(&self) -> Option<NodeRef> {
        self.routing.lock().unwrap().predecessor().cloned()
    }

    /// Copies the finger table for diagnostics and tests.
    pub fn fingers(&self) -> Vec<FingerEntry> {
        self.routing.lock().unwrap().finger_snapshot()
    }

    /// Resolves the node responsible for `identifier`.
    ///
    /// May contact up to O(log N) peers; failures fall back to the local
    /// successor as described in [`Procedures::resolve_successor`].
    ///
    /// [`Procedures::resolve_successor`]:
    /// ../procedures/struct.Procedures.html#method.resolve_successor
    pub fn find_successor(&self, identifier: &Identifier) -> NodeRef {
        self.procedures.resolve_successor(&self.routing, identifier)
    }

    /// Enters a ring.
    ///
    /// With no bootstrap address the node forms a fresh ring by itself.
    /// Otherwise the bootstrap peer resolves our successor; only a
    /// failure of that first call is returned as an error, so the caller
    /// can retry with another peer. The finger table is filled eagerly
    /// afterwards and corrected lazily by stabilization.
    pub fn join(&self, bootstrap_addr: Option<&str>) -> crate::Result<()> {
        let bootstrap_addr = match bootstrap_addr {
            Some(addr) => addr,
            None => {
                log::info!("Creating a new ring at {}", self.current.address);

                let mut routing = self.routing.lock().unwrap();
                *routing = Routing::new(self.current.clone(), self.config.ring_bits);

                return Ok(());
            }
        };

        log::info!(
            "Joining the ring via bootstrap peer {}",
            bootstrap_addr
        );

        let successor = self
            .procedures
            .find_successor(&self.current.id, bootstrap_addr)?;

        log::info!("Our successor is {}", successor);

        {
            let mut routing = self.routing.lock().unwrap();
            routing.clear_predecessor();
            routing.set_successor(successor);
        }

        let starts: Vec<_> = {
            let routing = self.routing.lock().unwrap();

            (0..routing.fingers())
                .map(|index| routing.finger(index).start)
                .collect()
        };

        for (index, start) in starts.into_iter().enumerate() {
            let owner = self.procedures.resolve_successor(&self.routing, &start);

            self.routing.lock().unwrap().set_finger(index, owner);
        }

        log::info!("Joined the ring via {}", bootstrap_addr);

        Ok(())
    }

    /// Brings up the peer listener, the api listener and the
    /// stabilization thread.
    pub fn start(&mut self) -> crate::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let p2p_handler = P2PHandler::new(
            Arc::clone(&self.routing),
            Arc::clone(&self.storage),
            &self.config,
        );
        let p2p_server = Server::new(Box::new(p2p_handler));
        self.workers.push(p2p_server.listen(
            &self.config.listen_address,
            self.config.worker_threads,
            Arc::clone(&self.running),
        )?);

        let api_handler = ApiHandler::new(Arc::clone(&self.routing), &self.config);
        let api_server = Server::new(Box::new(api_handler));
        self.workers.push(api_server.listen(
            &self.config.api_address,
            self.config.worker_threads,
            Arc::clone(&self.running),
        )?);

        let stabilization = Stabilization::new(Arc::clone(&self.routing), &self.config);
        let running = Arc::clone(&self.running);
        self.workers.push(thread::spawn(move || {
            stabilization.run(&running);
        }));

        log::info!(
            "Node {} listening on {} (api on {})",
            self.current.id,
            self.config.listen_address,
            self.config.api_address
        );

        Ok(())
    }

    /// Stops the stabilization loop and both listeners and waits for all
    /// worker threads to finish.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        log::info!("Stopping node {}", self.current.id);

        // wake the accept loops so they observe the cleared flag
        let _ = TcpStream::connect(&self.config.listen_address);
        let _ = TcpStream::connect(&self.config.api_address);

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    /// Blocks until the node is stopped from another thread.
    pub fn wait(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solo_node() -> Node {
        let mut config = Config::new("127.0.0.1:39980", "127.0.0.1:39981");
        config.ring_bits = 8;

        Node::new(config).unwrap()
    }

    #[test]
    fn a_fresh_node_is_its_own_ring() {
        let node = solo_node();
        node.join(None).unwrap();

        assert_eq!(node.id(), node.successor().id);
        assert!(node.predecessor().is_none());

        let current_id = node.id();
        assert!(node.fingers().iter().all(|f| f.node.id == current_id));
    }

    #[test]
    fn a_solo_node_owns_every_identifier() {
        let node = solo_node();
        node.join(None).unwrap();

        for key in &[0u64, 1, 67, 128, 255] {
            let resolved = node.find_successor(&Identifier::from(*key));
            assert_eq!(node.id(), resolved.id);
        }
    }

    #[test]
    fn rejects_invalid_ring_width() {
        let mut config = Config::new("127.0.0.1:39982", "127.0.0.1:39983");
        config.ring_bits = 0;

        assert!(Node::new(config).is_err());
    }
}
