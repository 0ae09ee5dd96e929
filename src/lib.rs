//! This crate implements the [Chord protocol][w:chord]: a peer-to-peer
//! overlay in which every node is responsible for one arc of a circular
//! identifier space and key lookups resolve in logarithmically many hops.
//!
//! # Introduction
//!
//! Every node hashes its own address into an m-bit identifier ring and
//! keeps three pieces of routing state: its successor on the ring, an
//! optional predecessor and a finger table with m shortcuts, the i-th of
//! which points at the node responsible for `(id + 2^i) mod 2^m`. A
//! lookup either answers from the successor or forwards to the closest
//! preceding finger, halving the remaining distance per hop.
//!
//! Nothing about the ring is coordinated globally. Each node runs a small
//! periodic repair loop (stabilize, fix one finger, check the
//! predecessor) and the ring converges to a consistent state through
//! local gossip alone, including after nodes join or disappear. Departure
//! is not announced; a crashed and a stopped peer look the same.
//!
//! # Interfaces
//!
//! We distinguish between the api interface, which is used by clients on
//! the same host to store and retrieve values, and the peer-to-peer
//! interface through which the nodes of a ring talk to each other. The
//! peer protocol carries the four routing operations (`FIND SUCCESSOR`,
//! `PREDECESSOR GET`, `NOTIFY`, `PING`) and the storage operations a node
//! forwards to whichever peer owns a key. Identifiers travel as decimal
//! strings so any ring width up to 160 bits uses one wire format.
//!
//! Both interfaces speak the same length-prefixed message framing over
//! TCP and are served by a worker pool each; the shared routing state is
//! guarded by short critical sections and never locked across a network
//! call.
//!
//! [w:chord]: https://en.wikipedia.org/wiki/Chord_(peer-to-peer)

use std::error::Error;

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod network;
pub mod node;
pub mod procedures;
pub mod routing;
pub mod stabilization;
pub mod storage;

pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Runs a node until the process is terminated.
///
/// Creates the node for `config`, starts its servers and joins either a
/// fresh ring or, when `bootstrap_addr` is given, the ring of that peer.
pub fn run(config: config::Config, bootstrap_addr: Option<String>) -> Result<()> {
    let mut node = node::Node::new(config)?;

    node.start()?;

    if let Err(err) = node.join(bootstrap_addr.as_deref()) {
        node.stop();
        return Err(err);
    }

    node.wait();

    Ok(())
}
