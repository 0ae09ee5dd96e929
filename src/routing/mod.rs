//! Identifier-based routing state of a single node.
//!
//! A [`NodeRef`] is a lookup handle for a peer: its identifier together
//! with the address the identifier was derived from. Two refs are equal
//! whenever their identifiers are equal; a ref never guarantees that the
//! peer behind it is alive.
//!
//! The [`Routing`] struct owns everything a node knows about the ring:
//! its own ref, the successor, the optional predecessor and the finger
//! table. It only performs local bookkeeping; all remote calls live in
//! [`Procedures`]. Callers are expected to hold the routing mutex for the
//! duration of one method call and never across network I/O.
//!
//! [`NodeRef`]: struct.NodeRef.html
//! [`Routing`]: struct.Routing.html
//! [`Procedures`]: ../procedures/struct.Procedures.html

use std::fmt;

use self::finger::{FingerEntry, FingerTable};
use self::identifier::Identifier;

pub mod finger;
pub mod identifier;

/// A peer handle consisting of an identifier and the hashed address
#[derive(Clone)]
pub struct NodeRef {
    pub id: Identifier,
    pub address: String,
}

impl NodeRef {
    /// Derives the ref for `address` by hashing it into the m-bit ring.
    pub fn new(address: &str, bits: u8) -> Self {
        NodeRef {
            id: Identifier::hash(address, bits),
            address: address.to_string(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &NodeRef) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

/// Mutable routing state of one node
#[derive(Debug)]
pub struct Routing {
    current: NodeRef,
    predecessor: Option<NodeRef>,
    successor: NodeRef,
    finger_table: FingerTable,
    next_finger: usize,
}

impl Routing {
    /// Creates the state of a node alone in its ring: the successor is
    /// the node itself, the predecessor is unknown and every finger
    /// points back at the node.
    pub fn new(current: NodeRef, bits: u8) -> Self {
        let finger_table = FingerTable::new(&current, bits);
        let successor = current.clone();

        Routing {
            current,
            predecessor: None,
            successor,
            finger_table,
            next_finger: 0,
        }
    }

    pub fn current(&self) -> &NodeRef {
        &self.current
    }

    pub fn successor(&self) -> &NodeRef {
        &self.successor
    }

    /// Installs a new successor.
    ///
    /// Finger entry 0 covers `current + 1` and must always agree with the
    /// successor, so it is rewritten here as well.
    pub fn set_successor(&mut self, node: NodeRef) {
        self.finger_table.set(0, node.clone());
        self.successor = node;
    }

    pub fn predecessor(&self) -> Option<&NodeRef> {
        self.predecessor.as_ref()
    }

    pub fn clear_predecessor(&mut self) {
        self.predecessor = None;
    }

    /// Number of fingers, equal to the ring width m.
    pub fn fingers(&self) -> usize {
        self.finger_table.len()
    }

    pub fn finger(&self, index: usize) -> &FingerEntry {
        self.finger_table.get(index)
    }

    pub fn set_finger(&mut self, index: usize, node: NodeRef) {
        if index == 0 {
            self.set_successor(node);
        } else {
            self.finger_table.set(index, node);
        }
    }

    /// Copies the finger table for diagnostics and tests.
    pub fn finger_snapshot(&self) -> Vec<FingerEntry> {
        self.finger_table.entries().to_vec()
    }

    /// Returns the index the round-robin finger repair should fix next
    /// and advances the cursor.
    pub fn advance_next_finger(&mut self) -> usize {
        let index = self.next_finger;
        self.next_finger = (index + 1) % self.finger_table.len();
        index
    }

    /// Returns the finger closest to, but strictly preceding, the given
    /// identifier.
    ///
    /// Fingers are scanned from the widest interval down; a finger only
    /// qualifies if it lies on the open arc between this node and the
    /// target. When no finger qualifies the node itself is returned and
    /// the caller falls back to the plain successor.
    pub fn closest_preceding_finger(&self, identifier: &Identifier) -> NodeRef {
        for index in (0..self.finger_table.len()).rev() {
            let finger = &self.finger_table.get(index).node;

            if finger.id.in_range(&self.current.id, identifier, false, false) {
                return finger.clone();
            }
        }

        self.current.clone()
    }

    /// Handles an advisory from a peer that believes it may be our
    /// predecessor.
    ///
    /// A node never records itself and, while its successor still points
    /// at itself, adopts the first peer it hears from as successor; that
    /// is how a solo ring absorbs its first member. The predecessor is
    /// replaced whenever it is unknown or the peer lies strictly between
    /// the old predecessor and this node.
    pub fn notify(&mut self, peer: NodeRef) {
        if peer.id == self.current.id {
            return;
        }

        if self.successor.id == self.current.id {
            log::info!("Adopting {} as successor of the solo ring", peer);
            self.set_successor(peer.clone());
        }

        let adopt = match &self.predecessor {
            None => true,
            Some(predecessor) => {
                peer.id.in_range(&predecessor.id, &self.current.id, false, false)
            }
        };

        if adopt {
            log::info!("Updating predecessor to {}", peer);
            self.predecessor = Some(peer);
        }
    }

    /// Whether this node owns the given identifier, i.e. the identifier
    /// lies in the arc (predecessor, current].
    ///
    /// Without a predecessor the node claims the identifier; the claim is
    /// corrected by stabilization before it matters for routing.
    pub fn responsible_for(&self, identifier: &Identifier) -> bool {
        match &self.predecessor {
            Some(predecessor) => {
                identifier.in_range(&predecessor.id, &self.current.id, false, true)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BITS: u8 = 8;

    fn node(id: u64) -> NodeRef {
        NodeRef {
            id: Identifier::from(id),
            address: format!("127.0.0.1:{}", 9000 + id),
        }
    }

    fn routing(id: u64) -> Routing {
        Routing::new(node(id), BITS)
    }

    #[test]
    fn fresh_routing_is_a_solo_ring() {
        let routing = routing(40);

        assert_eq!(node(40), *routing.successor());
        assert!(routing.predecessor().is_none());
        assert!(routing.finger_snapshot().iter().all(|f| f.node == node(40)));
    }

    #[test]
    fn set_successor_rewrites_finger_zero() {
        let mut routing = routing(40);
        routing.set_successor(node(90));

        assert_eq!(node(90), *routing.successor());
        assert_eq!(node(90), routing.finger(0).node);
    }

    #[test]
    fn closest_preceding_finger_prefers_the_widest_match() {
        let mut routing = routing(0);
        routing.set_finger(4, node(16)); // start 16
        routing.set_finger(6, node(70)); // start 64

        // both 16 and 70 precede 200; the scan must pick 70
        assert_eq!(node(70), routing.closest_preceding_finger(&Identifier::from(200u64)));

        // only 16 precedes 60
        assert_eq!(node(16), routing.closest_preceding_finger(&Identifier::from(60u64)));

        // nothing precedes 10, fall back to the node itself
        assert_eq!(node(0), routing.closest_preceding_finger(&Identifier::from(10u64)));
    }

    #[test]
    fn closest_preceding_finger_ignores_fingers_beyond_the_target() {
        let mut routing = routing(100);
        routing.set_finger(7, node(240)); // beyond a target of 200

        assert_eq!(
            node(100),
            routing.closest_preceding_finger(&Identifier::from(200u64))
        );
    }

    #[test]
    fn notify_ignores_the_node_itself() {
        let mut routing = routing(40);
        routing.notify(node(40));

        assert!(routing.predecessor().is_none());
        assert_eq!(node(40), *routing.successor());
    }

    #[test]
    fn notify_absorbs_the_first_peer() {
        let mut routing = routing(40);
        routing.notify(node(90));

        assert_eq!(node(90), *routing.successor());
        assert_eq!(Some(&node(90)), routing.predecessor());
    }

    #[test]
    fn notify_keeps_the_closer_predecessor() {
        let mut routing = routing(40);
        routing.set_successor(node(90));
        routing.notify(node(20));

        // 50 is not between 20 and 40
        routing.notify(node(50));
        assert_eq!(Some(&node(20)), routing.predecessor());

        // 30 is
        routing.notify(node(30));
        assert_eq!(Some(&node(30)), routing.predecessor());
    }

    #[test]
    fn notify_is_idempotent() {
        let mut routing = routing(40);
        routing.set_successor(node(90));

        routing.notify(node(20));
        let first = routing.predecessor().cloned();

        routing.notify(node(20));
        assert_eq!(first.as_ref(), routing.predecessor());
    }

    #[test]
    fn advance_next_finger_visits_every_index_once() {
        let mut routing = routing(40);

        let mut seen: Vec<usize> = (0..routing.fingers())
            .map(|_| routing.advance_next_finger())
            .collect();
        seen.sort_unstable();

        let expected: Vec<usize> = (0..usize::from(BITS)).collect();
        assert_eq!(expected, seen);
        assert_eq!(0, routing.advance_next_finger());
    }

    #[test]
    fn responsibility_follows_the_predecessor_arc() {
        let mut routing = routing(40);
        routing.set_successor(node(90));
        routing.notify(node(200));

        assert!(routing.responsible_for(&Identifier::from(40u64)));
        assert!(routing.responsible_for(&Identifier::from(201u64)));
        assert!(routing.responsible_for(&Identifier::from(255u64)));
        assert!(!routing.responsible_for(&Identifier::from(200u64)));
        assert!(!routing.responsible_for(&Identifier::from(41u64)));
    }
}
