use crate::routing::identifier::Identifier;
use crate::routing::NodeRef;

/// One finger: the interval start and the node believed to succeed it
#[derive(Clone, Debug)]
pub struct FingerEntry {
    pub start: Identifier,
    pub node: NodeRef,
}

/// Per-node table of m routing shortcuts
///
/// Entry i records the node currently believed responsible for
/// `(current + 2^i) mod 2^m`. Starts are fixed at construction; only the
/// node references are ever rewritten.
#[derive(Debug)]
pub struct FingerTable {
    entries: Vec<FingerEntry>,
}

impl FingerTable {
    /// Creates a table for `current` with every finger pointing at
    /// `current` itself, the state of a freshly created ring.
    pub fn new(current: &NodeRef, bits: u8) -> Self {
        let entries = (0..usize::from(bits))
            .map(|index| FingerEntry {
                start: current.id.finger_start(index, bits),
                node: current.clone(),
            })
            .collect();

        FingerTable { entries }
    }

    /// Number of fingers, equal to the ring width m.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> &FingerEntry {
        &self.entries[index]
    }

    /// Points finger `index` at `node`, keeping its start.
    pub fn set(&mut self, index: usize, node: NodeRef) {
        self.entries[index].node = node;
    }

    pub fn entries(&self) -> &[FingerEntry] {
        &self.entries
    }
}
