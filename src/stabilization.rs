//! Periodic repair of the routing information.
//!
//! The [`Stabilization`] struct bundles the three maintenance procedures
//! every node runs once per tick: `stabilize` gossips with the successor
//! and adopts a closer one if the successor has learned about it,
//! `fix_fingers` re-resolves one finger per tick in round-robin order and
//! `check_predecessor` drops a predecessor that stopped answering pings.
//!
//! Each procedure snapshots the routing state, talks to peers without
//! holding any lock and applies its result afterwards. Failures are
//! logged and retried on the next tick; the fixed cadence is the entire
//! retry policy.
//!
//! [`Stabilization`]: struct.Stabilization.html

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::procedures::Procedures;
use crate::routing::Routing;

/// Granularity of the cancellation check inside a tick pause.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Runs the three maintenance procedures against a shared routing table
pub struct Stabilization {
    routing: Arc<Mutex<Routing>>,
    procedures: Procedures,
    interval: Duration,
}

impl Stabilization {
    pub fn new(routing: Arc<Mutex<Routing>>, config: &Config) -> Self {
        let procedures = Procedures::new(config);

        Self {
            routing,
            procedures,
            interval: config.stabilize_interval,
        }
    }

    /// Ticks until `running` is cleared.
    ///
    /// The schedule is anchored to the loop start so a slow tick does not
    /// push all later ticks back.
    pub fn run(&self, running: &AtomicBool) {
        let mut next_tick = Instant::now() + self.interval;

        while running.load(Ordering::SeqCst) {
            self.tick();

            while running.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= next_tick {
                    break;
                }

                thread::sleep((next_tick - now).min(SLEEP_SLICE));
            }

            next_tick += self.interval;
        }
    }

    /// Runs one round of stabilize, fix_fingers and check_predecessor.
    pub fn tick(&self) {
        self.stabilize();
        self.fix_fingers();
        self.check_predecessor();
    }

    /// Verifies the successor and announces ourselves to it.
    ///
    /// The successor's predecessor pointer is the fresher information: if
    /// it names a node strictly between us and the successor, that node
    /// has joined in between and becomes our new successor.
    fn stabilize(&self) {
        let (current, successor) = {
            let routing = self.routing.lock().unwrap();

            (routing.current().clone(), routing.successor().clone())
        };

        if successor.id == current.id {
            // alone in the ring, nothing to gossip about
            return;
        }

        match self.procedures.get_predecessor(&successor.address) {
            Ok(Some(candidate)) => {
                if candidate.id != current.id
                    && candidate.id.in_range(&current.id, &successor.id, false, false)
                {
                    log::info!("Updating successor to {}", candidate);

                    self.routing.lock().unwrap().set_successor(candidate);
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!(
                    "Could not get predecessor of successor {}: {}",
                    successor.address,
                    err
                );
            }
        }

        let (current, successor) = {
            let routing = self.routing.lock().unwrap();

            (routing.current().clone(), routing.successor().clone())
        };

        if successor.id != current.id {
            if let Err(err) = self.procedures.notify(&current, &successor.address) {
                log::warn!("Could not notify successor {}: {}", successor.address, err);
            }
        }
    }

    /// Re-resolves the finger the round-robin cursor points at.
    fn fix_fingers(&self) {
        let (index, start) = {
            let mut routing = self.routing.lock().unwrap();
            let index = routing.advance_next_finger();

            (index, routing.finger(index).start)
        };

        let owner = self.procedures.resolve_successor(&self.routing, &start);

        log::debug!("Pointing finger {} at {}", index, owner);

        self.routing.lock().unwrap().set_finger(index, owner);
    }

    /// Drops the predecessor if it no longer answers pings.
    fn check_predecessor(&self) {
        let predecessor = {
            let routing = self.routing.lock().unwrap();

            routing.predecessor().cloned()
        };

        let predecessor = match predecessor {
            Some(predecessor) => predecessor,
            None => return,
        };

        if let Err(err) = self.procedures.ping(&predecessor.address) {
            log::warn!(
                "Predecessor {} did not answer ping, clearing it: {}",
                predecessor,
                err
            );

            let mut routing = self.routing.lock().unwrap();

            // only clear if nobody replaced it while we were pinging
            let unchanged = routing
                .predecessor()
                .map(|p| p.id == predecessor.id)
                .unwrap_or(false);

            if unchanged {
                routing.clear_predecessor();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::NodeRef;

    fn solo_setup() -> (Arc<Mutex<Routing>>, Stabilization) {
        let mut config = Config::new("127.0.0.1:39990", "127.0.0.1:39991");
        config.ring_bits = 8;

        let current = NodeRef::new(&config.listen_address, config.ring_bits);
        let routing = Arc::new(Mutex::new(Routing::new(current, config.ring_bits)));
        let stabilization = Stabilization::new(Arc::clone(&routing), &config);

        (routing, stabilization)
    }

    #[test]
    fn solo_tick_makes_no_network_calls_and_changes_nothing() {
        // no listener is bound; any outbound call would fail loudly or
        // leave a cleared predecessor behind
        let (routing, stabilization) = solo_setup();

        for _ in 0..3 {
            stabilization.tick();
        }

        let routing = routing.lock().unwrap();
        assert_eq!(routing.current(), routing.successor());
        assert!(routing.predecessor().is_none());
    }

    #[test]
    fn fix_fingers_visits_each_index_once_per_cycle() {
        let (routing, stabilization) = solo_setup();

        let fingers = routing.lock().unwrap().fingers();

        for _ in 0..fingers {
            stabilization.fix_fingers();
        }

        // cursor is back at the start and the table still points at us
        let mut routing = routing.lock().unwrap();
        assert_eq!(0, routing.advance_next_finger());
        let current = routing.current().clone();
        assert!(routing.finger_snapshot().iter().all(|f| f.node == current));
    }
}
