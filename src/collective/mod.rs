//! Out-of-band collectives over the LP population.
//!
//! Both collectives walk the same implicit binary tree over LP ids in
//! discrete integer phases, outside virtual time: the init broadcast
//! flows root to leaves before any event is scheduled, and the complete
//! reduction flows leaves to root after the scheduler has terminated.
//! Each finishes in exactly `depth(N - 1) + 1` phases.
//!
//! The drivers deliver messages between phases through per-LP mailboxes;
//! the per-LP protocol checks (early, late, wrong sender, wrong variant)
//! live on [`LogicalProcess`].

use tracing::debug;

use crate::core::tree::BinaryTree;
use crate::error::SimError;
use crate::events::SimEvent;
use crate::models::lp::LogicalProcess;

/// Depth of the deepest LP, which bounds both collectives' phase count.
pub fn max_depth(number: u64) -> u32 {
    BinaryTree::depth(number - 1)
}

/// Run the spanning-tree init broadcast: the root initiates, and at
/// phase `p` every LP at depth `p` consumes its parent's Init and
/// forwards to its children.
pub fn broadcast_init(lps: &mut [LogicalProcess]) -> Result<(), SimError> {
    let number = lps.len() as u64;
    let phases = max_depth(number) + 1;
    let traced = lps.first().is_some_and(LogicalProcess::traced);
    let mut mailboxes: Vec<Option<SimEvent>> = vec![None; lps.len()];

    for phase in 0..phases {
        let mut outgoing: Vec<(u64, SimEvent)> = Vec::new();
        for lp in lps.iter_mut() {
            let incoming = mailboxes[lp.id() as usize].take();
            for child in lp.broadcast_phase(phase, incoming.as_ref())? {
                outgoing.push((child, SimEvent::Init { sender: lp.id() }));
            }
        }
        for (dst, event) in outgoing {
            let slot = &mut mailboxes[dst as usize];
            if slot.is_some() {
                return Err(SimError::CollectiveProtocolViolation(format!(
                    "LP {} received two init messages in phase {}",
                    dst, phase
                )));
            }
            *slot = Some(event);
        }
        if traced {
            debug!(phase, "broadcast phase complete");
        }
    }

    // Every mailbox was consumed in the phase after it was filled.
    if let Some(stale) = mailboxes.iter().position(Option::is_some) {
        return Err(SimError::CollectiveProtocolViolation(format!(
            "undelivered init message for LP {} after final phase",
            stale
        )));
    }
    Ok(())
}

/// Run the complete reduction: at effective phase `maxDepth - p` every
/// LP at that depth folds its children's totals into its own counters
/// and forwards the subtotal to its parent. Returns the grand
/// `(send_total, recv_total)` observed at the root.
pub fn reduce_complete(lps: &[LogicalProcess]) -> Result<(u64, u64), SimError> {
    let number = lps.len() as u64;
    let phases = max_depth(number) + 1;
    let traced = lps.first().is_some_and(LogicalProcess::traced);
    let mut mailboxes: Vec<Vec<(u64, SimEvent)>> = vec![Vec::new(); lps.len()];
    let mut grand: Option<(u64, u64)> = None;

    for phase in 0..phases {
        let mut outgoing: Vec<(u64, u64, SimEvent)> = Vec::new();
        for lp in lps.iter() {
            let incoming = std::mem::take(&mut mailboxes[lp.id() as usize]);
            let Some(forward) = lp.complete_phase(phase, max_depth(number), &incoming)? else {
                continue;
            };
            match forward.to {
                Some(parent) => outgoing.push((
                    parent,
                    lp.id(),
                    SimEvent::Complete {
                        send_total: forward.send_total,
                        recv_total: forward.recv_total,
                    },
                )),
                None => {
                    if grand.is_some() {
                        return Err(SimError::CollectiveProtocolViolation(
                            "root reported totals twice".to_string(),
                        ));
                    }
                    grand = Some((forward.send_total, forward.recv_total));
                }
            }
        }
        for (dst, src, event) in outgoing {
            mailboxes[dst as usize].push((src, event));
        }
        if traced {
            debug!(phase, "reduce phase complete");
        }
    }

    grand.ok_or_else(|| {
        SimError::CollectiveProtocolViolation("reduction finished without root totals".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::SimTime;
    use crate::models::config::SimConfig;
    use crate::models::link::Link;

    fn population(number: u64) -> Vec<LogicalProcess> {
        let config = SimConfig::builder()
            .number(number)
            .minimum(1e-6)
            .average(9e-6)
            .stop(1e-3)
            .build()
            .unwrap();
        (0..number)
            .map(|id| {
                let links = (0..number)
                    .map(|peer| {
                        let latency = if peer == id {
                            SimTime::ZERO
                        } else {
                            config.minimum_time()
                        };
                        Link::new(id, peer, latency)
                    })
                    .collect();
                LogicalProcess::new(&config, id, links)
            })
            .collect()
    }

    #[test]
    fn test_max_depth_unbalanced() {
        assert_eq!(max_depth(2), 1);
        assert_eq!(max_depth(7), 2);
        assert_eq!(max_depth(8), 3);
    }

    #[test]
    fn test_broadcast_reaches_every_lp() {
        for number in [2u64, 3, 7, 8, 16, 31] {
            let mut lps = population(number);
            broadcast_init(&mut lps).unwrap();
            for lp in &lps {
                assert!(lp.init_seen(), "LP {} missed init (N = {})", lp.id(), number);
            }
        }
    }

    #[test]
    fn test_reduce_on_fresh_population_is_zero() {
        let mut lps = population(7);
        broadcast_init(&mut lps).unwrap();
        let (send_total, recv_total) = reduce_complete(&lps).unwrap();
        assert_eq!(send_total, 0);
        assert_eq!(recv_total, 0);
    }
}
