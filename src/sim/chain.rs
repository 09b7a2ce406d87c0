//! Chain splitting
//!
//! Destroying a segment removes it from its chain. Losing the head promotes
//! the next segment in place; losing any other segment detaches whatever
//! followed it as a new chain with its own head, while the front part keeps
//! the original id. Callers must finish scanning the chain collection before
//! splitting.

use super::state::{EnemyChain, GameEvent, Segment, World};

/// What a split produced
#[derive(Debug, Clone)]
pub struct Split {
    /// The segment that was removed
    pub removed: Segment,
    /// Segments that followed the removed one, as their own chain
    pub tail: Option<EnemyChain>,
}

/// Remove `index` from `chain`. For any index but the head, everything after
/// it is detached as a new chain with id `tail_id`. Returns `None` for an
/// out-of-range index.
pub fn split(
    chain: &mut EnemyChain,
    index: usize,
    tail_id: u32,
    speedup: f32,
    min_interval: f32,
) -> Option<Split> {
    if index >= chain.segments.len() {
        return None;
    }

    let detached = if index == 0 {
        Vec::new()
    } else {
        chain.segments.split_off(index + 1)
    };
    let removed = chain.segments.remove(index);

    if let Some(first) = chain.segments.first_mut() {
        first.head = true;
    }

    let tail = (!detached.is_empty()).then(|| {
        let mut segments = detached;
        segments[0].head = true;
        EnemyChain {
            id: tail_id,
            segments,
            direction: chain.direction,
            accumulator: 0.0,
            step_interval: (chain.step_interval * speedup).max(min_interval),
        }
    });

    Some(Split { removed, tail })
}

/// Destroy segment `segment_index` of `world.chains[chain_index]` and apply the
/// result to the world: insert the tail, drop the chain if it emptied.
pub fn split_chain_at(
    world: &mut World,
    chain_index: usize,
    segment_index: usize,
) -> Option<Segment> {
    let valid = world
        .chains
        .get(chain_index)
        .is_some_and(|c| segment_index < c.len());
    debug_assert!(
        valid,
        "split index out of range: chain {} segment {}",
        chain_index, segment_index
    );
    if !valid {
        log::warn!(
            "Ignoring split of chain {} at segment {}: out of range",
            chain_index,
            segment_index
        );
        return None;
    }

    let tail_id = world.next_entity_id();
    let speedup = world.tuning.split_speedup;
    let min_interval = world.tuning.chain_min_interval;
    let chain = &mut world.chains[chain_index];
    let parent = chain.id;
    let outcome = split(chain, segment_index, tail_id, speedup, min_interval)?;
    let emptied = chain.is_empty();

    if emptied {
        world.chains.remove(chain_index);
    }
    if let Some(tail) = outcome.tail {
        log::debug!(
            "Chain {} split at {}: tail {} with {} segments",
            parent,
            segment_index,
            tail.id,
            tail.len()
        );
        world.emit(GameEvent::ChainSplit {
            parent,
            tail: tail.id,
        });
        world.chains.push(tail);
    }

    Some(outcome.removed)
}
