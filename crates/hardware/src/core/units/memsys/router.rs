//! FIFO ownership response router.
//!
//! Every cycle the arbiter grants at most one read; this router remembers,
//! in strict FIFO order, which requester owns each outstanding grant, so that
//! when the data cache eventually produces a completion it can be routed
//! back to the right place even with several misses queued up behind each
//! other. Grounded on `MemRespRouteBlock`'s ownership-queue idiom in the
//! reference implementation.

use std::collections::VecDeque;

use crate::common::FatalError;
use crate::core::units::memsys::arbiter::ReadRequester;

/// Routes completed cache reads back to their owning requester, in the order
/// grants were issued.
#[derive(Debug, Default)]
pub struct ResponseRouter {
    owners: VecDeque<ReadRequester>,
    /// Per-requester count of responses to silently discard, used when a PTW
    /// walk is flushed (e.g. by `SFENCE.VMA`) while its read is in flight.
    drop_credits: [u32; 4],
}

fn requester_index(r: ReadRequester) -> usize {
    match r {
        ReadRequester::Lsu => 0,
        ReadRequester::PtwWalk => 1,
        ReadRequester::PtwDtlb => 2,
        ReadRequester::PtwItlb => 3,
    }
}

impl ResponseRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that this cycle's arbiter grant belongs to `owner`. Must be
    /// called exactly once per cycle in which the arbiter actually grants a
    /// request, in the same order requests were submitted to the cache.
    pub fn enqueue_owner(&mut self, owner: ReadRequester) {
        self.owners.push_back(owner);
    }

    /// Marks the oldest still-outstanding request for `owner` to be dropped
    /// when it completes, rather than delivered. Used when a PTW walk is
    /// flushed mid-flight.
    pub fn drop_next_for(&mut self, owner: ReadRequester) {
        self.drop_credits[requester_index(owner)] += 1;
    }

    /// Routes a cache completion (identified only by the fact that the cache
    /// produced one this cycle) to its owner. Returns `Ok(None)` if the
    /// response was silently dropped via a drop credit, `Ok(Some(owner))` if
    /// it should be delivered, or `Err` if the cache produced a completion
    /// with no matching owner in the queue — an internal invariant
    /// violation, since every granted read must have been enqueued here.
    pub fn route(&mut self) -> Result<Option<ReadRequester>, FatalError> {
        let owner = self
            .owners
            .pop_front()
            .ok_or(FatalError::ResponseRouterUnderflow)?;

        let credit = &mut self.drop_credits[requester_index(owner)];
        if *credit > 0 {
            *credit -= 1;
            return Ok(None);
        }
        Ok(Some(owner))
    }

    /// Number of grants made but not yet matched by a cache response.
    /// Corresponds to invariant P5: this equals outstanding arbiter grants.
    pub fn in_flight_len(&self) -> usize {
        self.owners.len()
    }
}
