//! Four-source strict-priority read arbiter.
//!
//! Grounded on `MemSubsystem::comb`'s arbitration order in the reference
//! implementation: LSU reads outrank the PTW walker's own memory reads, which
//! outrank the DTLB's queued walk-request read, which outranks the ITLB's.
//! Writes are not arbitrated here (the LSU is the only write source and its
//! writes pass straight through to the cache).

use crate::common::PhysAddr;

/// Identifies which client a granted read request (or routed response)
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadRequester {
    /// The load/store unit's own read port.
    Lsu,
    /// The page-table walker's own memory read (fetching a PTE).
    PtwWalk,
    /// The DTLB's queued walk request being serviced by the walker.
    PtwDtlb,
    /// The ITLB's queued walk request being serviced by the walker.
    PtwItlb,
}

impl ReadRequester {
    /// All requesters, highest priority first.
    pub const PRIORITY_ORDER: [ReadRequester; 4] = [
        ReadRequester::Lsu,
        ReadRequester::PtwWalk,
        ReadRequester::PtwDtlb,
        ReadRequester::PtwItlb,
    ];
}

/// One cycle's worth of candidate read requests, one slot per requester.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbiterRequests {
    /// LSU read request address, if any.
    pub lsu: Option<PhysAddr>,
    /// PTW walker's own read request address, if any.
    pub ptw_walk: Option<PhysAddr>,
    /// DTLB's pending walk-read address, if any.
    pub ptw_dtlb: Option<PhysAddr>,
    /// ITLB's pending walk-read address, if any.
    pub ptw_itlb: Option<PhysAddr>,
}

impl ArbiterRequests {
    fn get(&self, requester: ReadRequester) -> Option<PhysAddr> {
        match requester {
            ReadRequester::Lsu => self.lsu,
            ReadRequester::PtwWalk => self.ptw_walk,
            ReadRequester::PtwDtlb => self.ptw_dtlb,
            ReadRequester::PtwItlb => self.ptw_itlb,
        }
    }
}

/// Strict-priority arbiter: no round-robin, no fairness accounting. The
/// highest-priority requester with a pending request wins every cycle, which
/// means a saturating LSU can starve the PTW indefinitely — the reference
/// model accepts this as a faithful reproduction of the hardware's tie-break.
#[derive(Debug, Default)]
pub struct ReadArbiter;

impl ReadArbiter {
    /// Creates a new arbiter. Stateless; kept as a type for symmetry with the
    /// other memory-subsystem blocks and to leave room for future fairness
    /// counters without changing the call site.
    pub fn new() -> Self {
        Self
    }

    /// Selects the single winning requester and its address for this cycle,
    /// or `None` if nobody requested a read.
    pub fn arbitrate(&self, requests: ArbiterRequests) -> Option<(ReadRequester, PhysAddr)> {
        ReadRequester::PRIORITY_ORDER
            .into_iter()
            .find_map(|r| requests.get(r).map(|addr| (r, addr)))
    }
}
