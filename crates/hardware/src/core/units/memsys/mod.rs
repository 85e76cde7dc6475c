//! Memory subsystem: arbitrates LSU and PTW read traffic onto the data
//! cache, and routes the cache's completions back to their owners.
//!
//! No direct analog in the upstream simulator, which models a single
//! synchronous bus with no contention. Grounded on
//! `original_source/MemSubSystem/MemSubsystem.cpp`'s `comb()` wiring order:
//! arbitrate → drive cache → route response.

/// Four-source strict-priority read arbiter (LSU > PTW-walk > PTW-DTLB > PTW-ITLB).
pub mod arbiter;

/// FIFO ownership response router, with drop-credit support for flushed walks.
pub mod router;

/// Top-level struct wiring the arbiter, router, data cache, and backing RAM
/// together, with a synchronous bypass path for MMIO.
pub mod subsystem;

pub use arbiter::{ArbiterRequests, ReadArbiter, ReadRequester};
pub use router::ResponseRouter;
pub use subsystem::{LsuReadReq, LsuWriteReq, MemSubsystem, MemSubsystemOutputs};
