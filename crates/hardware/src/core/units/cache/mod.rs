//! Blocking set-associative data cache with a pending-read queue.
//!
//! The cache tracks only tag/valid/dirty state (actual bytes live in the SoC
//! memory behind it); its job is to model hit/miss timing. Reads that miss are
//! not serviced synchronously: they are pushed onto a FIFO pending-read queue,
//! bounded at `MAX_PENDING_REQS` entries, and only the head of that queue can
//! complete and be popped in a given cycle (`sim_time >= complete_time`).
//! Writes bypass the pending-read queue entirely (per the memory subsystem's
//! "writes pass unarbitrated" rule) but still share the same backpressure
//! bound so a write cannot silently outrun outstanding reads.

/// Cache replacement policy implementations (FIFO/round-robin, LRU, Random).
pub mod policies;

use std::collections::VecDeque;

use self::policies::{FifoPolicy, LruPolicy, RandomPolicy, ReplacementPolicy};
use crate::common::PhysAddr;
use crate::config::{
    CacheConfig, MemoryConfig, Prefetcher as PrefetcherType, ReplacementPolicy as PolicyType,
};
use crate::core::units::prefetch::{
    NextLinePrefetcher, Prefetcher, StreamPrefetcher, StridePrefetcher, TaggedPrefetcher,
};

/// Cache line entry containing tag, validity, and dirty bits.
#[derive(Clone, Default)]
struct CacheLine {
    tag: u32,
    valid: bool,
    dirty: bool,
}

/// A read request that missed and is waiting for its completion cycle.
#[derive(Clone, Copy, Debug)]
pub struct PendingRead<O> {
    /// The requester's opaque owner tag, returned unchanged on completion.
    pub owner: O,
    /// Physical address being read.
    pub addr: PhysAddr,
    /// Cycle at which this request's data becomes available.
    pub complete_time: u64,
}

/// Outcome of submitting a read request to the cache.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitResult {
    /// The request was accepted; the caller should poll [`DataCache::step`]
    /// for completion.
    Accepted,
    /// The pending-read queue is at `MAX_PENDING_REQS` capacity; the caller
    /// must retry the request on a later cycle.
    Backpressure,
}

/// A small deterministic linear-congruential generator used only for cache
/// miss-latency jitter. Not suitable for anything requiring real randomness;
/// chosen specifically so miss timing is reproducible for a fixed seed.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Constants from Numerical Recipes' MINSTD-style LCG.
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        self.0
    }
}

/// Blocking set-associative data cache with a bounded pending-read queue.
pub struct DataCache<O> {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: Box<dyn ReplacementPolicy + Send + Sync>,
    hit_latency: u64,
    miss_latency: u64,
    jitter_span: u64,
    rng: Lcg,
    pending: VecDeque<PendingRead<O>>,
    max_pending: usize,
}

impl<O: Copy> DataCache<O> {
    /// Creates a new data cache from the memory configuration section.
    pub fn new(config: &MemoryConfig) -> Self {
        let ways = config.cache_ways.max(1);
        let line_bytes = if config.cache_line_bytes == 0 {
            64
        } else {
            config.cache_line_bytes
        };
        let size_bytes = if config.cache_size_bytes == 0 {
            4096
        } else {
            config.cache_size_bytes
        };
        let num_lines = size_bytes / line_bytes;
        let num_sets = (num_lines / ways).max(1);

        let policy: Box<dyn ReplacementPolicy + Send + Sync> = match config.cache_policy {
            PolicyType::Lru => Box::new(LruPolicy::new(num_sets, ways)),
            PolicyType::RoundRobin => Box::new(FifoPolicy::new(num_sets, ways)),
            PolicyType::Random => Box::new(RandomPolicy::new(num_sets, ways)),
        };

        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            policy,
            hit_latency: config.cache_hit_latency,
            miss_latency: config.cache_miss_latency,
            jitter_span: config.cache_miss_jitter_span.max(1),
            rng: Lcg::new(config.cache_rng_seed),
            pending: VecDeque::with_capacity(config.max_pending_reqs),
            max_pending: config.max_pending_reqs,
        }
    }

    fn set_index(&self, addr: u32) -> usize {
        (addr as usize / self.line_bytes) % self.num_sets
    }

    fn tag_of(&self, addr: u32) -> u32 {
        addr / (self.line_bytes * self.num_sets) as u32
    }

    fn lookup(&self, addr: u32) -> Option<usize> {
        let set = self.set_index(addr);
        let tag = self.tag_of(addr);
        let base = set * self.ways;
        (0..self.ways).find_map(|way| {
            let idx = base + way;
            (self.lines[idx].valid && self.lines[idx].tag == tag).then_some(idx)
        })
    }

    fn install(&mut self, addr: u32, is_write: bool) {
        let set = self.set_index(addr);
        let tag = self.tag_of(addr);
        let base = set * self.ways;
        let victim_way = self.policy.get_victim(set);
        let idx = base + victim_way;
        self.lines[idx] = CacheLine {
            tag,
            valid: true,
            dirty: is_write,
        };
        self.policy.update(set, victim_way);
    }

    fn miss_latency_with_jitter(&mut self) -> u64 {
        self.miss_latency + self.rng.next_u64() % self.jitter_span
    }

    /// Submits a read request for `addr`, owned by `owner`. Returns
    /// [`SubmitResult::Backpressure`] if the pending-read queue is full, in
    /// which case the caller must not treat the request as in flight and
    /// should retry on a subsequent cycle.
    pub fn submit_read(&mut self, addr: PhysAddr, owner: O, now: u64) -> SubmitResult {
        if self.pending.len() >= self.max_pending {
            return SubmitResult::Backpressure;
        }

        let latency = if let Some(idx) = self.lookup(addr.val()) {
            let set = idx / self.ways;
            let way = idx % self.ways;
            self.policy.update(set, way);
            self.hit_latency
        } else {
            self.install(addr.val(), false);
            self.miss_latency_with_jitter()
        };

        self.pending.push_back(PendingRead {
            owner,
            addr,
            complete_time: now + latency,
        });
        SubmitResult::Accepted
    }

    /// Submits a write for `addr`. Writes are not queued: the cache's tag
    /// array is updated immediately (hit marks dirty, miss installs a dirty
    /// line), subject to the same `max_pending` backpressure bound as reads
    /// so a burst of writes cannot starve outstanding read completions.
    pub fn submit_write(&mut self, addr: PhysAddr) -> SubmitResult {
        if self.pending.len() >= self.max_pending {
            return SubmitResult::Backpressure;
        }
        if let Some(idx) = self.lookup(addr.val()) {
            self.lines[idx].dirty = true;
            let set = idx / self.ways;
            let way = idx % self.ways;
            self.policy.update(set, way);
        } else {
            self.install(addr.val(), true);
        }
        SubmitResult::Accepted
    }

    /// Advances the cache by one combinational step. If the head of the
    /// pending-read queue has reached its completion cycle, pops and returns
    /// it; otherwise returns `None`. Only the head is ever eligible, which is
    /// what makes the cache blocking in FIFO order even with multiple
    /// requests queued behind a miss.
    pub fn step(&mut self, now: u64) -> Option<PendingRead<O>> {
        match self.pending.front() {
            Some(req) if req.complete_time <= now => self.pending.pop_front(),
            _ => None,
        }
    }

    /// Number of reads currently queued (in flight or awaiting completion).
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the cache currently contains the given address, without
    /// affecting replacement-policy state. Used by tests and diagnostics.
    pub fn contains(&self, addr: PhysAddr) -> bool {
        self.lookup(addr.val()).is_some()
    }
}

/// Cache line entry for [`CacheSim`], the synchronous multi-level model.
#[derive(Clone, Default)]
struct HierLine {
    tag: u64,
    valid: bool,
    dirty: bool,
}

/// Synchronous set-associative cache used for the multi-level (L1/L2/L3)
/// latency model. Unlike [`DataCache`], accesses return their hit/penalty
/// result immediately rather than through a pending-read queue; each level
/// is walked in turn by the caller, using the next level's latency as the
/// write-back penalty.
pub struct CacheSim {
    /// Access latency in cycles (added on hit; miss adds next-level latency).
    pub latency: u64,
    /// When false, accesses bypass this cache and use next-level latency only.
    pub enabled: bool,
    /// Optional hardware prefetcher.
    pub prefetcher: Option<Box<dyn Prefetcher + Send + Sync>>,
    lines: Vec<HierLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: Box<dyn ReplacementPolicy + Send + Sync>,
}

impl CacheSim {
    /// Creates a new cache simulator from a single level's configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let safe_ways = config.ways.max(1);
        let safe_line = if config.line_bytes == 0 { 64 } else { config.line_bytes };
        let safe_size = if config.size_bytes == 0 { 4096 } else { config.size_bytes };

        let num_lines = safe_size / safe_line;
        let num_sets = (num_lines / safe_ways).max(1);

        let policy: Box<dyn ReplacementPolicy + Send + Sync> = match config.policy {
            PolicyType::RoundRobin => Box::new(FifoPolicy::new(num_sets, safe_ways)),
            PolicyType::Random => Box::new(RandomPolicy::new(num_sets, safe_ways)),
            PolicyType::Lru => Box::new(LruPolicy::new(num_sets, safe_ways)),
        };

        let prefetcher: Option<Box<dyn Prefetcher + Send + Sync>> = match config.prefetcher {
            PrefetcherType::NextLine => {
                Some(Box::new(NextLinePrefetcher::new(safe_line, config.prefetch_degree)))
            }
            PrefetcherType::Stride => Some(Box::new(StridePrefetcher::new(
                safe_line,
                config.prefetch_table_size,
                config.prefetch_degree,
            ))),
            PrefetcherType::Stream => {
                Some(Box::new(StreamPrefetcher::new(safe_line, config.prefetch_degree)))
            }
            PrefetcherType::Tagged => {
                Some(Box::new(TaggedPrefetcher::new(safe_line, config.prefetch_degree)))
            }
            PrefetcherType::None => None,
        };

        Self {
            lines: vec![HierLine::default(); num_sets * safe_ways],
            num_sets,
            ways: safe_ways,
            line_bytes: safe_line,
            latency: config.latency,
            enabled: config.enabled,
            policy,
            prefetcher,
        }
    }

    fn contains(&self, addr: u64) -> bool {
        if !self.enabled {
            return false;
        }
        let set_index = ((addr as usize) / self.line_bytes) % self.num_sets;
        let tag = addr / (self.line_bytes * self.num_sets) as u64;
        let base_idx = set_index * self.ways;
        (0..self.ways).any(|i| {
            let idx = base_idx + i;
            self.lines[idx].valid && self.lines[idx].tag == tag
        })
    }

    fn install_line(&mut self, addr: u64, is_write: bool, next_level_latency: u64) -> u64 {
        let set_index = ((addr as usize) / self.line_bytes) % self.num_sets;
        let tag = addr / (self.line_bytes * self.num_sets) as u64;
        let base_idx = set_index * self.ways;

        let victim_way = self.policy.get_victim(set_index);
        let victim_idx = base_idx + victim_way;
        let mut penalty = 0;

        if self.lines[victim_idx].valid && self.lines[victim_idx].dirty {
            penalty += next_level_latency;
        }

        self.lines[victim_idx] = HierLine { tag, valid: true, dirty: is_write };
        self.policy.update(set_index, victim_way);

        penalty
    }

    /// Accesses the cache. Returns `(hit, penalty)`; penalty is 0 on hit,
    /// install cost (plus write-back of a dirty victim) on miss.
    pub fn access(&mut self, addr: u64, is_write: bool, next_level_latency: u64) -> (bool, u64) {
        if !self.enabled {
            return (false, 0);
        }

        let set_index = ((addr as usize) / self.line_bytes) % self.num_sets;
        let tag = addr / (self.line_bytes * self.num_sets) as u64;
        let base_idx = set_index * self.ways;

        let mut hit = false;
        for i in 0..self.ways {
            let idx = base_idx + i;
            if self.lines[idx].valid && self.lines[idx].tag == tag {
                self.policy.update(set_index, i);
                if is_write {
                    self.lines[idx].dirty = true;
                }
                hit = true;
                break;
            }
        }

        let mut penalty = 0;
        if !hit {
            penalty += self.install_line(addr, is_write, next_level_latency);
        }

        if let Some(ref mut pref) = self.prefetcher {
            for target in pref.observe(addr, hit) {
                if !self.contains(target) {
                    self.install_line(target, false, next_level_latency);
                }
            }
        }

        (hit, penalty)
    }

    /// Invalidates all dirty lines.
    pub fn flush(&mut self) {
        if !self.enabled {
            return;
        }
        for line in &mut self.lines {
            if line.valid && line.dirty {
                line.dirty = false;
                line.valid = false;
            }
        }
    }
}
