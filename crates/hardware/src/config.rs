//! Configuration system for the simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline hardware constants (RAM, MMIO, cache, pipeline widths).
//! 2. **Structures:** Hierarchical config for general, system, memory, mmu, and pipeline.
//! 3. **Enums:** Memory controller and cache/TLB replacement policy types.
//!
//! Configuration is supplied via JSON, or use `Config::default()` for the CLI.

use serde::Deserialize;

/// Default configuration constants for the simulator.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden by the caller.
mod defaults {
    /// Base address of main system RAM.
    ///
    /// This is the physical address where the main memory region begins.
    /// All memory accesses below this address are treated as MMIO.
    pub const RAM_BASE: u32 = 0x8000_0000;

    /// Total size of main system RAM (64 MiB).
    pub const RAM_SIZE: usize = 64 * 1024 * 1024;

    /// Base address of the UART 16550-compatible serial port MMIO region.
    pub const UART_BASE: u32 = 0x1000_0000;

    /// Base address of the PLIC (Platform-Level Interrupt Controller) MMIO region.
    pub const PLIC_BASE: u32 = 0x0c00_0000;

    /// System bus access latency in cycles, charged once per arbitrated request.
    pub const BUS_LATENCY: u64 = 1;

    /// Data/instruction cache hit latency in cycles.
    pub const CACHE_HIT_LATENCY: u64 = 1;

    /// Data/instruction cache miss base latency in cycles, before RNG jitter.
    pub const CACHE_MISS_LATENCY: u64 = 20;

    /// Span of the deterministic miss-latency jitter (`rand() % span`).
    pub const CACHE_MISS_JITTER_SPAN: u64 = 10;

    /// Seed for the cache's miss-latency jitter LCG.
    pub const CACHE_RNG_SEED: u64 = 0x5EED_0000_C0FF_EE01;

    /// Cache size in bytes.
    pub const CACHE_SIZE: usize = 32 * 1024;

    /// Cache line size in bytes.
    pub const CACHE_LINE: usize = 64;

    /// Cache associativity (number of ways).
    pub const CACHE_WAYS: usize = 4;

    /// Upper bound on simultaneously outstanding cache misses.
    pub const MAX_PENDING_REQS: usize = 256;

    /// Per-engine (ITLB/DTLB) TLB entry count.
    pub const TLB_SIZE: usize = 32;

    /// Per-level hit latency for the synchronous L1/L2/L3 cache hierarchy.
    pub const CACHE_LEVEL_LATENCY: u64 = 1;

    /// Prefetcher pattern table size (stride prefetcher).
    pub const PREFETCH_TABLE_SIZE: usize = 64;

    /// Prefetch degree (lines fetched ahead per trigger).
    pub const PREFETCH_DEGREE: usize = 1;

    /// Kernel load offset from RAM base.
    pub const KERNEL_OFFSET: u32 = 0x0020_0000;

    /// Base address of the VirtIO disk MMIO region.
    pub const DISK_BASE: u32 = 0x9000_0000;

    /// Base address of the CLINT (core-local interruptor) MMIO region.
    pub const CLINT_BASE: u32 = 0x0200_0000;

    /// Base address of the system controller (poweroff/reset) MMIO region.
    pub const SYSCON_BASE: u32 = 0x0010_0000;

    /// System bus width in bytes.
    pub const BUS_WIDTH: u64 = 8;

    /// CLINT timer divider (mtime increments every N cycles).
    pub const CLINT_DIVIDER: u64 = 10;

    /// DRAM CAS (column access strobe) latency in cycles.
    pub const T_CAS: u64 = 14;

    /// DRAM RAS (row access strobe) latency in cycles.
    pub const T_RAS: u64 = 14;

    /// DRAM precharge latency in cycles.
    pub const T_PRE: u64 = 14;

    /// DRAM row-buffer miss penalty in cycles.
    pub const ROW_MISS_LATENCY: u64 = 120;

    /// Instructions fetched per cycle.
    pub const FETCH_WIDTH: usize = 4;

    /// Instructions decoded per cycle.
    pub const DECODE_WIDTH: usize = 4;

    /// Uops dispatched (renamed + enqueued) per cycle.
    pub const DISPATCH_WIDTH: usize = 4;

    /// Uops issued (woken + sent to an FU port) per cycle.
    pub const ISSUE_WIDTH: usize = 4;

    /// Instructions committed per cycle.
    pub const COMMIT_WIDTH: usize = 4;

    /// Number of issue queues.
    pub const IQ_NUM: usize = 3;

    /// Reorder buffer entry count.
    pub const ROB_NUM: usize = 64;

    /// Size of the physical register file (`P`).
    pub const PRF_SIZE: usize = 64;

    /// Maximum number of in-flight (unresolved) branches.
    pub const MAX_BR_NUM: usize = 8;

    /// Maximum number of branches that may be dispatched in a single cycle.
    pub const MAX_BR_PER_CYCLE: usize = 2;

    /// Store queue entry count.
    pub const STQ_NUM: usize = 16;

    /// Load queue (in-flight load tracking) entry count.
    pub const MAX_INFLIGHT_LOADS: usize = 16;

    /// Fetch target queue entry count.
    pub const FTQ_SIZE: usize = 16;

    /// ALU functional-unit latency in cycles.
    pub const ALU_LATENCY: u64 = 1;

    /// Multiplier functional-unit latency in cycles.
    pub const MUL_LATENCY: u64 = 3;

    /// Divider functional-unit base latency in cycles (iterative, non-pipelined).
    pub const DIV_LATENCY: u64 = 10;

    /// Load address-generation-unit latency in cycles.
    pub const LOAD_AGU_LATENCY: u64 = 1;

    /// Store address-generation-unit latency in cycles.
    pub const STA_AGU_LATENCY: u64 = 1;

    /// Store-data unit latency in cycles.
    pub const STD_LATENCY: u64 = 1;

    /// Branch unit latency in cycles.
    pub const BR_LATENCY: u64 = 1;

    /// CSR unit latency in cycles.
    pub const CSR_LATENCY: u64 = 1;

    /// Floating-point unit latency in cycles.
    pub const FP_LATENCY: u64 = 4;

    /// Cycles of no forward commit progress before hang detection triggers.
    pub const HANG_DETECTION_THRESHOLD: u64 = 5_000_000;

    /// Branch Target Buffer entry count.
    pub const BTB_SIZE: usize = 256;

    /// Return Address Stack depth.
    pub const RAS_SIZE: usize = 8;

    /// TAGE predictor tagged table count.
    pub const TAGE_BANKS: usize = 4;

    /// TAGE predictor entries per tagged table.
    pub const TAGE_TABLE_SIZE: usize = 2048;

    /// TAGE predictor loop-predictor table size.
    pub const TAGE_LOOP_SIZE: usize = 256;

    /// TAGE predictor useful-counter reset interval, in branches.
    pub const TAGE_RESET_INTERVAL: u32 = 256_000;

    /// Perceptron predictor global history length.
    pub const PERCEPTRON_HISTORY: usize = 32;

    /// Perceptron predictor weight table size (log2).
    pub const PERCEPTRON_TABLE_BITS: usize = 10;

    /// Tournament predictor global history table size (log2).
    pub const TOURNAMENT_GLOBAL_BITS: usize = 12;

    /// Tournament predictor local history table size (log2).
    pub const TOURNAMENT_LOCAL_HIST_BITS: usize = 10;

    /// Tournament predictor local prediction table size (log2).
    pub const TOURNAMENT_LOCAL_PRED_BITS: usize = 10;
}

/// Main memory controller implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryController {
    /// Fixed-latency memory controller: every RAM access takes `bus_latency` cycles.
    #[default]
    Simple,
    /// DRAM controller with row-buffer modeling: CAS/RAS/precharge latencies
    /// and a row-buffer-miss penalty instead of one flat latency.
    Dram,
}

/// Hardware prefetcher type attached to a cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Prefetcher {
    /// No prefetching.
    #[default]
    None,
    /// Prefetches the next sequential cache line after each access.
    NextLine,
    /// Detects stride patterns and prefetches addresses along the stride.
    Stride,
    /// Detects sequential ascending/descending streams and prefetches ahead.
    Stream,
    /// Tags prefetched lines so an accurate-prefetch signal can retrigger.
    Tagged,
}

/// Replacement policy shared by the data cache and the per-engine TLBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used replacement policy.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// Round-robin replacement policy (the hardware-cheap default for TLBs).
    #[serde(alias = "RoundRobin")]
    RoundRobin,
    /// Random replacement policy.
    #[serde(alias = "Random")]
    Random,
}

/// Branch prediction algorithm types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BranchPredictor {
    /// Always predicts not-taken.
    #[default]
    Static,
    /// Global history predictor (gshare).
    GShare,
    /// Neural (perceptron) predictor.
    Perceptron,
    /// Tagged Geometric History Length predictor.
    #[serde(alias = "TAGE")]
    Tage,
    /// Combines local and global predictors via a meta-predictor.
    Tournament,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use rv32o3_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.general.trace_instructions, false);
/// assert_eq!(config.pipeline.rob_num, 64);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// General simulation settings.
    pub general: GeneralConfig,
    /// System memory map and bus parameters.
    pub system: SystemConfig,
    /// Main memory and data-cache configuration.
    pub memory: MemoryConfig,
    /// L1/L2/L3 cache hierarchy configuration.
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// MMU (TLB) configuration.
    pub mmu: MmuConfig,
    /// Pipeline structural widths, queue depths, and FU latencies.
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            system: SystemConfig::default(),
            memory: MemoryConfig::default(),
            cache: CacheHierarchyConfig::default(),
            mmu: MmuConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// General simulation settings and options.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Enable per-cycle pipeline tracing (stage occupancy, squash events).
    #[serde(default)]
    pub trace_instructions: bool,

    /// Initial PC value (defaults to RAM base).
    #[serde(default = "GeneralConfig::default_start_pc")]
    pub start_pc: u32,

    /// Direct execution mode: bare-metal binary, no kernel. Traps halt the run
    /// instead of jumping to `mtvec`/`stvec`.
    #[serde(default = "GeneralConfig::default_direct_mode")]
    pub direct_mode: bool,

    /// Initial stack pointer (only used when `direct_mode` is true). Defaults
    /// to `ram_base + ram_size` if not set.
    #[serde(default)]
    pub initial_sp: Option<u32>,

    /// Number of cycles with no commit progress before hang detection aborts
    /// the run with a [`crate::common::FatalError`]-style diagnostic.
    #[serde(default = "GeneralConfig::default_hang_threshold")]
    pub hang_detection_threshold: u64,
}

impl GeneralConfig {
    fn default_start_pc() -> u32 {
        defaults::RAM_BASE
    }

    fn default_direct_mode() -> bool {
        true
    }

    fn default_hang_threshold() -> u64 {
        defaults::HANG_DETECTION_THRESHOLD
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_instructions: false,
            start_pc: defaults::RAM_BASE,
            direct_mode: true,
            initial_sp: None,
            hang_detection_threshold: defaults::HANG_DETECTION_THRESHOLD,
        }
    }
}

/// System memory map and bus configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// UART MMIO base address.
    #[serde(default = "SystemConfig::default_uart_base")]
    pub uart_base: u32,

    /// PLIC MMIO base address.
    #[serde(default = "SystemConfig::default_plic_base")]
    pub plic_base: u32,

    /// Main RAM base address.
    #[serde(default = "SystemConfig::default_ram_base")]
    pub ram_base: u32,

    /// System bus latency in cycles, charged once per arbitrated request.
    #[serde(default = "SystemConfig::default_bus_latency")]
    pub bus_latency: u64,

    /// System bus width in bytes.
    #[serde(default = "SystemConfig::default_bus_width")]
    pub bus_width: u64,

    /// VirtIO disk MMIO base address.
    #[serde(default = "SystemConfig::default_disk_base")]
    pub disk_base: u32,

    /// CLINT (core-local interruptor) MMIO base address.
    #[serde(default = "SystemConfig::default_clint_base")]
    pub clint_base: u32,

    /// CLINT timer divider (mtime increments every N cycles).
    #[serde(default = "SystemConfig::default_clint_divider")]
    pub clint_divider: u64,

    /// System controller (poweroff/reset) MMIO base address.
    #[serde(default = "SystemConfig::default_syscon_base")]
    pub syscon_base: u32,

    /// Kernel load offset from RAM base.
    #[serde(default = "SystemConfig::default_kernel_offset")]
    pub kernel_offset: u32,

    /// When true, UART output is mirrored to stderr.
    #[serde(default)]
    pub uart_to_stderr: bool,
}

impl SystemConfig {
    fn default_uart_base() -> u32 {
        defaults::UART_BASE
    }

    fn default_plic_base() -> u32 {
        defaults::PLIC_BASE
    }

    fn default_ram_base() -> u32 {
        defaults::RAM_BASE
    }

    fn default_bus_latency() -> u64 {
        defaults::BUS_LATENCY
    }

    fn default_bus_width() -> u64 {
        defaults::BUS_WIDTH
    }

    fn default_disk_base() -> u32 {
        defaults::DISK_BASE
    }

    fn default_clint_base() -> u32 {
        defaults::CLINT_BASE
    }

    fn default_clint_divider() -> u64 {
        defaults::CLINT_DIVIDER
    }

    fn default_syscon_base() -> u32 {
        defaults::SYSCON_BASE
    }

    fn default_kernel_offset() -> u32 {
        defaults::KERNEL_OFFSET
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            uart_base: defaults::UART_BASE,
            plic_base: defaults::PLIC_BASE,
            ram_base: defaults::RAM_BASE,
            bus_latency: defaults::BUS_LATENCY,
            bus_width: defaults::BUS_WIDTH,
            disk_base: defaults::DISK_BASE,
            clint_base: defaults::CLINT_BASE,
            clint_divider: defaults::CLINT_DIVIDER,
            syscon_base: defaults::SYSCON_BASE,
            kernel_offset: defaults::KERNEL_OFFSET,
            uart_to_stderr: false,
        }
    }
}

/// Main memory and data-cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// RAM size in bytes.
    #[serde(default = "MemoryConfig::default_ram_size")]
    pub ram_size: usize,

    /// Memory controller type.
    #[serde(default)]
    pub controller: MemoryController,

    /// Cache hit latency in cycles.
    #[serde(default = "MemoryConfig::default_hit_latency")]
    pub cache_hit_latency: u64,

    /// Cache miss base latency in cycles, before RNG jitter is added.
    #[serde(default = "MemoryConfig::default_miss_latency")]
    pub cache_miss_latency: u64,

    /// Span of the deterministic miss-latency jitter (`rand() % span`).
    #[serde(default = "MemoryConfig::default_jitter_span")]
    pub cache_miss_jitter_span: u64,

    /// Seed for the cache's miss-latency jitter LCG. Fixing this seed makes
    /// the jitter fully reproducible across runs.
    #[serde(default = "MemoryConfig::default_rng_seed")]
    pub cache_rng_seed: u64,

    /// Cache size in bytes.
    #[serde(default = "MemoryConfig::default_cache_size")]
    pub cache_size_bytes: usize,

    /// Cache line size in bytes.
    #[serde(default = "MemoryConfig::default_cache_line")]
    pub cache_line_bytes: usize,

    /// Cache associativity (number of ways).
    #[serde(default = "MemoryConfig::default_cache_ways")]
    pub cache_ways: usize,

    /// Cache replacement policy.
    #[serde(default)]
    pub cache_policy: ReplacementPolicy,

    /// Maximum number of simultaneously outstanding cache misses.
    #[serde(default = "MemoryConfig::default_max_pending")]
    pub max_pending_reqs: usize,

    /// DRAM CAS (column access strobe) latency in cycles. Only consulted
    /// when `controller` is [`MemoryController::Dram`].
    #[serde(default = "MemoryConfig::default_t_cas")]
    pub t_cas: u64,

    /// DRAM RAS (row access strobe) latency in cycles.
    #[serde(default = "MemoryConfig::default_t_ras")]
    pub t_ras: u64,

    /// DRAM precharge latency in cycles.
    #[serde(default = "MemoryConfig::default_t_pre")]
    pub t_pre: u64,

    /// DRAM row-buffer miss penalty in cycles.
    #[serde(default = "MemoryConfig::default_row_miss")]
    pub row_miss_latency: u64,
}

impl MemoryConfig {
    fn default_ram_size() -> usize {
        defaults::RAM_SIZE
    }

    fn default_hit_latency() -> u64 {
        defaults::CACHE_HIT_LATENCY
    }

    fn default_miss_latency() -> u64 {
        defaults::CACHE_MISS_LATENCY
    }

    fn default_jitter_span() -> u64 {
        defaults::CACHE_MISS_JITTER_SPAN
    }

    fn default_rng_seed() -> u64 {
        defaults::CACHE_RNG_SEED
    }

    fn default_cache_size() -> usize {
        defaults::CACHE_SIZE
    }

    fn default_cache_line() -> usize {
        defaults::CACHE_LINE
    }

    fn default_cache_ways() -> usize {
        defaults::CACHE_WAYS
    }

    fn default_max_pending() -> usize {
        defaults::MAX_PENDING_REQS
    }

    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    fn default_row_miss() -> u64 {
        defaults::ROW_MISS_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_size: defaults::RAM_SIZE,
            controller: MemoryController::default(),
            cache_hit_latency: defaults::CACHE_HIT_LATENCY,
            cache_miss_latency: defaults::CACHE_MISS_LATENCY,
            cache_miss_jitter_span: defaults::CACHE_MISS_JITTER_SPAN,
            cache_rng_seed: defaults::CACHE_RNG_SEED,
            cache_size_bytes: defaults::CACHE_SIZE,
            cache_line_bytes: defaults::CACHE_LINE,
            cache_ways: defaults::CACHE_WAYS,
            cache_policy: ReplacementPolicy::default(),
            max_pending_reqs: defaults::MAX_PENDING_REQS,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            row_miss_latency: defaults::ROW_MISS_LATENCY,
        }
    }
}

/// Per-level configuration for the synchronous L1/L2/L3 cache hierarchy
/// consulted by [`crate::core::units::cache::CacheSim`].
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// L1 instruction cache.
    #[serde(default)]
    pub l1_i: CacheConfig,
    /// L1 data cache.
    #[serde(default)]
    pub l1_d: CacheConfig,
    /// Unified L2 cache.
    #[serde(default)]
    pub l2: CacheConfig,
    /// Unified L3 cache.
    #[serde(default)]
    pub l3: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::default(),
            l1_d: CacheConfig::default(),
            l2: CacheConfig::default(),
            l3: CacheConfig::default(),
        }
    }
}

/// Configuration for a single level of the cache hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Enable this cache level. Disabled levels are bypassed entirely.
    #[serde(default)]
    pub enabled: bool,
    /// Total cache size in bytes.
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,
    /// Cache line size in bytes.
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,
    /// Associativity (number of ways).
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,
    /// Replacement policy.
    #[serde(default)]
    pub policy: ReplacementPolicy,
    /// Access latency in cycles, added on hit.
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,
    /// Hardware prefetcher type.
    #[serde(default)]
    pub prefetcher: Prefetcher,
    /// Prefetcher pattern table size (stride prefetcher).
    #[serde(default = "CacheConfig::default_prefetch_table")]
    pub prefetch_table_size: usize,
    /// Prefetch degree (lines fetched ahead per trigger).
    #[serde(default = "CacheConfig::default_prefetch_degree")]
    pub prefetch_degree: usize,
}

impl CacheConfig {
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    fn default_ways() -> usize {
        defaults::CACHE_WAYS
    }

    fn default_latency() -> u64 {
        defaults::CACHE_LEVEL_LATENCY
    }

    fn default_prefetch_table() -> usize {
        defaults::PREFETCH_TABLE_SIZE
    }

    fn default_prefetch_degree() -> usize {
        defaults::PREFETCH_DEGREE
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size_bytes: defaults::CACHE_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::CACHE_WAYS,
            policy: ReplacementPolicy::default(),
            latency: defaults::CACHE_LEVEL_LATENCY,
            prefetcher: Prefetcher::default(),
            prefetch_table_size: defaults::PREFETCH_TABLE_SIZE,
            prefetch_degree: defaults::PREFETCH_DEGREE,
        }
    }
}

/// MMU (TLB) configuration, shared by the instruction and data translation engines.
#[derive(Debug, Clone, Deserialize)]
pub struct MmuConfig {
    /// Per-engine (ITLB/DTLB) TLB entry count.
    #[serde(default = "MmuConfig::default_tlb_size")]
    pub tlb_size: usize,

    /// TLB replacement policy.
    #[serde(default)]
    pub tlb_policy: ReplacementPolicy,
}

impl MmuConfig {
    fn default_tlb_size() -> usize {
        defaults::TLB_SIZE
    }
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            tlb_size: defaults::TLB_SIZE,
            tlb_policy: ReplacementPolicy::default(),
        }
    }
}

/// Pipeline structural widths, queue depths, and functional-unit latencies.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Instructions fetched per cycle.
    #[serde(default = "PipelineConfig::default_fetch_width")]
    pub fetch_width: usize,

    /// Instructions decoded per cycle.
    #[serde(default = "PipelineConfig::default_decode_width")]
    pub decode_width: usize,

    /// Uops dispatched (renamed + enqueued) per cycle.
    #[serde(default = "PipelineConfig::default_dispatch_width")]
    pub dispatch_width: usize,

    /// Uops issued per cycle.
    #[serde(default = "PipelineConfig::default_issue_width")]
    pub issue_width: usize,

    /// Instructions committed per cycle.
    #[serde(default = "PipelineConfig::default_commit_width")]
    pub commit_width: usize,

    /// Number of issue queues.
    #[serde(default = "PipelineConfig::default_iq_num")]
    pub iq_num: usize,

    /// Reorder buffer entry count.
    #[serde(default = "PipelineConfig::default_rob_num")]
    pub rob_num: usize,

    /// Physical register file size (`P`).
    #[serde(default = "PipelineConfig::default_prf_size")]
    pub prf_size: usize,

    /// Maximum number of in-flight (unresolved) branches.
    #[serde(default = "PipelineConfig::default_max_br_num")]
    pub max_br_num: usize,

    /// Maximum number of branches dispatched in a single cycle.
    #[serde(default = "PipelineConfig::default_max_br_per_cycle")]
    pub max_br_per_cycle: usize,

    /// Store queue entry count.
    #[serde(default = "PipelineConfig::default_stq_num")]
    pub stq_num: usize,

    /// Load queue entry count.
    #[serde(default = "PipelineConfig::default_max_inflight_loads")]
    pub max_inflight_loads: usize,

    /// Fetch target queue entry count.
    #[serde(default = "PipelineConfig::default_ftq_size")]
    pub ftq_size: usize,

    /// Functional-unit latencies, indexed by FU kind.
    #[serde(default)]
    pub fu_latency: FuLatencyConfig,

    /// Branch predictor algorithm.
    #[serde(default)]
    pub branch_predictor: BranchPredictor,

    /// Branch Target Buffer entry count.
    #[serde(default = "PipelineConfig::default_btb_size")]
    pub btb_size: usize,

    /// Return Address Stack depth.
    #[serde(default = "PipelineConfig::default_ras_size")]
    pub ras_size: usize,

    /// MISA register override (e.g. "RV32IMAFC").
    #[serde(default)]
    pub misa_override: Option<String>,

    /// TAGE predictor configuration.
    #[serde(default)]
    pub tage: TageConfig,

    /// Perceptron predictor configuration.
    #[serde(default)]
    pub perceptron: PerceptronConfig,

    /// Tournament predictor configuration.
    #[serde(default)]
    pub tournament: TournamentConfig,

    /// Which backend engine to build: in-order or out-of-order.
    #[serde(default)]
    pub backend: crate::core::pipeline::engine::BackendType,
}

impl PipelineConfig {
    fn default_fetch_width() -> usize {
        defaults::FETCH_WIDTH
    }

    fn default_decode_width() -> usize {
        defaults::DECODE_WIDTH
    }

    fn default_dispatch_width() -> usize {
        defaults::DISPATCH_WIDTH
    }

    fn default_issue_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    fn default_commit_width() -> usize {
        defaults::COMMIT_WIDTH
    }

    fn default_iq_num() -> usize {
        defaults::IQ_NUM
    }

    fn default_rob_num() -> usize {
        defaults::ROB_NUM
    }

    fn default_prf_size() -> usize {
        defaults::PRF_SIZE
    }

    fn default_max_br_num() -> usize {
        defaults::MAX_BR_NUM
    }

    fn default_max_br_per_cycle() -> usize {
        defaults::MAX_BR_PER_CYCLE
    }

    fn default_stq_num() -> usize {
        defaults::STQ_NUM
    }

    fn default_max_inflight_loads() -> usize {
        defaults::MAX_INFLIGHT_LOADS
    }

    fn default_ftq_size() -> usize {
        defaults::FTQ_SIZE
    }

    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }

    fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_width: defaults::FETCH_WIDTH,
            decode_width: defaults::DECODE_WIDTH,
            dispatch_width: defaults::DISPATCH_WIDTH,
            issue_width: defaults::ISSUE_WIDTH,
            commit_width: defaults::COMMIT_WIDTH,
            iq_num: defaults::IQ_NUM,
            rob_num: defaults::ROB_NUM,
            prf_size: defaults::PRF_SIZE,
            max_br_num: defaults::MAX_BR_NUM,
            max_br_per_cycle: defaults::MAX_BR_PER_CYCLE,
            stq_num: defaults::STQ_NUM,
            max_inflight_loads: defaults::MAX_INFLIGHT_LOADS,
            ftq_size: defaults::FTQ_SIZE,
            fu_latency: FuLatencyConfig::default(),
            branch_predictor: BranchPredictor::default(),
            btb_size: defaults::BTB_SIZE,
            ras_size: defaults::RAS_SIZE,
            misa_override: None,
            tage: TageConfig::default(),
            perceptron: PerceptronConfig::default(),
            tournament: TournamentConfig::default(),
            backend: crate::core::pipeline::engine::BackendType::default(),
        }
    }
}

/// TAGE (Tagged Geometric) predictor configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TageConfig {
    /// Number of tagged tables.
    #[serde(default = "TageConfig::default_banks")]
    pub num_banks: usize,

    /// Entries per table.
    #[serde(default = "TageConfig::default_table_size")]
    pub table_size: usize,

    /// Loop predictor table size.
    #[serde(default = "TageConfig::default_loop_size")]
    pub loop_table_size: usize,

    /// Useful-counter reset interval, in branches.
    #[serde(default = "TageConfig::default_reset_interval")]
    pub reset_interval: u32,

    /// History length for each bank.
    #[serde(default = "TageConfig::default_history_lengths")]
    pub history_lengths: Vec<usize>,

    /// Tag width for each bank.
    #[serde(default = "TageConfig::default_tag_widths")]
    pub tag_widths: Vec<usize>,
}

impl TageConfig {
    fn default_banks() -> usize {
        defaults::TAGE_BANKS
    }

    fn default_table_size() -> usize {
        defaults::TAGE_TABLE_SIZE
    }

    fn default_loop_size() -> usize {
        defaults::TAGE_LOOP_SIZE
    }

    fn default_reset_interval() -> u32 {
        defaults::TAGE_RESET_INTERVAL
    }

    /// Geometric progression of history lengths, shortest (most specific) first.
    fn default_history_lengths() -> Vec<usize> {
        vec![5, 15, 44, 130]
    }

    /// Tag widths increase with history length.
    fn default_tag_widths() -> Vec<usize> {
        vec![9, 9, 10, 10]
    }
}

/// Perceptron branch predictor configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PerceptronConfig {
    /// Global history length.
    #[serde(default = "PerceptronConfig::default_history")]
    pub history_length: usize,

    /// Weight table size (log2).
    #[serde(default = "PerceptronConfig::default_table_bits")]
    pub table_bits: usize,
}

impl PerceptronConfig {
    fn default_history() -> usize {
        defaults::PERCEPTRON_HISTORY
    }

    fn default_table_bits() -> usize {
        defaults::PERCEPTRON_TABLE_BITS
    }
}

/// Tournament branch predictor configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TournamentConfig {
    /// Global history table size (log2).
    #[serde(default = "TournamentConfig::default_global")]
    pub global_size_bits: usize,

    /// Local history table size (log2).
    #[serde(default = "TournamentConfig::default_local_hist")]
    pub local_hist_bits: usize,

    /// Local prediction table size (log2).
    #[serde(default = "TournamentConfig::default_local_pred")]
    pub local_pred_bits: usize,
}

impl TournamentConfig {
    fn default_global() -> usize {
        defaults::TOURNAMENT_GLOBAL_BITS
    }

    fn default_local_hist() -> usize {
        defaults::TOURNAMENT_LOCAL_HIST_BITS
    }

    fn default_local_pred() -> usize {
        defaults::TOURNAMENT_LOCAL_PRED_BITS
    }
}

/// Per-functional-unit-kind latency, in cycles. The divider's value is the
/// base (early-out may complete sooner; see `calculate_latency` in the
/// divider unit).
#[derive(Debug, Clone, Deserialize)]
pub struct FuLatencyConfig {
    /// ALU latency.
    #[serde(default = "FuLatencyConfig::default_alu")]
    pub alu: u64,
    /// Multiplier latency.
    #[serde(default = "FuLatencyConfig::default_mul")]
    pub mul: u64,
    /// Divider base latency.
    #[serde(default = "FuLatencyConfig::default_div")]
    pub div: u64,
    /// Load address-generation-unit latency.
    #[serde(default = "FuLatencyConfig::default_load_agu")]
    pub load_agu: u64,
    /// Store address-generation-unit latency.
    #[serde(default = "FuLatencyConfig::default_sta_agu")]
    pub sta_agu: u64,
    /// Store-data unit latency.
    #[serde(default = "FuLatencyConfig::default_std")]
    pub std: u64,
    /// Branch unit latency.
    #[serde(default = "FuLatencyConfig::default_br")]
    pub br: u64,
    /// CSR unit latency.
    #[serde(default = "FuLatencyConfig::default_csr")]
    pub csr: u64,
    /// Floating-point unit latency.
    #[serde(default = "FuLatencyConfig::default_fp")]
    pub fp: u64,
}

impl FuLatencyConfig {
    fn default_alu() -> u64 {
        defaults::ALU_LATENCY
    }
    fn default_mul() -> u64 {
        defaults::MUL_LATENCY
    }
    fn default_div() -> u64 {
        defaults::DIV_LATENCY
    }
    fn default_load_agu() -> u64 {
        defaults::LOAD_AGU_LATENCY
    }
    fn default_sta_agu() -> u64 {
        defaults::STA_AGU_LATENCY
    }
    fn default_std() -> u64 {
        defaults::STD_LATENCY
    }
    fn default_br() -> u64 {
        defaults::BR_LATENCY
    }
    fn default_csr() -> u64 {
        defaults::CSR_LATENCY
    }
    fn default_fp() -> u64 {
        defaults::FP_LATENCY
    }
}

impl Default for FuLatencyConfig {
    fn default() -> Self {
        Self {
            alu: defaults::ALU_LATENCY,
            mul: defaults::MUL_LATENCY,
            div: defaults::DIV_LATENCY,
            load_agu: defaults::LOAD_AGU_LATENCY,
            sta_agu: defaults::STA_AGU_LATENCY,
            std: defaults::STD_LATENCY,
            br: defaults::BR_LATENCY,
            csr: defaults::CSR_LATENCY,
            fp: defaults::FP_LATENCY,
        }
    }
}
