//! Memory Access Helpers.
//!
//! This module provides the interface between the CPU and the memory subsystem.
//! It performs the following:
//! 1. **Address Translation:** Interfaces with the MMU to convert virtual to physical addresses.
//! 2. **Cache Simulation:** Models the behavior of L1, L2, and L3 caches during memory access.
//! 3. **Latency Modeling:** Calculates timing penalties for cache hits, misses, and bus transit.

use super::Cpu;
use crate::common::{AccessType, PhysAddr, TranslationResult, Trap, VirtAddr};
use crate::core::arch::csr;
use crate::core::units::memsys::ReadRequester;
use crate::core::units::mmu::{PtwClient, TranslateContext, TranslateOutcome};

impl Cpu {
    /// Builds the slice of `satp`/`mstatus` state the MMU needs from the
    /// current CSR file, decoding `satp` per the Sv32 layout (MODE bit 31,
    /// ASID bits 30:22, PPN bits 21:0).
    fn translate_ctx(&self) -> TranslateContext {
        let satp = self.csrs.satp;
        let mode = (satp >> csr::SATP_MODE_SHIFT) & csr::SATP_MODE_MASK;
        TranslateContext {
            privilege: self.privilege,
            root_ppn: (satp & csr::SATP_PPN_MASK) as u32,
            asid: ((satp >> csr::SATP_ASID_SHIFT) & csr::SATP_ASID_MASK) as u16,
            mode_enabled: mode == csr::SATP_MODE_SV32,
            sum: self.csrs.mstatus & csr::MSTATUS_SUM != 0,
            mxr: self.csrs.mstatus & csr::MSTATUS_MXR != 0,
        }
    }

    /// Translates a virtual address to a physical address using the MMU.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - The virtual address to translate.
    /// * `access` - The type of memory access (Fetch/Read/Write).
    ///
    /// # Returns
    ///
    /// A `TranslationResult` containing the physical address or a trap if translation fails.
    pub fn translate(&mut self, vaddr: VirtAddr, access: AccessType) -> TranslationResult {
        if self.direct_mode {
            let paddr = vaddr.val();
            if !self.bus.bus.is_valid_address(paddr as u64) {
                let trap = match access {
                    AccessType::Fetch => Trap::InstructionAccessFault(paddr),
                    AccessType::Read => Trap::LoadAccessFault(paddr),
                    AccessType::Write => Trap::StoreAccessFault(paddr),
                };
                return TranslationResult::fault(trap, 0);
            }
            return TranslationResult::success(PhysAddr::new(paddr), 0);
        }

        let ctx = self.translate_ctx();
        let client = if matches!(access, AccessType::Fetch) {
            PtwClient::Itlb
        } else {
            PtwClient::Dtlb
        };

        loop {
            match self.mmu.translate(client, vaddr, access, &ctx) {
                Ok(TranslateOutcome::Done(result)) => return result,
                Ok(TranslateOutcome::WalkPending) => self.drive_walk_to_completion(client),
                Err(_) => {
                    let trap = match access {
                        AccessType::Fetch => Trap::InstructionAccessFault(vaddr.val()),
                        AccessType::Read => Trap::LoadAccessFault(vaddr.val()),
                        AccessType::Write => Trap::StoreAccessFault(vaddr.val()),
                    };
                    return TranslationResult::fault(trap, 0);
                }
            }
        }
    }

    /// Drives the shared page table walker to completion for `client`,
    /// fetching each level's PTE directly off the bus rather than through
    /// the memory subsystem's read arbiter. This resolves a walk within the
    /// same cycle `translate` was called in; it models the walk's memory
    /// traffic and page-table semantics faithfully but not its arbitration
    /// latency against concurrent LSU/PTW memory requests.
    fn drive_walk_to_completion(&mut self, client: PtwClient) {
        let mut requester = match client {
            PtwClient::Dtlb => ReadRequester::PtwDtlb,
            PtwClient::Itlb => ReadRequester::PtwItlb,
        };
        loop {
            let Some(addr) = self.mmu.walker.pending_request_addr(requester) else {
                return;
            };
            self.mmu.walker.on_granted(requester);
            let pte = self.bus.bus.read_u32(addr.val() as u64);
            self.mmu
                .walker
                .on_mem_resp(requester, pte)
                .expect("ptw response routing to an active walk");
            if self.mmu.walker.resp_valid(client) {
                return;
            }
            requester = ReadRequester::PtwWalk;
        }
    }

    /// Simulates a memory access through the cache hierarchy.
    ///
    /// # Arguments
    ///
    /// * `addr` - The physical address to access.
    /// * `access` - The type of memory access.
    ///
    /// # Returns
    ///
    /// The total latency penalty in cycles for the memory operation.
    pub fn simulate_memory_access(&mut self, addr: PhysAddr, access: AccessType) -> u64 {
        let mut total_penalty = 0;
        let raw_addr = addr.val() as u64;
        let ram_latency = self.bus.mem_controller.access_latency(raw_addr);
        let next_lat = ram_latency;
        let is_inst = matches!(access, AccessType::Fetch);
        let is_write = matches!(access, AccessType::Write);

        // Determine which L1 cache applies
        let l1_enabled = if is_inst {
            self.l1_i_cache.enabled
        } else {
            self.l1_d_cache.enabled
        };

        // If no cache level is enabled, there is no memory hierarchy to
        // simulate — the pipeline structural latency is the only cost.
        if !l1_enabled && !self.l2_cache.enabled && !self.l3_cache.enabled {
            return 0;
        }

        let (l1_hit, l1_pen) = if is_inst {
            if self.l1_i_cache.enabled {
                self.l1_i_cache.access(raw_addr, false, next_lat)
            } else {
                (false, 0)
            }
        } else if self.l1_d_cache.enabled {
            self.l1_d_cache.access(raw_addr, is_write, next_lat)
        } else {
            (false, 0)
        };

        total_penalty += l1_pen;
        if is_inst && self.l1_i_cache.enabled {
            if l1_hit {
                self.stats.icache_hits += 1;
                return total_penalty;
            }
            self.stats.icache_misses += 1;
        } else if !is_inst && self.l1_d_cache.enabled {
            if l1_hit {
                self.stats.dcache_hits += 1;
                return total_penalty;
            }
            self.stats.dcache_misses += 1;
        }

        if self.l2_cache.enabled {
            total_penalty += self.l2_cache.latency;
            let (l2_hit, l2_pen) = self.l2_cache.access(raw_addr, is_write, next_lat);
            total_penalty += l2_pen;
            if l2_hit {
                self.stats.l2_hits += 1;
                return total_penalty;
            }
            self.stats.l2_misses += 1;
        }

        if self.l3_cache.enabled {
            total_penalty += self.l3_cache.latency;
            let (l3_hit, l3_pen) = self.l3_cache.access(raw_addr, is_write, next_lat);
            total_penalty += l3_pen;
            if l3_hit {
                self.stats.l3_hits += 1;
                return total_penalty;
            }
            self.stats.l3_misses += 1;
        }

        total_penalty += self.bus.bus.calculate_transit_time(8);
        total_penalty += ram_latency;
        total_penalty += self.bus.bus.calculate_transit_time(64);
        total_penalty
    }
}
