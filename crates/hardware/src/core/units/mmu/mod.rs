//! Sv32 Memory Management Unit.
//!
//! Each engine (fetch-side ITLB, LSU-side DTLB) gets its own [`Tlb`]; both
//! share one [`PageTableWalker`] per §4.11. A TLB hit resolves in the same
//! cycle; a miss fires the walker's request/poll protocol and the caller
//! must retry [`Mmu::translate`] on a later cycle once
//! [`Mmu::walk_resp_valid`] reports the walk finished.
//!
//! Retained as in-workspace reference pending the final trim: [`pmp`], whose
//! Physical Memory Protection checks have no counterpart here.

pub mod pmp;
pub mod ptw;
pub mod tlb;

use crate::common::{AccessType, FatalError, PhysAddr, TranslationResult, Trap, VirtAddr};
use crate::core::arch::mode::PrivilegeMode;

pub use ptw::{PageTableWalker, PtwClient, WalkOutcome};
pub use tlb::Tlb;

/// The small slice of `mstatus`/`satp` state a translation needs, decoupled
/// from the CSR file so this module doesn't need to know its layout.
#[derive(Clone, Copy, Debug)]
pub struct TranslateContext {
    pub privilege: PrivilegeMode,
    pub root_ppn: u32,
    pub asid: u16,
    pub mode_enabled: bool,
    /// `mstatus.SUM`: supervisor may access user pages.
    pub sum: bool,
    /// `mstatus.MXR`: executable pages are also readable.
    pub mxr: bool,
}

/// Outcome of asking the MMU to translate an address this cycle.
#[derive(Clone, Copy, Debug)]
pub enum TranslateOutcome {
    /// Resolved this cycle, either by bypass, TLB hit, or a just-finished walk.
    Done(TranslationResult),
    /// A walk was started (or was already in flight); the caller must retry
    /// next cycle.
    WalkPending,
}

fn page_fault(vaddr: VirtAddr, access: AccessType) -> Trap {
    match access {
        AccessType::Fetch => Trap::InstructionPageFault(vaddr.val()),
        AccessType::Read => Trap::LoadPageFault(vaddr.val()),
        AccessType::Write => Trap::StorePageFault(vaddr.val()),
    }
}

impl TlbPermError {
    fn into_trap(self, vaddr: VirtAddr) -> Trap {
        match self.access {
            AccessType::Write => Trap::StorePageFault(vaddr.val()),
            AccessType::Fetch => Trap::InstructionPageFault(vaddr.val()),
            AccessType::Read => Trap::LoadPageFault(vaddr.val()),
        }
    }
}

struct TlbPermError {
    access: AccessType,
}

fn check_perms(
    lookup: &tlb::TlbLookup,
    access: AccessType,
    ctx: &TranslateContext,
) -> Result<(), TlbPermError> {
    let readable = lookup.r || (lookup.x && ctx.mxr);
    let ok = match access {
        AccessType::Read => readable,
        AccessType::Write => lookup.w,
        AccessType::Fetch => lookup.x,
    };
    if !ok {
        return Err(TlbPermError { access });
    }

    if ctx.privilege == PrivilegeMode::User && !lookup.u {
        return Err(TlbPermError { access });
    }
    if ctx.privilege == PrivilegeMode::Supervisor && lookup.u {
        if !ctx.sum {
            return Err(TlbPermError { access });
        }
        if access == AccessType::Fetch {
            return Err(TlbPermError { access });
        }
    }
    Ok(())
}

fn compose_paddr(vaddr: VirtAddr, ppn: u32, is_megapage: bool) -> PhysAddr {
    // `ppn`'s low 10 bits (PPN0) are zero for a megapage leaf (checked at
    // walk time), so `ppn << 12` already lands on a 4MB boundary and the
    // megapage offset fills in the rest.
    if is_megapage {
        PhysAddr::new((ppn << 12) | vaddr.megapage_offset())
    } else {
        PhysAddr::new((ppn << 12) | vaddr.page_offset())
    }
}

/// Sv32 MMU: per-engine TLBs plus the shared walker.
pub struct Mmu {
    pub dtlb: Tlb,
    pub itlb: Tlb,
    pub walker: PageTableWalker,
}

impl Mmu {
    pub fn new(tlb_size: usize) -> Self {
        Self {
            dtlb: Tlb::new(tlb_size),
            itlb: Tlb::new(tlb_size),
            walker: PageTableWalker::new(),
        }
    }

    fn tlb_mut(&mut self, client: PtwClient) -> &mut Tlb {
        match client {
            PtwClient::Dtlb => &mut self.dtlb,
            PtwClient::Itlb => &mut self.itlb,
        }
    }

    /// Attempts to translate `vaddr` for `client` this cycle. On a TLB miss
    /// this fires (or keeps waiting on) a walk and returns
    /// [`TranslateOutcome::WalkPending`]; the caller must call this again on
    /// a later cycle with the same arguments.
    pub fn translate(
        &mut self,
        client: PtwClient,
        vaddr: VirtAddr,
        access: AccessType,
        ctx: &TranslateContext,
    ) -> Result<TranslateOutcome, FatalError> {
        if ctx.privilege == PrivilegeMode::Machine || !ctx.mode_enabled {
            return Ok(TranslateOutcome::Done(TranslationResult::success(
                PhysAddr::new(vaddr.val()),
                0,
            )));
        }

        let vpn1 = vaddr.vpn1();
        let vpn0 = vaddr.vpn0();
        let tlb = self.tlb_mut(client);

        if let Some(lookup) = tlb.lookup(vpn1, vpn0, ctx.asid)? {
            return Ok(TranslateOutcome::Done(match check_perms(&lookup, access, ctx) {
                Ok(()) => TranslationResult::success(
                    compose_paddr(vaddr, lookup.ppn, lookup.is_megapage),
                    0,
                ),
                Err(e) => TranslationResult::fault(e.into_trap(vaddr), 0),
            }));
        }

        if self.walker.resp_valid(client) {
            let outcome = self.walker.consume_resp(client).expect("resp_valid just checked");
            return Ok(TranslateOutcome::Done(match outcome {
                WalkOutcome::Leaf {
                    vpn1,
                    vpn0,
                    is_megapage,
                    ppn,
                    r,
                    w,
                    x,
                    u,
                    global,
                } => {
                    self.tlb_mut(client)
                        .insert(vpn1, vpn0, is_megapage, ppn, ctx.asid, global, r, w, x, u);
                    let lookup = tlb::TlbLookup {
                        ppn,
                        is_megapage,
                        r,
                        w,
                        x,
                        u,
                    };
                    match check_perms(&lookup, access, ctx) {
                        Ok(()) => TranslationResult::success(
                            compose_paddr(vaddr, ppn, is_megapage),
                            0,
                        ),
                        Err(e) => TranslationResult::fault(e.into_trap(vaddr), 0),
                    }
                }
                WalkOutcome::Fault(trap) => TranslationResult::fault(trap, 0),
            }));
        }

        self.walker.send_req(client, vaddr, ctx.root_ppn, access);
        Ok(TranslateOutcome::WalkPending)
    }

    /// `SFENCE.VMA` with no operands, or a SATP write: drop everything.
    pub fn flush_all(&mut self) {
        self.dtlb.flush_all();
        self.itlb.flush_all();
    }

    /// `SFENCE.VMA rs1=x0, rs2=asid`: drop only that ASID's non-global entries.
    pub fn flush_asid(&mut self, asid: u16) {
        self.dtlb.flush_asid(asid);
        self.itlb.flush_asid(asid);
    }

    /// Abandons an in-flight walk for `client` (e.g. the requesting uop was
    /// squashed). Returns the [`crate::core::units::memsys::ReadRequester`]
    /// tag the caller must tell the response router to drop, if a memory
    /// request was already in flight for this walk.
    pub fn flush_walk(
        &mut self,
        client: PtwClient,
    ) -> Option<crate::core::units::memsys::ReadRequester> {
        let outstanding = self.walker.outstanding_requester(client);
        self.walker.flush(client);
        outstanding
    }
}
