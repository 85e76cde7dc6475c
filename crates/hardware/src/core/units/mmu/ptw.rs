//! Sv32 hardware page table walker.
//!
//! A single walker engine is shared between the ITLB and DTLB per §4.11: at
//! most one walk is active at a time, and a second client's miss simply waits
//! behind whichever client the arbiter already granted. This mirrors the
//! reference model's single `ptw_block` serving both `PtwClient::DTLB` and
//! `PtwClient::ITLB` (`original_source/MemSubSystem/include/MemSubsystem.h`).
//!
//! Unlike the upstream simulator's [`super::ptw`]-equivalent (still visible
//! as dead reference code in this tree until the final trim pass), this walk
//! never calls a bus directly. Each level's PTE fetch is exposed as a pending
//! address that the memory subsystem arbitrates onto the data cache; the
//! walker only advances when told a request was granted and later handed a
//! response.

use crate::common::{AccessType, FatalError, PhysAddr, Trap, VirtAddr};
use crate::core::units::memsys::ReadRequester;

const PTE_V: u32 = 1 << 0;
const PTE_R: u32 = 1 << 1;
const PTE_W: u32 = 1 << 2;
const PTE_X: u32 = 1 << 3;
const PTE_U: u32 = 1 << 4;
const PTE_G: u32 = 1 << 5;
const PTE_A: u32 = 1 << 6;
const PTE_D: u32 = 1 << 7;
const PTE_PPN_SHIFT: u32 = 10;

const PTE_SIZE: u32 = 4;

/// Which TLB triggered the walk currently occupying the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtwClient {
    Dtlb,
    Itlb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    L1,
    L2,
}

/// A completed walk, ready for its TLB to install and its MMU client to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Leaf {
        vpn1: u32,
        vpn0: u32,
        is_megapage: bool,
        ppn: u32,
        r: bool,
        w: bool,
        x: bool,
        u: bool,
        global: bool,
    },
    Fault(Trap),
}

#[derive(Clone, Copy)]
struct Request {
    vaddr: VirtAddr,
    root_ppn: u32,
    access: AccessType,
}

struct ActiveWalk {
    client: PtwClient,
    req: Request,
    level: Level,
    l1_ppn: u32,
    /// `true` once the arbiter has granted this level's read and we're
    /// waiting on the routed response; `false` while the address is still
    /// pending arbitration.
    awaiting_resp: bool,
    requester: ReadRequester,
}

/// The shared Sv32 page table walker.
pub struct PageTableWalker {
    dtlb_pending: Option<Request>,
    itlb_pending: Option<Request>,
    active: Option<ActiveWalk>,
    dtlb_done: Option<WalkOutcome>,
    itlb_done: Option<WalkOutcome>,
}

impl Default for PageTableWalker {
    fn default() -> Self {
        Self {
            dtlb_pending: None,
            itlb_pending: None,
            active: None,
            dtlb_done: None,
            itlb_done: None,
        }
    }
}

impl PageTableWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a walk for `client`. Returns `false` if that client already has
    /// a walk in flight or an unconsumed result waiting.
    pub fn send_req(
        &mut self,
        client: PtwClient,
        vaddr: VirtAddr,
        root_ppn: u32,
        access: AccessType,
    ) -> bool {
        let (pending, done) = match client {
            PtwClient::Dtlb => (&mut self.dtlb_pending, &self.dtlb_done),
            PtwClient::Itlb => (&mut self.itlb_pending, &self.itlb_done),
        };
        let busy_active = matches!(&self.active, Some(a) if a.client == client);
        if pending.is_some() || done.is_some() || busy_active {
            return false;
        }
        *pending = Some(Request {
            vaddr,
            root_ppn,
            access,
        });
        true
    }

    fn pte_addr(ppn: u32, vpn_field: u32) -> PhysAddr {
        PhysAddr::new((ppn << 12) + vpn_field * PTE_SIZE)
    }

    /// The address this engine wants arbitrated this cycle for `requester`,
    /// if any. Called once per requester slot by the memory subsystem when
    /// assembling [`crate::core::units::memsys::ArbiterRequests`].
    pub fn pending_request_addr(&self, requester: ReadRequester) -> Option<PhysAddr> {
        match requester {
            ReadRequester::PtwWalk => {
                let active = self.active.as_ref()?;
                if active.awaiting_resp {
                    return None;
                }
                let addr = match active.level {
                    Level::L1 => Self::pte_addr(active.req.root_ppn, active.req.vaddr.vpn1()),
                    Level::L2 => Self::pte_addr(active.l1_ppn, active.req.vaddr.vpn0()),
                };
                Some(addr)
            }
            ReadRequester::PtwDtlb => {
                if self.active.is_some() {
                    return None;
                }
                let req = self.dtlb_pending?;
                Some(Self::pte_addr(req.root_ppn, req.vaddr.vpn1()))
            }
            ReadRequester::PtwItlb => {
                if self.active.is_some() {
                    return None;
                }
                let req = self.itlb_pending?;
                Some(Self::pte_addr(req.root_ppn, req.vaddr.vpn1()))
            }
            ReadRequester::Lsu => None,
        }
    }

    /// Notifies the walker that its request tagged `requester` was granted
    /// this cycle, so it should stop re-presenting that address and wait for
    /// the response.
    pub fn on_granted(&mut self, requester: ReadRequester) {
        match requester {
            ReadRequester::PtwWalk => {
                if let Some(active) = &mut self.active {
                    active.awaiting_resp = true;
                }
            }
            ReadRequester::PtwDtlb => {
                if let Some(req) = self.dtlb_pending.take() {
                    self.active = Some(ActiveWalk {
                        client: PtwClient::Dtlb,
                        req,
                        level: Level::L1,
                        l1_ppn: 0,
                        awaiting_resp: true,
                        requester: ReadRequester::PtwDtlb,
                    });
                }
            }
            ReadRequester::PtwItlb => {
                if let Some(req) = self.itlb_pending.take() {
                    self.active = Some(ActiveWalk {
                        client: PtwClient::Itlb,
                        req,
                        level: Level::L1,
                        l1_ppn: 0,
                        awaiting_resp: true,
                        requester: ReadRequester::PtwItlb,
                    });
                }
            }
            ReadRequester::Lsu => {}
        }
    }

    /// If the walker has an outstanding request, which [`ReadRequester`] tag
    /// it was granted under. Used by a flush to tell the response router to
    /// drop the matching in-flight completion.
    pub fn outstanding_requester(&self, client: PtwClient) -> Option<ReadRequester> {
        let active = self.active.as_ref()?;
        (active.client == client && active.awaiting_resp).then_some(active.requester)
    }

    /// Abandons any walk or queued request belonging to `client` (e.g. on
    /// `SFENCE.VMA`). The caller is responsible for dropping a matching
    /// in-flight response first if [`Self::outstanding_requester`] returned one.
    pub fn flush(&mut self, client: PtwClient) {
        match client {
            PtwClient::Dtlb => {
                self.dtlb_pending = None;
                self.dtlb_done = None;
            }
            PtwClient::Itlb => {
                self.itlb_pending = None;
                self.itlb_done = None;
            }
        }
        if matches!(&self.active, Some(a) if a.client == client) {
            self.active = None;
        }
    }

    /// Feeds a routed response back into the walker. `requester` identifies
    /// which slot the response belongs to, matching what [`Self::on_granted`]
    /// was called with.
    pub fn on_mem_resp(&mut self, requester: ReadRequester, data: u32) -> Result<(), FatalError> {
        let active = match &mut self.active {
            Some(a) if a.requester == requester || requester == ReadRequester::PtwWalk => a,
            _ => return Err(FatalError::FreeListCorruption("ptw response with no active walk")),
        };
        active.requester = ReadRequester::PtwWalk;

        let pte = data;
        let level = active.level;
        let outcome = Self::step(active, pte, level);
        if let Some(outcome) = outcome {
            let done_slot = match active.client {
                PtwClient::Dtlb => &mut self.dtlb_done,
                PtwClient::Itlb => &mut self.itlb_done,
            };
            *done_slot = Some(outcome);
            self.active = None;
        }
        Ok(())
    }

    /// Advances one level given the just-fetched PTE. Returns `Some(outcome)`
    /// if the walk finished (leaf or fault), or `None` if it must continue to
    /// the next level (mutating `active` in place).
    fn step(active: &mut ActiveWalk, pte: u32, level: Level) -> Option<WalkOutcome> {
        let access = active.req.access;

        if pte & PTE_V == 0 || (pte & PTE_R == 0 && pte & PTE_W != 0) {
            return Some(WalkOutcome::Fault(page_fault(active.req.vaddr, access)));
        }

        let is_leaf = pte & (PTE_R | PTE_W | PTE_X) != 0;

        if !is_leaf {
            if level == Level::L2 {
                return Some(WalkOutcome::Fault(page_fault(active.req.vaddr, access)));
            }
            active.l1_ppn = pte >> PTE_PPN_SHIFT;
            active.level = Level::L2;
            active.awaiting_resp = false;
            return None;
        }

        if level == Level::L1 {
            let ppn0_field = (pte >> PTE_PPN_SHIFT) & 0x3FF;
            if ppn0_field != 0 {
                return Some(WalkOutcome::Fault(page_fault(active.req.vaddr, access)));
            }
        }

        let r = pte & PTE_R != 0;
        let w = pte & PTE_W != 0;
        let x = pte & PTE_X != 0;
        let u = pte & PTE_U != 0;
        let global = pte & PTE_G != 0;

        let perm_ok = match access {
            AccessType::Read => r,
            AccessType::Write => w,
            AccessType::Fetch => x,
        };
        if !perm_ok {
            return Some(WalkOutcome::Fault(page_fault(active.req.vaddr, access)));
        }

        let ppn = pte >> PTE_PPN_SHIFT;
        Some(WalkOutcome::Leaf {
            vpn1: active.req.vaddr.vpn1(),
            vpn0: active.req.vaddr.vpn0(),
            is_megapage: level == Level::L1,
            ppn,
            r,
            w,
            x,
            u,
            global,
        })
    }

    pub fn resp_valid(&self, client: PtwClient) -> bool {
        match client {
            PtwClient::Dtlb => self.dtlb_done.is_some(),
            PtwClient::Itlb => self.itlb_done.is_some(),
        }
    }

    pub fn consume_resp(&mut self, client: PtwClient) -> Option<WalkOutcome> {
        match client {
            PtwClient::Dtlb => self.dtlb_done.take(),
            PtwClient::Itlb => self.itlb_done.take(),
        }
    }
}

fn page_fault(vaddr: VirtAddr, access: AccessType) -> Trap {
    match access {
        AccessType::Fetch => Trap::InstructionPageFault(vaddr.val()),
        AccessType::Read => Trap::LoadPageFault(vaddr.val()),
        AccessType::Write => Trap::StorePageFault(vaddr.val()),
    }
}
