//! Sv32 Translation Lookaside Buffer.
//!
//! Each engine (instruction or data) owns one of these. Unlike a direct-
//! mapped, mask-indexed TLB, entries are tagged so a fully arbitrary ASID/
//! global/megapage mix can coexist; victim selection is round-robin per
//! §4.11 rather than index-forced overwrite.

use crate::common::FatalError;

/// A single TLB entry.
#[derive(Clone, Copy, Default)]
struct TlbEntry {
    valid: bool,
    /// VPN[1] (bits 22..31 of the virtual address).
    vpn1: u32,
    /// VPN[0] (bits 12..21); ignored (and not compared) for megapage entries.
    vpn0: u32,
    /// Whether this entry maps a 4MB megapage (matches on `vpn1` only).
    is_megapage: bool,
    ppn: u32,
    asid: u16,
    /// Global entries match regardless of the current ASID.
    global: bool,
    r: bool,
    w: bool,
    x: bool,
    u: bool,
}

/// Result of a successful TLB lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlbLookup {
    /// Physical page number the matched entry maps to.
    pub ppn: u32,
    /// Whether the match was a megapage (affects offset width at the caller).
    pub is_megapage: bool,
    /// Read permission.
    pub r: bool,
    /// Write permission.
    pub w: bool,
    /// Execute permission.
    pub x: bool,
    /// User-mode accessible.
    pub u: bool,
}

/// Per-engine Sv32 TLB with round-robin replacement.
pub struct Tlb {
    entries: Vec<TlbEntry>,
    next_victim: usize,
}

impl Tlb {
    /// Creates a TLB with `size` entries, all initially invalid.
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![TlbEntry::default(); size.max(1)],
            next_victim: 0,
        }
    }

    /// Looks up `(vpn1, vpn0)` for the given ASID. Returns
    /// [`FatalError::MultipleTlbMatches`] if more than one entry matches,
    /// which would indicate an insertion-time invariant was violated
    /// elsewhere (stale entries should have been invalidated or evicted).
    pub fn lookup(&self, vpn1: u32, vpn0: u32, asid: u16) -> Result<Option<TlbLookup>, FatalError> {
        let mut found: Option<&TlbEntry> = None;
        for entry in &self.entries {
            if !entry.valid || entry.vpn1 != vpn1 {
                continue;
            }
            if !entry.global && entry.asid != asid {
                continue;
            }
            if !entry.is_megapage && entry.vpn0 != vpn0 {
                continue;
            }
            if found.is_some() {
                return Err(FatalError::MultipleTlbMatches { vpn1 });
            }
            found = Some(entry);
        }

        Ok(found.map(|e| TlbLookup {
            ppn: e.ppn,
            is_megapage: e.is_megapage,
            r: e.r,
            w: e.w,
            x: e.x,
            u: e.u,
        }))
    }

    /// Inserts a new mapping, evicting the round-robin victim.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        vpn1: u32,
        vpn0: u32,
        is_megapage: bool,
        ppn: u32,
        asid: u16,
        global: bool,
        r: bool,
        w: bool,
        x: bool,
        u: bool,
    ) {
        let idx = self.next_victim;
        self.next_victim = (self.next_victim + 1) % self.entries.len();
        self.entries[idx] = TlbEntry {
            valid: true,
            vpn1,
            vpn0,
            is_megapage,
            ppn,
            asid,
            global,
            r,
            w,
            x,
            u,
        };
    }

    /// Invalidates every entry (`SFENCE.VMA` with no operands, or a SATP write).
    pub fn flush_all(&mut self) {
        for e in &mut self.entries {
            e.valid = false;
        }
    }

    /// Invalidates entries matching `asid` (non-global only), for a targeted
    /// `SFENCE.VMA rs1=x0, rs2=asid`.
    pub fn flush_asid(&mut self, asid: u16) {
        for e in &mut self.entries {
            if e.valid && !e.global && e.asid == asid {
                e.valid = false;
            }
        }
    }
}
