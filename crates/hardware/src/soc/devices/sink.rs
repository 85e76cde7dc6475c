//! Peripheral sink: the narrow, specified MMIO protocol observed by
//! `on_mem_store_effective`.
//!
//! Unlike the byte-granular, multi-device [`super::Device`] bus used by the
//! upstream SoC, this sink implements exactly the handful of addresses named
//! by the external interface: a one-byte UART output port, a UART status
//! register, and a PLIC claim/complete register whose low byte clears
//! interrupt-pending state. It is driven directly by the memory subsystem's
//! store-commit path rather than routed through the general interconnect,
//! since its job is to observe effective stores, not to serve as addressable
//! RAM-like storage.

/// Offset of the UART data/output byte within `uart_base`.
pub const UART_DATA_OFFSET: u32 = 0;
/// Offset of the UART status byte within `uart_base`.
pub const UART_STATUS_OFFSET: u32 = 1;

/// UART status value written to raise mip/sip external-interrupt-pending bits.
const UART_STATUS_RAISE_INTERRUPT: u32 = 7;
/// UART status value written to set the UART's own ready bit.
const UART_STATUS_SET_READY: u32 = 5;

/// Offset of the PLIC claim/complete register within `plic_base`.
pub const PLIC_CLAIM_OFFSET: u32 = 0;
/// Low-byte value written to the claim register to clear pending bits.
const PLIC_CLAIM_CLEAR: u32 = 0xa;

/// Well-known oracle timer address: loads from here return `sim_time` and are
/// marked `difftest_skip` rather than compared against the reference model.
pub const TIMER_ADDR: u32 = 0x1fd0_e000;

/// Side effect produced by an observed store, to be applied by the caller at
/// the appropriate two-phase boundary (immediate print vs. commit-time CSR
/// update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEffect {
    /// No externally visible effect.
    None,
    /// Print this byte to standard output immediately.
    PrintByte(u8),
    /// Raise the external-interrupt-pending bit in mip/sip, applied at commit
    /// of the store that caused it.
    RaiseInterruptPending,
    /// Set the UART's internal ready bit (status only, no CSR effect).
    SetReady,
    /// Clear previously raised interrupt-pending bits.
    ClearInterruptPending,
}

/// Observes store-effective notifications and MMIO reads for the UART/PLIC
/// peripheral surface.
pub struct PeripheralSink {
    uart_base: u32,
    plic_base: u32,
    /// UART ready bit, set by [`SinkEffect::SetReady`] and readable back by
    /// the guest through the status byte.
    uart_ready: bool,
}

impl PeripheralSink {
    /// Creates a new sink observing the given UART and PLIC base addresses.
    pub fn new(uart_base: u32, plic_base: u32) -> Self {
        Self {
            uart_base,
            plic_base,
            uart_ready: false,
        }
    }

    /// Called exactly once per store reaching physical memory. Returns the
    /// side effect this store should have, if any.
    pub fn on_mem_store_effective(&mut self, paddr: u32, new_word_value: u32) -> SinkEffect {
        if paddr == self.uart_base + UART_DATA_OFFSET {
            return SinkEffect::PrintByte((new_word_value & 0xFF) as u8);
        }

        if paddr == self.uart_base + UART_STATUS_OFFSET {
            return match new_word_value & 0xFF {
                UART_STATUS_RAISE_INTERRUPT => SinkEffect::RaiseInterruptPending,
                UART_STATUS_SET_READY => {
                    self.uart_ready = true;
                    SinkEffect::SetReady
                }
                _ => SinkEffect::None,
            };
        }

        if paddr == self.plic_base + PLIC_CLAIM_OFFSET && (new_word_value & 0xFF) == PLIC_CLAIM_CLEAR {
            return SinkEffect::ClearInterruptPending;
        }

        SinkEffect::None
    }

    /// Returns `(data, difftest_skip)` for a load at `paddr`, if this sink
    /// claims the address. The timer oracle register is the only load-side
    /// special case; everything else returns `None` and is serviced by the
    /// ordinary memory path.
    pub fn read_mmio(&self, paddr: u32, sim_time: u64) -> Option<(u32, bool)> {
        if paddr == TIMER_ADDR {
            return Some(((sim_time & 0xFFFF_FFFF) as u32, true));
        }
        if paddr == self.uart_base + UART_STATUS_OFFSET {
            return Some((self.uart_ready as u32, false));
        }
        None
    }
}
