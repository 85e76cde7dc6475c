//! Common utilities and types used throughout the simulator.
//!
//! This module provides fundamental building blocks shared across all components:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** System-wide constants for memory, instructions, and Sv32 geometry.
//! 3. **Memory Access:** Definitions for categorizing memory operations (Fetch/Read/Write).
//! 4. **Error Handling:** Trap and fatal-assertion representations plus translation results.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types, trap definitions, and fatal invariant violations.
pub mod error;

/// Unified general-purpose and floating-point register file.
pub mod reg;

pub use addr::{PhysAddr, VirtAddr};
pub use constants::PAGE_SHIFT;
pub use data::AccessType;
pub use error::{ExceptionStage, FatalError, Trap, TranslationResult};
pub use reg::RegisterFile;
