//! Clock Probes
//!
//! Raw readings behind the time and cycle meters. Uses RDTSCP on x86_64 and
//! CNTVCT_EL0 on AArch64 for cycle counting, and `std::time::Instant` for
//! wall-clock time.

use std::time::Instant;

/// Read the CPU cycle/tick counter (platform-specific).
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub(crate) fn read_cycles() -> u64 {
    // SAFETY: RDTSCP is available on all x86_64 CPUs since ~2006.
    // It waits for all prior instructions to complete before reading.
    unsafe {
        let mut _aux: u32 = 0;
        std::arch::x86_64::__rdtscp(&mut _aux)
    }
}

/// Read the virtual counter timer on AArch64 (comparable to x86 TSC).
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub(crate) fn read_cycles() -> u64 {
    let cnt: u64;
    // SAFETY: CNTVCT_EL0 is readable from EL0 (userspace) on all AArch64
    // implementations and increases monotonically at a fixed frequency.
    unsafe {
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) cnt, options(nostack, nomem));
    }
    cnt
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
pub(crate) fn read_cycles() -> u64 {
    0
}

/// Whether this platform provides real cycle counters.
pub const HAS_CYCLE_COUNTER: bool = cfg!(target_arch = "x86_64") || cfg!(target_arch = "aarch64");

/// Monotonic origin for wall-clock readings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClockOrigin {
    origin: Instant,
}

impl ClockOrigin {
    /// Capture the origin at the current instant
    pub(crate) fn now() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the origin
    #[inline(always)]
    pub(crate) fn elapsed_nanos(&self) -> u128 {
        self.origin.elapsed().as_nanos()
    }
}
