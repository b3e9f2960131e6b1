// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration — single source of truth for Sercos III protocol
//! constants and per-`Instance` runtime tunables.
//!
//! # Architecture
//!
//! - **Level 1 (static)**: compile-time constants taken from the Sercos
//!   III wire specification (cycle-time bounds, container counts,
//!   inter-frame gaps). These never change at runtime.
//! - **Level 2 (dynamic)**: [`RuntimeConfig`], built once per `Instance`
//!   and passed to every component that needs a tunable (timeouts,
//!   system limits, allowed-loss counts).

// =======================================================================
// Sercos III wire constants (spec §6)
// =======================================================================

/// Minimum communication cycle time (31.25 µs), in nanoseconds.
pub const TSCYC_MIN_NS: u32 = 31_250;
/// 62.5 µs cycle time, in nanoseconds.
pub const TSCYC_62_5_US_NS: u32 = 62_500;
/// 125 µs cycle time, in nanoseconds.
pub const TSCYC_125_US_NS: u32 = 125_000;
/// 250 µs cycle time, in nanoseconds — the smallest value above which only
/// multiples of 250 µs are legal.
pub const TSCYC_250_US_NS: u32 = 250_000;
/// 1 ms cycle time, the most common default, in nanoseconds.
pub const TSCYC_1_MS: u32 = 1_000_000;
/// Maximum communication cycle time (65 000 µs), in nanoseconds.
pub const TSCYC_MAX_NS: u32 = 65_000_000;

/// MDT/AT telegram data length lower bound, in bytes.
pub const TEL_LEN_MIN: u16 = 40;
/// MDT/AT telegram data length upper bound, in bytes.
pub const TEL_LEN_MAX: u16 = 1494;

/// Inter-frame gap before CP3 (bytes).
pub const INTER_FRAME_GAP_CP0_CP2: u16 = 125;
/// Inter-frame gap from CP3 onward (bytes).
pub const INTER_FRAME_GAP_CP3_CP4: u16 = 37;

/// Number of Sercos ports (always 2: redundant ring).
pub const NBR_PORTS: usize = 2;

/// Maximum number of hardware SVC containers the reference MAC can expose.
pub const MAX_HW_CONTAINER_CAP: usize = 32;

/// Maximum Sercos address.
pub const MAX_SERCOS_ADDRESS: u16 = 511;
/// Minimum Sercos address (0 is reserved/broadcast).
pub const MIN_SERCOS_ADDRESS: u16 = 1;

/// Maximum slaves addressable by the 4-bit Hot-Plug field index (per HP device).
pub const HOTPLUG_SLAVES_PER_DEVICE: usize = 16;

/// Number of consecutive identical AT0 cycles required to declare a stable slave list.
pub const CP0_STABLE_CYCLES_REQUIRED: u32 = 100;
/// Timeout window (in cycles) within which `CP0_STABLE_CYCLES_REQUIRED` must be observed.
pub const CP0_STABLE_CYCLES_TIMEOUT: u32 = 1000;

/// Number of ring-delay samples collected per port before averaging.
pub const RING_DELAY_SAMPLES: u32 = 64;

/// Hot-plug per-address scan timeout, in Sercos cycles.
pub const HP0_SCAN_TIMEOUT_CYCLES: u32 = 50;
/// Hot-plug HP0 parameter-broadcast retry envelope.
pub const HP0_BROADCAST_RETRIES: u32 = 10;

/// Validate a requested communication cycle time against the wire bounds.
///
/// Accepts the four named values (31.25/62.5/125/250 µs) or any multiple
/// of 250 µs up to [`TSCYC_MAX_NS`].
#[must_use]
pub fn is_valid_cycle_time_ns(ns: u32) -> bool {
    match ns {
        TSCYC_MIN_NS | TSCYC_62_5_US_NS | TSCYC_125_US_NS => true,
        _ if ns > TSCYC_MAX_NS => false,
        _ if ns < TSCYC_250_US_NS => false,
        _ => ns % TSCYC_250_US_NS == 0,
    }
}

/// Busy-timeout equivalent to roughly one second of cycles at the given cycle time,
/// matching the hardware's own default.
#[must_use]
pub fn default_timeout_cycles(cycle_time_ns: u32) -> u32 {
    (1_000_000_000u64 / u64::from(cycle_time_ns.max(1))) as u32
}

// =======================================================================
// Runtime configuration (per-Instance)
// =======================================================================

/// Per-`Instance` tunables. Built once via [`RuntimeConfig::builder`] and
/// held by `Instance` for the program's lifetime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Communication cycle time, in nanoseconds.
    pub cycle_time_ns: u32,
    /// Maximum number of projected slaves.
    pub max_slaves: usize,
    /// Maximum number of configured connections.
    pub max_connections: usize,
    /// Number of hardware-backed SVC containers (`0..=32`); slave indexes
    /// at or beyond this bound use the software-emulated engine.
    pub max_hw_svc_container: usize,
    /// SVC handshake timeout, in Sercos cycles.
    pub svc_hs_timeout_cycles: u32,
    /// SVC busy timeout, in Sercos cycles.
    pub svc_busy_timeout_cycles: u32,
    /// Default allowed consecutive S-DEV.SlaveValid misses before a slave is deactivated.
    pub allowed_slave_valid_miss: u32,
    /// Bound on successive cyclic telegram errors before `TelErrorOverrun` is raised.
    pub max_nbr_tel_err: u32,
    /// Timing method selector for the Telegram Layout Engine (§4.4).
    pub timing_method: crate::telegram::TimingMethod,
}

impl RuntimeConfig {
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }
}

/// Builder for [`RuntimeConfig`] with the teacher's spec-mandated defaults.
#[derive(Debug, Clone)]
pub struct RuntimeConfigBuilder {
    cycle_time_ns: u32,
    max_slaves: usize,
    max_connections: usize,
    max_hw_svc_container: usize,
    svc_hs_timeout_cycles: u32,
    svc_busy_timeout_cycles: u32,
    allowed_slave_valid_miss: u32,
    max_nbr_tel_err: u32,
    timing_method: crate::telegram::TimingMethod,
}

impl Default for RuntimeConfigBuilder {
    fn default() -> Self {
        Self {
            cycle_time_ns: TSCYC_1_MS,
            max_slaves: 64,
            max_connections: 64,
            max_hw_svc_container: MAX_HW_CONTAINER_CAP,
            svc_hs_timeout_cycles: default_timeout_cycles(TSCYC_1_MS),
            svc_busy_timeout_cycles: default_timeout_cycles(TSCYC_1_MS),
            allowed_slave_valid_miss: 3,
            max_nbr_tel_err: 10,
            timing_method: crate::telegram::TimingMethod::MdtThenAtThenUcc,
        }
    }
}

impl RuntimeConfigBuilder {
    #[must_use]
    pub fn cycle_time_ns(mut self, ns: u32) -> Self {
        self.cycle_time_ns = ns;
        self.svc_hs_timeout_cycles = default_timeout_cycles(ns);
        self.svc_busy_timeout_cycles = default_timeout_cycles(ns);
        self
    }

    #[must_use]
    pub fn max_slaves(mut self, n: usize) -> Self {
        self.max_slaves = n;
        self
    }

    #[must_use]
    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    #[must_use]
    pub fn max_hw_svc_container(mut self, n: usize) -> Self {
        self.max_hw_svc_container = n.min(MAX_HW_CONTAINER_CAP);
        self
    }

    #[must_use]
    pub fn svc_hs_timeout_cycles(mut self, n: u32) -> Self {
        self.svc_hs_timeout_cycles = n;
        self
    }

    #[must_use]
    pub fn svc_busy_timeout_cycles(mut self, n: u32) -> Self {
        self.svc_busy_timeout_cycles = n;
        self
    }

    #[must_use]
    pub fn allowed_slave_valid_miss(mut self, n: u32) -> Self {
        self.allowed_slave_valid_miss = n;
        self
    }

    #[must_use]
    pub fn max_nbr_tel_err(mut self, n: u32) -> Self {
        self.max_nbr_tel_err = n;
        self
    }

    #[must_use]
    pub fn timing_method(mut self, m: crate::telegram::TimingMethod) -> Self {
        self.timing_method = m;
        self
    }

    /// Finalize, validating the cycle time against the wire bounds.
    pub fn build(self) -> crate::error::Result<RuntimeConfig> {
        if !is_valid_cycle_time_ns(self.cycle_time_ns) {
            return Err(crate::error::Error::SystemError(format!(
                "invalid cycle time {} ns",
                self.cycle_time_ns
            )));
        }
        Ok(RuntimeConfig {
            cycle_time_ns: self.cycle_time_ns,
            max_slaves: self.max_slaves,
            max_connections: self.max_connections,
            max_hw_svc_container: self.max_hw_svc_container,
            svc_hs_timeout_cycles: self.svc_hs_timeout_cycles,
            svc_busy_timeout_cycles: self.svc_busy_timeout_cycles,
            allowed_slave_valid_miss: self.allowed_slave_valid_miss,
            max_nbr_tel_err: self.max_nbr_tel_err,
            timing_method: self.timing_method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_cycle_times_are_valid() {
        assert!(is_valid_cycle_time_ns(TSCYC_MIN_NS));
        assert!(is_valid_cycle_time_ns(TSCYC_62_5_US_NS));
        assert!(is_valid_cycle_time_ns(TSCYC_125_US_NS));
        assert!(is_valid_cycle_time_ns(TSCYC_250_US_NS));
        assert!(is_valid_cycle_time_ns(TSCYC_1_MS));
        assert!(is_valid_cycle_time_ns(TSCYC_MAX_NS));
    }

    #[test]
    fn non_multiples_above_250us_are_invalid() {
        assert!(!is_valid_cycle_time_ns(300_000));
        assert!(!is_valid_cycle_time_ns(TSCYC_MAX_NS + 250_000));
    }

    #[test]
    fn arbitrary_value_below_250us_is_invalid() {
        assert!(!is_valid_cycle_time_ns(100_000));
    }

    #[test]
    fn builder_rejects_invalid_cycle_time() {
        let res = RuntimeConfig::builder().cycle_time_ns(123_456).build();
        assert!(res.is_err());
    }

    #[test]
    fn builder_defaults_are_sane() {
        let cfg = RuntimeConfig::builder().build().unwrap();
        assert_eq!(cfg.cycle_time_ns, TSCYC_1_MS);
        assert_eq!(cfg.max_hw_svc_container, MAX_HW_CONTAINER_CAP);
        assert_eq!(cfg.svc_busy_timeout_cycles, 1000);
    }

    #[test]
    fn max_hw_svc_container_is_capped() {
        let cfg = RuntimeConfig::builder().max_hw_svc_container(1000).build().unwrap();
        assert_eq!(cfg.max_hw_svc_container, MAX_HW_CONTAINER_CAP);
    }
}
