// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The three-phase HP0/HP1/HP2 hot-plug sequence (spec §4.8): onboard a new
//! slave (or a connected group) at the end of a line.

use std::collections::HashSet;

use crate::config::{HOTPLUG_SLAVES_PER_DEVICE, HP0_BROADCAST_RETRIES, HP0_SCAN_TIMEOUT_CYCLES};
use crate::error::{Error, Result};
use crate::phase::FuncState;

/// Which hot-plug phase a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotPlugPhase {
    /// Broadcasting HP0 parameters so new slaves can see the network.
    Hp0,
    /// Scanning for and confirming new slave addresses.
    Hp1,
    /// Assimilating the new slave(s) into normal CP4 SVC traffic.
    Hp2,
    Done,
}

/// One in-flight hot-plug operation (`HotPlug` + `TransHP2Para`, spec §4.8).
#[derive(Debug)]
pub struct HotPlugSession {
    requested_addrs: Vec<u16>,
    projected: HashSet<u16>,
    already_recognized: HashSet<u16>,
    phase: HotPlugPhase,
    broadcast_attempts: u32,
    scan_cycles: u32,
    found: Vec<u16>,
    canceled: bool,
}

impl HotPlugSession {
    #[must_use]
    pub fn new(requested_addrs: Vec<u16>, projected: HashSet<u16>, already_recognized: HashSet<u16>) -> Self {
        Self {
            requested_addrs,
            projected,
            already_recognized,
            phase: HotPlugPhase::Hp0,
            broadcast_attempts: 0,
            scan_cycles: 0,
            found: Vec::new(),
            canceled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    #[must_use]
    pub fn phase(&self) -> HotPlugPhase {
        self.phase
    }

    /// Validate one requested address against the invariants of spec §4.8:
    /// not already recognized, must be projected, no duplicates, legal range.
    fn validate_address(&self, addr: u16) -> Result<()> {
        use crate::config::{MAX_SERCOS_ADDRESS, MIN_SERCOS_ADDRESS};
        if !(MIN_SERCOS_ADDRESS..=MAX_SERCOS_ADDRESS).contains(&addr) {
            return Err(Error::HotPlugIllegalAddress(addr));
        }
        if self.already_recognized.contains(&addr) {
            return Err(Error::HotPlugAlreadyRecognized(addr));
        }
        if !self.projected.contains(&addr) {
            return Err(Error::HotPlugNotProjected(addr));
        }
        Ok(())
    }

    /// Step HP0: broadcast parameters, retry up to `HP0_BROADCAST_RETRIES`
    /// times; `ack` reports whether this cycle's broadcast was acknowledged.
    pub fn step_hp0(&mut self, ack: bool) -> FuncState {
        if self.canceled {
            return FuncState::Err(Error::RequestCanceled);
        }
        if ack {
            self.phase = HotPlugPhase::Hp1;
            return FuncState::NotReady { sleep_hint_ms: 0 };
        }
        self.broadcast_attempts += 1;
        if self.broadcast_attempts >= HP0_BROADCAST_RETRIES {
            return FuncState::Err(Error::HotPlugPhase0Timeout);
        }
        FuncState::NotReady { sleep_hint_ms: 1 }
    }

    /// Step HP1: scan for and confirm the requested addresses.
    /// `scanned` reports the addresses observed on the line this cycle.
    pub fn step_hp1(&mut self, scanned: &[u16]) -> FuncState {
        if self.canceled {
            return FuncState::Err(Error::RequestCanceled);
        }
        self.scan_cycles += 1;

        let mut seen = HashSet::new();
        for addr in scanned {
            if !seen.insert(*addr) {
                return FuncState::Err(Error::HotPlugDoubleAddress(*addr));
            }
        }

        for addr in &self.requested_addrs {
            if scanned.contains(addr) {
                if let Err(e) = self.validate_address(*addr) {
                    return FuncState::Err(e);
                }
                if !self.found.contains(addr) {
                    self.found.push(*addr);
                }
            }
        }

        if self.found.len() >= self.requested_addrs.len() {
            self.phase = HotPlugPhase::Hp2;
            return FuncState::NotReady { sleep_hint_ms: 0 };
        }
        if self.scan_cycles >= HP0_SCAN_TIMEOUT_CYCLES {
            return FuncState::Err(Error::HotPlugSlaveScanTimeout);
        }
        FuncState::NotReady { sleep_hint_ms: 1 }
    }

    /// Step HP2 (`TransHP2Para`): assimilate found slaves into normal SVC.
    pub fn step_hp2(&mut self, svc_migrated: bool) -> FuncState {
        if self.canceled {
            return FuncState::Err(Error::RequestCanceled);
        }
        if svc_migrated {
            self.phase = HotPlugPhase::Done;
            FuncState::Completed
        } else {
            FuncState::NotReady { sleep_hint_ms: 1 }
        }
    }

    #[must_use]
    pub fn found_slaves(&self) -> &[u16] {
        &self.found
    }
}

/// Maximum hot-pluggable slaves per HP device, exposed for validation
/// against a Hot-Plug field's 4-bit slave index (spec §8 boundary behavior).
#[must_use]
pub fn max_hotplug_slaves_per_device() -> usize {
    HOTPLUG_SLAVES_PER_DEVICE
}
