// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The Slave Record: one projected network participant, as tracked by the
//! master (spec §3). Holds the identity, activity status, SCP class
//! support, and the per-cycle device-status/device-control mirrors that the
//! Cyclic Handler and SVC engine read and write.

use crate::config::{MAX_SERCOS_ADDRESS, MIN_SERCOS_ADDRESS};
use crate::error::{Error, Result};
use crate::wire::{CDev, SDev};

/// Whether a slave is currently exchanging real-time data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Active,
    Inactive,
    HotPlugInProgress,
}

/// Sercos Communication Profile classes a slave declares support for
/// (spec §3, `SCP` bitmap); only the subset relevant to master behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScpClasses {
    pub basic: bool,
    pub sync: bool,
    pub weak_hold_time: bool,
    pub fixed_cfg: bool,
    pub variable_cfg: bool,
}

/// One projected or recognized slave, indexed by its position in the
/// master's internal slave list (`WrongSlaveIndex` guards out-of-range use).
#[derive(Debug, Clone)]
pub struct Slave {
    sercos_address: u16,
    topology_address: u16,
    activity: ActivityStatus,
    scp: ScpClasses,
    s_dev: SDev,
    c_dev: CDev,
    consecutive_valid_miss: u32,
    /// `Some(i)` if this slave's SVC traffic is driven by hardware container
    /// `i`; `None` means it is served by a software-emulated channel.
    hw_svc_container: Option<usize>,
}

impl Slave {
    /// Create a newly projected slave. `hw_svc_container` must be `Some`
    /// only when `slave_index < max_hw_svc_container` (spec §3 invariant:
    /// slave index below the hardware-container count implies HW-backed SVC).
    pub fn new(sercos_address: u16, topology_address: u16, scp: ScpClasses) -> Result<Self> {
        if !(MIN_SERCOS_ADDRESS..=MAX_SERCOS_ADDRESS).contains(&sercos_address) {
            return Err(Error::IllegalSlaveAddress(sercos_address));
        }
        Ok(Self {
            sercos_address,
            topology_address,
            activity: ActivityStatus::Inactive,
            scp,
            s_dev: SDev::default(),
            c_dev: CDev::default(),
            consecutive_valid_miss: 0,
            hw_svc_container: None,
        })
    }

    #[must_use]
    pub fn sercos_address(&self) -> u16 {
        self.sercos_address
    }

    #[must_use]
    pub fn topology_address(&self) -> u16 {
        self.topology_address
    }

    #[must_use]
    pub fn activity(&self) -> ActivityStatus {
        self.activity
    }

    pub fn set_activity(&mut self, activity: ActivityStatus) {
        self.activity = activity;
    }

    #[must_use]
    pub fn scp(&self) -> ScpClasses {
        self.scp
    }

    #[must_use]
    pub fn s_dev(&self) -> SDev {
        self.s_dev
    }

    pub fn set_s_dev(&mut self, s_dev: SDev) {
        self.s_dev = s_dev;
        if s_dev.slave_valid() {
            self.consecutive_valid_miss = 0;
        } else {
            self.consecutive_valid_miss += 1;
        }
    }

    #[must_use]
    pub fn c_dev(&self) -> CDev {
        self.c_dev
    }

    pub fn set_c_dev(&mut self, c_dev: CDev) {
        self.c_dev = c_dev;
    }

    #[must_use]
    pub fn consecutive_valid_miss(&self) -> u32 {
        self.consecutive_valid_miss
    }

    /// Bind this slave's SVC traffic to a hardware container. Must only be
    /// called for slave indices below `max_hw_svc_container`; callers
    /// enforce that boundary since the slave record itself does not know
    /// its own index.
    pub fn bind_hw_svc_container(&mut self, container_index: usize) {
        self.hw_svc_container = Some(container_index);
    }

    #[must_use]
    pub fn hw_svc_container(&self) -> Option<usize> {
        self.hw_svc_container
    }

    #[must_use]
    pub fn is_hw_backed(&self) -> bool {
        self.hw_svc_container.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_illegal_address() {
        let err = Slave::new(0, 0, ScpClasses::default()).unwrap_err();
        assert_eq!(err, Error::IllegalSlaveAddress(0));
        let err = Slave::new(512, 0, ScpClasses::default()).unwrap_err();
        assert_eq!(err, Error::IllegalSlaveAddress(512));
    }

    #[test]
    fn set_s_dev_tracks_consecutive_valid_miss() {
        let mut s = Slave::new(1, 0, ScpClasses::default()).unwrap();
        s.set_s_dev(SDev(0)); // slave_valid bit clear
        s.set_s_dev(SDev(0));
        assert_eq!(s.consecutive_valid_miss(), 2);
        s.set_s_dev(SDev(1 << 8)); // slave_valid bit set
        assert_eq!(s.consecutive_valid_miss(), 0);
    }

    #[test]
    fn hw_svc_container_binding() {
        let mut s = Slave::new(1, 0, ScpClasses::default()).unwrap();
        assert!(!s.is_hw_backed());
        s.bind_hw_svc_container(2);
        assert_eq!(s.hw_svc_container(), Some(2));
        assert!(s.is_hw_backed());
    }
}
