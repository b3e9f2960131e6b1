// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Instance`: the single root entity per Sercos network (spec §3/§9).
//! Ties together the hardware port, the current phase, the slave list, the
//! connection FSMs, and redundancy/topology tracking so callers hold one
//! value instead of a scattering of global state.

use crate::config::RuntimeConfig;
use crate::conn::{Consumer, Producer};
use crate::cyclic::CyclicState;
use crate::error::{Error, Result};
use crate::hal::HardwarePort;
use crate::phase::Phase;
use crate::redundancy::Topology;
use crate::slave::Slave;
use crate::svc::{HwSvcChannel, SwSvcChannel};

/// Either a hardware-backed or software-emulated SVC channel for one slave.
#[derive(Debug)]
pub enum SlaveSvcChannel {
    Hardware(HwSvcChannel),
    Software(SwSvcChannel),
}

impl SlaveSvcChannel {
    #[must_use]
    pub fn as_channel_mut(&mut self) -> &mut dyn crate::svc::SvcChannel {
        match self {
            SlaveSvcChannel::Hardware(ch) => ch,
            SlaveSvcChannel::Software(ch) => ch,
        }
    }
}

/// The top-level master instance: one per Sercos network under this core's
/// control. Owns the hardware port and all per-slave/per-connection state.
pub struct Instance {
    config: RuntimeConfig,
    port: Box<dyn HardwarePort>,
    phase: Phase,
    slaves: Vec<Slave>,
    svc_channels: Vec<SlaveSvcChannel>,
    producers: Vec<Producer>,
    consumers: Vec<Consumer>,
    topology: Topology,
    cyclic_state: CyclicState,
}

impl Instance {
    /// Create a new instance bound to `port`, rejecting known-bad hardware
    /// versions up front (spec §4.1).
    pub fn new(port: Box<dyn HardwarePort>, config: RuntimeConfig, blacklist: &[&str]) -> Result<Self> {
        let version = port.hardware_version();
        if crate::hal::is_blacklisted_version(&version, blacklist) {
            return Err(Error::HardwareVersionBlacklisted(version));
        }
        Ok(Self {
            cyclic_state: CyclicState::new(config.max_slaves),
            config,
            port,
            phase: Phase::Nrt,
            slaves: Vec::new(),
            svc_channels: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            topology: Topology::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn port(&self) -> &dyn HardwarePort {
        self.port.as_ref()
    }

    #[must_use]
    pub fn port_mut(&mut self) -> &mut dyn HardwarePort {
        self.port.as_mut()
    }

    #[must_use]
    pub fn slaves(&self) -> &[Slave] {
        &self.slaves
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[must_use]
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Project a new slave. Binds it to a hardware SVC container when its
    /// index falls below `max_hw_svc_container`, else a software-emulated
    /// one (spec §3 invariant).
    pub fn add_slave(&mut self, mut slave: Slave) -> Result<usize> {
        if self.slaves.len() >= self.config.max_slaves {
            return Err(Error::SystemError("slave list is full".into()));
        }
        let index = self.slaves.len();
        let channel = if index < self.config.max_hw_svc_container {
            slave.bind_hw_svc_container(index);
            SlaveSvcChannel::Hardware(HwSvcChannel::new(index))
        } else {
            SlaveSvcChannel::Software(SwSvcChannel::new(
                self.config.svc_hs_timeout_cycles,
                self.config.svc_busy_timeout_cycles,
            ))
        };
        self.slaves.push(slave);
        self.svc_channels.push(channel);
        self.producers.push(Producer::new());
        self.consumers.push(Consumer::new(crate::conn::CheckMode::NewData, self.config.allowed_slave_valid_miss));
        Ok(index)
    }

    /// Borrow a slave's SVC channel by index, for use with
    /// [`crate::svc_macro::MacroOp::step`].
    pub fn svc_channel_mut(&mut self, slave_index: usize) -> Result<&mut SlaveSvcChannel> {
        self.svc_channels.get_mut(slave_index).ok_or(Error::WrongSlaveIndex(slave_index))
    }

    /// Force-set the current phase, as confirmed by [`crate::phase`] FSMs.
    /// Writes the phase register so the wire and the in-memory state agree.
    pub fn set_phase(&mut self, phase: Phase) -> Result<()> {
        self.port.write_phase_register(phase.as_wire_value(), false)?;
        self.phase = phase;
        Ok(())
    }

    #[must_use]
    pub fn cyclic_state_mut(&mut self) -> &mut CyclicState {
        &mut self.cyclic_state
    }

    #[must_use]
    pub fn producers_mut(&mut self) -> &mut [Producer] {
        &mut self.producers
    }

    #[must_use]
    pub fn consumers_mut(&mut self) -> &mut [Consumer] {
        &mut self.consumers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockPort;
    use crate::slave::ScpClasses;

    fn instance() -> Instance {
        let port = Box::new(MockPort::new(4096, 2, crate::config::TSCYC_1_MS));
        let config = RuntimeConfig::builder().max_hw_svc_container(2).build().unwrap();
        Instance::new(port, config, &["broken-1.0"]).unwrap()
    }

    #[test]
    fn new_rejects_blacklisted_hardware_version() {
        let port = Box::new(MockPort::new(64, 0, crate::config::TSCYC_1_MS));
        let config = RuntimeConfig::builder().build().unwrap();
        let err = Instance::new(port, config, &["mock-1.0"]).unwrap_err();
        assert_eq!(err, Error::HardwareVersionBlacklisted("mock-1.0".into()));
    }

    #[test]
    fn first_two_slaves_are_hardware_backed_the_rest_software() {
        let mut inst = instance();
        for addr in [1u16, 2, 3] {
            let slave = Slave::new(addr, addr, ScpClasses::default()).unwrap();
            inst.add_slave(slave).unwrap();
        }
        assert!(matches!(inst.svc_channels[0], SlaveSvcChannel::Hardware(_)));
        assert!(matches!(inst.svc_channels[1], SlaveSvcChannel::Hardware(_)));
        assert!(matches!(inst.svc_channels[2], SlaveSvcChannel::Software(_)));
    }

    #[test]
    fn set_phase_updates_both_memory_and_wire() {
        let mut inst = instance();
        inst.set_phase(Phase::Cp2).unwrap();
        assert_eq!(inst.phase(), Phase::Cp2);
        assert_eq!(inst.port().read_phase_register(), (2, false));
    }
}
