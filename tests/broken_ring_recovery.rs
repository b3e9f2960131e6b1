// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "mock-hal")]

//! Scenario S5 (spec §8): in CP4 with Ring topology, a link drop is observed
//! on one port; the network falls back to `BrokenRing` without pushing any
//! connection into `Error`, and a subsequent physical repair lets
//! `recover_ring_topology` bring the network back to `Ring` after a fresh
//! ring-delay measurement.

use sercos3_master::config::{RuntimeConfig, RING_DELAY_SAMPLES, TSCYC_1_MS};
use sercos3_master::conn::ConsumerState;
use sercos3_master::hal::mock::MockPort;
use sercos3_master::instance::Instance;
use sercos3_master::redundancy::TopologyState;
use sercos3_master::slave::{ScpClasses, Slave};
use sercos3_master::wire::CCon;

#[test]
fn s5_broken_ring_recovery() {
    let port = Box::new(MockPort::new(4096, 0, TSCYC_1_MS));
    let config = RuntimeConfig::builder().build().unwrap();
    let mut inst = Instance::new(port, config, &[]).unwrap();
    inst.add_slave(Slave::new(3, 3, ScpClasses::default()).unwrap()).unwrap();
    inst.add_slave(Slave::new(4, 4, ScpClasses::default()).unwrap()).unwrap();

    for consumer in inst.consumers_mut() {
        consumer.enter_waiting(CCon::default());
        consumer.begin_consuming();
    }

    assert_eq!(inst.topology().state(), TopologyState::Ring);

    // Link drop on port 2 between slaves 3 and 4.
    let event = inst.topology_mut().observe(true, false);
    assert_eq!(event, sercos3_master::redundancy::TopologyEvent::Changed(TopologyState::BrokenRing));
    assert_eq!(inst.topology().state(), TopologyState::BrokenRing);

    // Connections are untouched by a topology change; keep feeding them
    // matching C-CON to prove no Error is forced by the ring break.
    for consumer in inst.consumers_mut() {
        consumer.process_cycle(true, CCon::default().with_new_data(true));
        assert_eq!(consumer.state(), ConsumerState::Consuming);
    }

    // Physical repair: line comes back, recovery is attempted.
    let event = inst.topology_mut().observe(true, true);
    assert_eq!(event, sercos3_master::redundancy::TopologyEvent::Unchanged);
    assert_eq!(inst.topology().state(), TopologyState::BrokenRing);

    inst.topology_mut().recover_ring_topology().unwrap();
    assert_eq!(inst.topology().state(), TopologyState::Ring);
    assert!(!inst.topology().ring_delay_measurement_complete());

    for _ in 0..RING_DELAY_SAMPLES {
        inst.topology_mut().record_ring_delay_sample(1, 500);
        inst.topology_mut().record_ring_delay_sample(2, 520);
    }
    assert!(inst.topology().ring_delay_measurement_complete());
    assert!(inst.topology().compute_tsref().is_ok());

    for consumer in inst.consumers_mut() {
        assert_eq!(consumer.state(), ConsumerState::Consuming);
    }
}
