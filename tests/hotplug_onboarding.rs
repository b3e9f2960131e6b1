// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "mock-hal")]

//! Scenario S6 (spec §8): in CP4, one slave at Sercos address 0x20 is
//! physically attached to the free end of port 2 and onboarded through the
//! HP0/HP1/HP2 sequence, while pre-existing consumer connections keep
//! consuming throughout.

use std::collections::HashSet;

use sercos3_master::config::{RuntimeConfig, TSCYC_1_MS};
use sercos3_master::conn::ConsumerState;
use sercos3_master::hal::mock::MockPort;
use sercos3_master::instance::Instance;
use sercos3_master::phase::FuncState;
use sercos3_master::redundancy::HotPlugSession;
use sercos3_master::slave::{ScpClasses, Slave};
use sercos3_master::wire::CCon;

#[test]
fn s6_hotplug_onboarding_of_one_slave() {
    let port = Box::new(MockPort::new(4096, 2, TSCYC_1_MS));
    let config = RuntimeConfig::builder().max_hw_svc_container(2).build().unwrap();
    let mut inst = Instance::new(port, config, &[]).unwrap();
    inst.add_slave(Slave::new(0x10, 1, ScpClasses::default()).unwrap()).unwrap();
    inst.add_slave(Slave::new(0x11, 2, ScpClasses::default()).unwrap()).unwrap();

    for consumer in inst.consumers_mut() {
        consumer.enter_waiting(CCon::default());
        consumer.begin_consuming();
    }

    let assert_preexisting_still_consuming = |inst: &mut Instance| {
        for consumer in inst.consumers_mut() {
            consumer.process_cycle(true, CCon::default().with_new_data(true));
            assert_eq!(consumer.state(), ConsumerState::Consuming);
        }
    };

    let projected: HashSet<u16> = [0x10, 0x11, 0x20].into_iter().collect();
    let already_recognized: HashSet<u16> = [0x10, 0x11].into_iter().collect();
    let mut hp = HotPlugSession::new(vec![0x20], projected, already_recognized);

    // HP0: broadcast parameters, acknowledged within the retry budget.
    for cycle in 0..10 {
        let state = hp.step_hp0(cycle == 2);
        assert_preexisting_still_consuming(&mut inst);
        assert!(matches!(state, FuncState::NotReady { .. }));
        if hp.phase() == sercos3_master::redundancy::HotPlugPhase::Hp1 {
            break;
        }
    }
    assert_eq!(hp.phase(), sercos3_master::redundancy::HotPlugPhase::Hp1, "HP0 should acknowledge within 10 broadcast cycles");

    // HP1: the new address is observed on the line within the scan timeout.
    let state = hp.step_hp1(&[0x20]);
    assert_eq!(state, FuncState::NotReady { sleep_hint_ms: 0 });
    assert_eq!(hp.found_slaves(), &[0x20]);
    assert_preexisting_still_consuming(&mut inst);

    // HP2: migrate the new slave's SVC into normal CP4 traffic.
    let state = hp.step_hp2(true);
    assert_eq!(state, FuncState::Completed);
    assert_preexisting_still_consuming(&mut inst);

    // Project the newly onboarded slave; it becomes active in the roster.
    let new_index = inst.add_slave(Slave::new(0x20, 3, ScpClasses::default()).unwrap()).unwrap();
    assert_eq!(new_index, 2);
    assert_eq!(inst.slaves().len(), 3);

    for consumer in inst.consumers_mut() {
        assert_eq!(consumer.state(), ConsumerState::Consuming);
    }
}
