// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "mock-hal")]

//! Scenario S4 (spec §8): a 5-slave ring progresses through CP0's stable-list
//! detection, CP1's one-to-one mapping, the CP3/CP4 transition-check
//! procedure commands, and then 10,000 clean cyclic-handler cycles.

use sercos3_master::cyclic::{run_cycle, CycleStatus, CyclicState};
use sercos3_master::hal::mock::MockPort;
use sercos3_master::hal::HardwarePort;
use sercos3_master::phase::{set_phase1, Cp0Scan, FuncState, SetPhase0, TransitionCheck};
use sercos3_master::redundancy::Topology;

const PROJECTED: [u16; 5] = [0x10, 0x11, 0x12, 0x13, 0x14];

#[test]
fn s4_phase_progression_on_a_five_slave_ring() {
    // CP0: 100 consecutive identical, port-consistent, duplicate-free scans.
    let mut cp0 = SetPhase0::new();
    let scan = Cp0Scan { port1_addresses: PROJECTED.to_vec(), port2_addresses: PROJECTED.to_vec() };
    let mut outcome = FuncState::NotReady { sleep_hint_ms: 1 };
    for _ in 0..100 {
        outcome = cp0.step(scan.clone());
    }
    assert_eq!(outcome, FuncState::Completed);
    let recognized = cp0.recognized_slaves().unwrap().to_vec();
    assert_eq!(recognized, PROJECTED.to_vec());

    // CP1: one-to-one mapping of the projected list onto the recognized list.
    let indexes = set_phase1(&PROJECTED, &recognized).unwrap();
    assert_eq!(indexes, PROJECTED.to_vec());

    // CP3: every slave acknowledges the transition-check procedure command.
    let mut cp3 = TransitionCheck::new((0..5).collect(), 100);
    for idx in 0..5 {
        cp3.acknowledge(idx);
    }
    assert_eq!(cp3.step(false), FuncState::Completed);

    // CP4: same shape, now fully cyclic.
    let mut cp4 = TransitionCheck::new((0..5).collect(), 100);
    for idx in 0..5 {
        cp4.acknowledge(idx);
    }
    assert_eq!(cp4.step(true), FuncState::Completed);

    // Post-CP4: 10,000 clean cycles all report Ok.
    let mut port = MockPort::new(4096, 0, sercos3_master::config::TSCYC_1_MS);
    let mut state = CyclicState::new(5);
    let mut active = vec![true; 5];
    let s_dev_offsets: Vec<u32> = (0..5).map(|i| i * 2).collect();
    for &offset in &s_dev_offsets {
        // S-DEV bit 8 = slave-valid.
        port.write_ram(sercos3_master::hal::RamWindow::Rx, offset, &(1u16 << 8).to_le_bytes()).unwrap();
    }
    let mut topology = Topology::new();

    for cycle in 0..10_000 {
        let status = run_cycle(
            &mut port,
            &mut state,
            10,
            3,
            &mut active,
            &s_dev_offsets,
            &mut [],
            &mut [],
            &mut topology,
        );
        assert_eq!(status, CycleStatus::Ok, "cycle {cycle} was not Ok");
    }
    assert!(active.iter().all(|a| *a));
}
