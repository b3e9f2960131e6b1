// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "mock-hal")]

//! Scenario S1 (spec §8) and the adjacent boundary behavior: an SVC read
//! round-trips through both the hardware-backed and the software-emulated
//! channel, at N_HW and N_HW+1 slaves respectively.

use sercos3_master::config::RuntimeConfig;
use sercos3_master::hal::mock::MockPort;
use sercos3_master::instance::{Instance, SlaveSvcChannel};
use sercos3_master::slave::{ScpClasses, Slave};
use sercos3_master::svc::{AtomicRequest, DataBlockElement, Direction, Priority, SvcChannel};

fn instance_with_slaves(max_hw_svc_container: usize, slave_count: u16) -> Instance {
    let port = Box::new(MockPort::new(4096, max_hw_svc_container, sercos3_master::config::TSCYC_1_MS));
    let config = RuntimeConfig::builder().max_hw_svc_container(max_hw_svc_container).build().unwrap();
    let mut inst = Instance::new(port, config, &[]).unwrap();
    for addr in 1..=slave_count {
        inst.add_slave(Slave::new(addr, addr, ScpClasses::default()).unwrap()).unwrap();
    }
    inst
}

/// Drive one pre-sized read to completion, feeding a "valid" status word and
/// the configured payload bytes every cycle, within a bounded cycle budget.
fn read_to_completion(channel: &mut dyn SvcChannel, idn: u32, payload: [u8; 4], max_cycles: usize) -> Vec<u8> {
    let req = AtomicRequest::new(idn, DataBlockElement::OperationData, Direction::Read, Priority::Low, vec![0u8; 4]);
    channel.start(req).unwrap();

    const STATUS_VALID_BIT: u16 = 1 << 3;
    for _ in 0..max_cycles {
        if channel.advance(channel.mdt_control_word(), STATUS_VALID_BIT, payload).unwrap() {
            return channel.take_result().unwrap().unwrap();
        }
    }
    panic!("read did not complete within {max_cycles} cycles");
}

#[test]
fn s1_hardware_backed_svc_read_of_cycle_time() {
    let mut inst = instance_with_slaves(1, 1);
    // S-0-1002 (cycle time), 1 ms = 1_000_000 ns, little-endian.
    let payload = 1_000_000u32.to_le_bytes();
    let SlaveSvcChannel::Hardware(ch) = inst.svc_channel_mut(0).unwrap() else {
        panic!("slave 0 should be hardware-backed when max_hw_svc_container >= 1");
    };
    let result = read_to_completion(ch, 0x03EA, payload, 4);
    assert_eq!(u32::from_le_bytes(result.try_into().unwrap()), 1_000_000);
}

#[test]
fn boundary_n_hw_and_n_hw_plus_one_both_round_trip() {
    // N_HW = 2: slave 0 and 1 hardware-backed, slave 2 software-emulated.
    let mut inst = instance_with_slaves(2, 3);
    let payload = [0xEF, 0xBE, 0xAD, 0xDE];

    for idx in [0usize, 1] {
        let SlaveSvcChannel::Hardware(ch) = inst.svc_channel_mut(idx).unwrap() else {
            panic!("slave {idx} should be hardware-backed");
        };
        assert_eq!(read_to_completion(ch, 0x03EA, payload, 4), payload.to_vec());
    }

    let SlaveSvcChannel::Software(ch) = inst.svc_channel_mut(2).unwrap() else {
        panic!("slave 2 should be software-emulated");
    };
    assert_eq!(read_to_completion(ch, 0x03EA, payload, 8), payload.to_vec());
}
