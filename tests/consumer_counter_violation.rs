// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "mock-hal")]

//! Scenario S3 (spec §8): a producer sends C-CON counter sequence
//! {1, 2, 3, 3, 4, 5} with allowed-data-losses = 0. The consumer FSM must
//! transition Consuming -> Error at the repeated `3`, with exactly one
//! absolute and one consecutive error recorded at the point of transition.

use sercos3_master::conn::{CheckMode, ConsumerState};
use sercos3_master::config::RuntimeConfig;
use sercos3_master::hal::mock::MockPort;
use sercos3_master::instance::Instance;
use sercos3_master::slave::{ScpClasses, Slave};
use sercos3_master::wire::CCon;

#[test]
fn s3_counter_mode_transitions_to_error_on_repeated_counter() {
    let port = Box::new(MockPort::new(4096, 1, sercos3_master::config::TSCYC_1_MS));
    let config = RuntimeConfig::builder().build().unwrap();
    let mut inst = Instance::new(port, config, &[]).unwrap();
    inst.add_slave(Slave::new(1, 1, ScpClasses::default()).unwrap()).unwrap();

    let consumer = &mut inst.consumers_mut()[0];
    consumer.set_check_mode(CheckMode::Counter);
    consumer.enter_waiting(CCon::default().with_counter(0).with_new_data(false));
    consumer.begin_consuming();

    let mut cc = CCon::default();
    let mut new_data = false;
    for counter in [1u8, 2, 3] {
        new_data = !new_data;
        cc = cc.with_counter(counter).with_new_data(new_data);
        consumer.process_cycle(true, cc);
        assert_eq!(consumer.state(), ConsumerState::Consuming);
    }

    // Repeated counter value 3, toggle not advanced: a dropped/duplicated telegram.
    consumer.process_cycle(true, cc);

    assert_eq!(consumer.state(), ConsumerState::Error);
    assert_eq!(consumer.absolute_errors(), 1);
    assert_eq!(consumer.consecutive_errors(), 1);
}
