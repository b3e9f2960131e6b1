// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cyclic Handler (C8): the per-cycle entry point, called once per Sercos
//! cycle from an ISR or a task scheduled by `CYC_CLK` (spec §4.7).

use crate::conn::{Consumer, Producer};
use crate::hal::{HardwarePort, RamWindow, TelegramStatus};
use crate::redundancy::{Topology, TopologyEvent};
use crate::wire::{CCon, SDev};

/// Compact per-cycle status returned to the caller (spec §4.7 step 11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Ok,
    TopologyChange,
    MstError,
    TelErrorOverrun,
}

/// Bookkeeping the Cyclic Handler carries across cycles: successive error
/// counters and per-slave consecutive-miss counters (spec §4.7 steps 4, 6).
#[derive(Debug, Default)]
pub struct CyclicState {
    successive_tel_errors: u32,
    slave_consecutive_miss: Vec<u32>,
}

impl CyclicState {
    #[must_use]
    pub fn new(slave_count: usize) -> Self {
        Self { successive_tel_errors: 0, slave_consecutive_miss: vec![0; slave_count] }
    }
}

/// One master-produced connection's wiring to its producer FSM, for step 8.
/// `tx_offset` is this connection's C-CON field offset in the active Tx
/// buffer, as assigned by the Telegram Layout Engine.
pub struct ProducerConnection<'a> {
    pub producer: &'a mut Producer,
    pub tx_offset: u32,
}

/// One slave-produced connection's wiring to its consumer FSM, for step 7.
/// `s_dev_offset` is the producing slave's S-DEV field offset in the
/// selected Rx buffer (step 1's slave-valid gate); `c_con_offset` is this
/// connection's C-CON field offset in the same buffer.
pub struct ConsumerConnection<'a> {
    pub consumer: &'a mut Consumer,
    pub s_dev_offset: u32,
    pub c_con_offset: u32,
}

/// Read one little-endian 16-bit word out of telegram RAM, defaulting to
/// zero if the window is shorter than expected (matches the hardware's own
/// "reads are infallible" contract, spec §4.1).
fn read_u16_ram(port: &dyn HardwarePort, window: RamWindow, offset: u32) -> u16 {
    let bytes = port.read_ram(window, offset, 2);
    if bytes.len() < 2 {
        0
    } else {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

/// Run one Sercos cycle. Returns the compact status of spec §4.7 step 11.
///
/// `monitoring_off` models step 1's gate: when a phase switch is in
/// progress with monitoring disabled, the handler is a no-op this cycle.
#[allow(clippy::too_many_arguments)]
pub fn run_cycle(
    port: &mut dyn HardwarePort,
    state: &mut CyclicState,
    max_nbr_tel_err: u32,
    allowed_slave_valid_miss: u32,
    slave_active: &mut [bool],
    slave_s_dev_offsets: &[u32],
    producer_connections: &mut [ProducerConnection<'_>],
    consumer_connections: &mut [ConsumerConnection<'_>],
    topology: &mut Topology,
) -> CycleStatus {
    // Step 2: harvest telegram status per port.
    let status_p1 = port.read_telegram_status(0);
    let status_p2 = port.read_telegram_status(1);

    // Step 3: topology check.
    let line1 = port.read_line_status(0);
    let line2 = port.read_line_status(1);
    let event = topology.observe(line1, line2);
    let topology_changed = event != TopologyEvent::Unchanged;

    // Step 4: error accounting.
    let cycle_has_error =
        telegram_status_has_error(status_p1) || telegram_status_has_error(status_p2);
    if cycle_has_error {
        state.successive_tel_errors += 1;
    } else {
        state.successive_tel_errors = 0;
    }
    if state.successive_tel_errors > max_nbr_tel_err {
        return CycleStatus::TelErrorOverrun;
    }

    // Step 5: buffer selection — request the newest Rx buffer per port so
    // steps 6-7 read the buffer the MAC just published, not a stale one.
    port.request_newest_rx_buffer(0);
    port.request_newest_rx_buffer(1);

    // Step 6: slave-valid accounting, read straight from the newest Rx buffer.
    for (idx, offset) in slave_s_dev_offsets.iter().enumerate() {
        if idx >= state.slave_consecutive_miss.len() {
            continue;
        }
        let valid = SDev(read_u16_ram(port, RamWindow::Rx, *offset)).slave_valid();
        if valid {
            state.slave_consecutive_miss[idx] = 0;
        } else {
            state.slave_consecutive_miss[idx] += 1;
            if state.slave_consecutive_miss[idx] > allowed_slave_valid_miss {
                if let Some(active) = slave_active.get_mut(idx) {
                    *active = false;
                }
            }
        }
    }

    // Step 7: run consumer FSMs (strictly before producer writes), reading
    // each connection's producing slave's S-DEV and its own C-CON from Rx.
    for conn in consumer_connections.iter_mut() {
        let valid = SDev(read_u16_ram(port, RamWindow::Rx, conn.s_dev_offset)).slave_valid();
        let observed = CCon(read_u16_ram(port, RamWindow::Rx, conn.c_con_offset));
        conn.consumer.process_cycle(valid, observed);
    }

    // Step 8: advance producer FSM outputs and publish the C-CON word into
    // the active Tx buffer (strictly after consumer updates).
    for conn in producer_connections.iter_mut() {
        conn.producer.tick();
        let word = conn.producer.c_con().0;
        let _ = port.write_ram(RamWindow::Tx, conn.tx_offset, &word.to_le_bytes());
    }

    // Step 9 (software SVC) is driven by the caller via `crate::svc`; the
    // handler only guarantees ordering (after producer writes is fine since
    // SVC fields are independent of RT connection data).

    // Step 10: acknowledge Tx buffer.
    port.acknowledge_tx_buffer();

    // Step 11.
    if topology_changed {
        CycleStatus::TopologyChange
    } else if telegram_status_has_mst_miss(status_p1) || telegram_status_has_mst_miss(status_p2) {
        CycleStatus::MstError
    } else {
        CycleStatus::Ok
    }
}

fn telegram_status_has_error(status: TelegramStatus) -> bool {
    status.window_error || status.mst_miss || status.mst_double_miss || status.at0_miss
}

fn telegram_status_has_mst_miss(status: TelegramStatus) -> bool {
    status.mst_miss
}
