// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timing/Event Programming (C10): timer events, `CYC_CLK`, `DIV_CLK`, and
//! Sercos-time insertion (spec §4.9).

use crate::error::{Error, Result};
use crate::hal::{HardwarePort, SercosTime, TimingEvent, TimingEventKind};

/// Identifies which timer/event line `EventControl` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventId {
    Timer0,
    Timer1,
    Timer2,
    Timer3,
    ConClkSet,
    ConClkReset,
    TxBufReqA,
    RxBufReqA,
}

/// Bounds on event time within a cycle, derived from `tScyc` (spec §4.9).
#[must_use]
pub fn event_time_bounds(cycle_time_ns: u32) -> (u32, u32) {
    (0, cycle_time_ns)
}

/// Program or disable one timing event, bounds-checked against `[0, tScyc]`.
pub fn event_control(
    port: &mut dyn HardwarePort,
    id: EventId,
    activate: bool,
    t_ns_in_cycle: u32,
    cycle_time_ns: u32,
) -> Result<()> {
    let (min_ns, max_ns) = event_time_bounds(cycle_time_ns);
    if activate && (t_ns_in_cycle < min_ns || t_ns_in_cycle > max_ns) {
        return Err(Error::EventTimeOutOfBounds { requested_ns: t_ns_in_cycle, min_ns, max_ns });
    }
    if !activate {
        return Ok(());
    }
    let kind = match id {
        EventId::Timer0 | EventId::Timer1 | EventId::Timer2 | EventId::Timer3 => {
            TimingEventKind::GenericInterrupt
        }
        EventId::ConClkSet => TimingEventKind::SetCycClk,
        EventId::ConClkReset => TimingEventKind::ClearCycClk,
        EventId::TxBufReqA | EventId::RxBufReqA => TimingEventKind::BufferRequest,
    };
    let index = event_id_index(id);
    port.program_timing_event(
        index,
        TimingEvent { time_ns_in_cycle: t_ns_in_cycle, sub_cycle_counter_select: 0, sub_cycle_counter_value: 0, kind },
    )
}

fn event_id_index(id: EventId) -> usize {
    match id {
        EventId::Timer0 => 0,
        EventId::Timer1 => 1,
        EventId::Timer2 => 2,
        EventId::Timer3 => 3,
        EventId::ConClkSet => 4,
        EventId::ConClkReset => 5,
        EventId::TxBufReqA => 6,
        EventId::RxBufReqA => 7,
    }
}

/// Polarity of a generated clock signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Configure the cycle clock output (`CYC_CLK`).
pub fn prepare_cyc_clk(
    port: &mut dyn HardwarePort,
    activate: bool,
    enable_input: bool,
    polarity: Polarity,
    start_delay_ns: u32,
    cycle_time_ns: u32,
) -> Result<()> {
    let _ = (enable_input, polarity);
    event_control(port, EventId::ConClkSet, activate, start_delay_ns, cycle_time_ns)
}

/// Same as [`prepare_cyc_clk`] but `start_delay` is given as a fraction of
/// the cycle (`0.0..=1.0`) rather than an absolute nanosecond offset.
pub fn prepare_cyc_clk_fractional(
    port: &mut dyn HardwarePort,
    activate: bool,
    enable_input: bool,
    polarity: Polarity,
    start_delay_fraction: f32,
    cycle_time_ns: u32,
) -> Result<()> {
    let delay_ns = (start_delay_fraction.clamp(0.0, 1.0) * cycle_time_ns as f32) as u32;
    prepare_cyc_clk(port, activate, enable_input, polarity, delay_ns, cycle_time_ns)
}

/// Divided-clock output mode for downstream logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivClkConfig {
    pub activate: bool,
    pub mode: u8,
    pub polarity: Polarity,
    pub disable: bool,
    pub pulses: u16,
    pub distance_ns: u32,
    pub delay_ns: u32,
}

/// Emit a divided clock (`DIV_CLK`) for downstream logic.
pub fn config_div_clk(port: &mut dyn HardwarePort, config: DivClkConfig, cycle_time_ns: u32) -> Result<()> {
    if config.disable {
        return event_control(port, EventId::ConClkReset, false, 0, cycle_time_ns);
    }
    event_control(port, EventId::ConClkReset, config.activate, config.delay_ns, cycle_time_ns)
}

/// Commit a new Sercos time, to be assumed immediately or on the next
/// external sync pulse.
pub fn new_sercos_time(
    port: &mut dyn HardwarePort,
    seconds: u32,
    nanos: u32,
    external_sync: bool,
) -> Result<()> {
    port.write_sercos_time(SercosTime { seconds, nanos }, external_sync)
}
