// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `MockPort`: a software double for [`super::HardwarePort`], used by this
//! crate's own tests and available to downstream consumers (behind the
//! `mock-hal` feature) who want to exercise phase progression or SVC
//! traffic without real hardware.

use std::collections::HashMap;

use super::{
    DataFlowMode, Descriptor, HardwarePort, InterruptMask, RamWindow, SercosTime,
    SvcContainerRegs, TelegramStatus, TimingEvent, WatchdogTimeoutMode,
};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MockPort {
    tx_ram: Vec<u8>,
    rx_ram: Vec<u8>,
    shorts: HashMap<u32, u16>,
    longs: HashMap<u32, u32>,
    descriptors: HashMap<&'static str, Vec<Descriptor>>,
    timing_events: HashMap<usize, TimingEvent>,
    interrupts: InterruptMask,
    phase: u8,
    phase_switch: bool,
    data_flow_mode: Option<DataFlowMode>,
    line_status: [bool; 2],
    link_status: [bool; 2],
    telegram_status: [TelegramStatus; 2],
    current_rx_buffer: [u8; 2],
    current_tx_buffer: u8,
    svc_containers: Vec<SvcContainerRegs>,
    tsref: u64,
    sercos_time: SercosTime,
    watchdog_triggered: bool,
    hardware_version: String,
    min_event_time_ns: u32,
    max_event_time_ns: u32,
}

impl MockPort {
    #[must_use]
    pub fn new(ram_size: usize, svc_containers: usize, cycle_time_ns: u32) -> Self {
        Self {
            tx_ram: vec![0u8; ram_size],
            rx_ram: vec![0u8; ram_size],
            svc_containers: vec![
                SvcContainerRegs { control: 0, status: 0, write_buffer: [0; 16], read_buffer: [0; 16] };
                svc_containers
            ],
            line_status: [true, true],
            link_status: [true, true],
            hardware_version: "mock-1.0".to_string(),
            min_event_time_ns: 0,
            max_event_time_ns: cycle_time_ns,
            ..Default::default()
        }
    }

    /// Test helper: directly set a port's link/line status.
    pub fn set_link_status(&mut self, port: usize, up: bool) {
        self.link_status[port] = up;
    }

    pub fn set_line_status(&mut self, port: usize, up: bool) {
        self.line_status[port] = up;
    }

    /// Test helper: directly inject a port's telegram-status bits.
    pub fn inject_telegram_status(&mut self, port: usize, status: TelegramStatus) {
        self.telegram_status[port] = status;
    }
}

impl HardwarePort for MockPort {
    fn read_short(&self, offset: u32) -> u16 {
        *self.shorts.get(&offset).unwrap_or(&0)
    }

    fn write_short(&mut self, offset: u32, value: u16) -> Result<()> {
        self.shorts.insert(offset, value);
        Ok(())
    }

    fn read_long(&self, offset: u32) -> u32 {
        *self.longs.get(&offset).unwrap_or(&0)
    }

    fn write_long(&mut self, offset: u32, value: u32) -> Result<()> {
        self.longs.insert(offset, value);
        Ok(())
    }

    fn read_ram(&self, window: RamWindow, offset: u32, len: usize) -> Vec<u8> {
        let ram = match window {
            RamWindow::Tx => &self.tx_ram,
            RamWindow::Rx => &self.rx_ram,
        };
        let start = offset as usize;
        ram.get(start..start + len).map(<[u8]>::to_vec).unwrap_or_default()
    }

    fn write_ram(&mut self, window: RamWindow, offset: u32, data: &[u8]) -> Result<()> {
        let ram = match window {
            RamWindow::Tx => &mut self.tx_ram,
            RamWindow::Rx => &mut self.rx_ram,
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > ram.len() {
            return Err(Error::SystemError("RAM write out of bounds".into()));
        }
        ram[start..end].copy_from_slice(data);
        Ok(())
    }

    fn program_descriptors(&mut self, direction: RamWindow, table: &[Descriptor]) -> Result<()> {
        let key = match direction {
            RamWindow::Tx => "tx",
            RamWindow::Rx => "rx",
        };
        if table.len() > 8 {
            return Err(Error::SystemError("more than 8 descriptor entries".into()));
        }
        self.descriptors.insert(key, table.to_vec());
        Ok(())
    }

    fn program_timing_event(&mut self, index: usize, event: TimingEvent) -> Result<()> {
        if event.time_ns_in_cycle < self.min_event_time_ns || event.time_ns_in_cycle > self.max_event_time_ns {
            return Err(Error::EventTimeOutOfBounds {
                requested_ns: event.time_ns_in_cycle,
                min_ns: self.min_event_time_ns,
                max_ns: self.max_event_time_ns,
            });
        }
        self.timing_events.insert(index, event);
        Ok(())
    }

    fn set_interrupt_mask(&mut self, mask: InterruptMask) {
        self.interrupts = mask;
    }

    fn poll_and_clear_interrupts(&mut self) -> InterruptMask {
        std::mem::take(&mut self.interrupts)
    }

    fn write_phase_register(&mut self, phase: u8, phase_switch: bool) -> Result<()> {
        if phase > 4 {
            return Err(Error::SystemError(format!("invalid phase value {phase}")));
        }
        self.phase = phase;
        self.phase_switch = phase_switch;
        Ok(())
    }

    fn read_phase_register(&self) -> (u8, bool) {
        (self.phase, self.phase_switch)
    }

    fn set_data_flow_mode(&mut self, mode: DataFlowMode) -> Result<()> {
        self.data_flow_mode = Some(mode);
        Ok(())
    }

    fn read_line_status(&self, port: usize) -> bool {
        self.line_status.get(port).copied().unwrap_or(false)
    }

    fn read_link_status(&self, port: usize) -> bool {
        self.link_status.get(port).copied().unwrap_or(false)
    }

    fn read_telegram_status(&self, port: usize) -> TelegramStatus {
        self.telegram_status.get(port).copied().unwrap_or_default()
    }

    fn clear_telegram_status(&mut self, port: usize, bits: TelegramStatus) {
        if let Some(slot) = self.telegram_status.get_mut(port) {
            if bits.window_error {
                slot.window_error = false;
            }
            if bits.mst_miss {
                slot.mst_miss = false;
            }
            if bits.mst_double_miss {
                slot.mst_double_miss = false;
            }
            if bits.at0_miss {
                slot.at0_miss = false;
            }
        }
    }

    fn current_rx_buffer(&self, port: usize) -> u8 {
        self.current_rx_buffer.get(port).copied().unwrap_or(0)
    }

    fn request_newest_rx_buffer(&mut self, port: usize) -> u8 {
        self.current_rx_buffer(port)
    }

    fn rx_buffer_valid_bitmap(&self, _port: usize) -> u8 {
        0b1
    }

    fn current_tx_buffer(&self) -> u8 {
        self.current_tx_buffer
    }

    fn acknowledge_tx_buffer(&mut self) {
        self.current_tx_buffer = self.current_tx_buffer.wrapping_add(1);
    }

    fn read_svc_container(&self, container_index: usize) -> SvcContainerRegs {
        self.svc_containers[container_index]
    }

    fn write_svc_container_control(&mut self, container_index: usize, control: u16, write_buffer: &[u16]) -> Result<()> {
        let Some(container) = self.svc_containers.get_mut(container_index) else {
            return Err(Error::SystemError(format!("no such SVC container {container_index}")));
        };
        container.control = control;
        let n = write_buffer.len().min(16);
        container.write_buffer[..n].copy_from_slice(&write_buffer[..n]);
        Ok(())
    }

    fn read_tsref(&self) -> u64 {
        self.tsref
    }

    fn write_sercos_time(&mut self, time: SercosTime, _external_sync: bool) -> Result<()> {
        self.sercos_time = time;
        Ok(())
    }

    fn read_sercos_time(&self) -> SercosTime {
        self.sercos_time
    }

    fn arm_watchdog(&mut self, _timeout_ns: u32, _mode: WatchdogTimeoutMode) -> Result<()> {
        self.watchdog_triggered = false;
        Ok(())
    }

    fn watchdog_triggered(&self) -> bool {
        self.watchdog_triggered
    }

    fn hardware_version(&self) -> String {
        self.hardware_version.clone()
    }
}
