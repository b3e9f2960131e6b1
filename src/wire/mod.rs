// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bit-exact wire layouts (spec §6): the Sercos telegram header, C-DEV/
//! S-DEV/C-CON control words, the Hot-Plug field, and the Extended Function
//! field. Every encode/decode goes through [`crate::mem::cursor`] so offset
//! errors are caught rather than silently truncated.

use crate::mem::{Cursor, CursorMut, MemResult};

/// The 6-byte header common to every MDT/AT telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SercosHeader {
    pub telegram_type: u8,
    pub cycle_count: u8,
    pub phase: u8,
    pub phase_switch: bool,
}

impl SercosHeader {
    pub fn write(&self, cursor: &mut CursorMut<'_>) -> MemResult<()> {
        cursor.write_u8(self.telegram_type)?;
        cursor.write_u8(self.cycle_count)?;
        let mut byte = self.phase & 0x07;
        if self.phase_switch {
            byte |= 0x80;
        }
        cursor.write_u8(byte)?;
        cursor.write_u8(0)?;
        cursor.write_u16_le(0)
    }

    pub fn read(cursor: &mut Cursor<'_>) -> MemResult<Self> {
        let telegram_type = cursor.read_u8()?;
        let cycle_count = cursor.read_u8()?;
        let byte = cursor.read_u8()?;
        let _reserved = cursor.read_u8()?;
        let _reserved2 = cursor.read_u16_le()?;
        Ok(Self {
            telegram_type,
            cycle_count,
            phase: byte & 0x07,
            phase_switch: byte & 0x80 != 0,
        })
    }
}

/// C-DEV (Device Control word, master -> slave). Bits per spec §6:
/// 15=identification, 14=topology-change-command, 13..12=commanded-topology,
/// 11=physical-ring-closed, 8=master-valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CDev(pub u16);

impl CDev {
    #[must_use]
    pub fn identification(self) -> bool {
        self.0 & (1 << 15) != 0
    }

    #[must_use]
    pub fn topology_change_command(self) -> bool {
        self.0 & (1 << 14) != 0
    }

    #[must_use]
    pub fn commanded_topology(self) -> u8 {
        ((self.0 >> 12) & 0x3) as u8
    }

    #[must_use]
    pub fn physical_ring_closed(self) -> bool {
        self.0 & (1 << 11) != 0
    }

    #[must_use]
    pub fn master_valid(self) -> bool {
        self.0 & (1 << 8) != 0
    }

    #[must_use]
    pub fn with_master_valid(mut self, valid: bool) -> Self {
        if valid {
            self.0 |= 1 << 8;
        } else {
            self.0 &= !(1 << 8);
        }
        self
    }
}

/// S-DEV (Device Status word, slave -> master). Bits per spec §6:
/// 14=topology-ack, 13..12=current-topology, 11..10=inactive-port-status,
/// 8=slave-valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SDev(pub u16);

impl SDev {
    #[must_use]
    pub fn topology_ack(self) -> bool {
        self.0 & (1 << 14) != 0
    }

    #[must_use]
    pub fn current_topology(self) -> u8 {
        ((self.0 >> 12) & 0x3) as u8
    }

    #[must_use]
    pub fn inactive_port_status(self) -> u8 {
        ((self.0 >> 10) & 0x3) as u8
    }

    #[must_use]
    pub fn slave_valid(self) -> bool {
        self.0 & (1 << 8) != 0
    }
}

/// C-CON (Connection Control word). Bits per spec §6: 15..12=counter,
/// 7..6=real-time-bits, 4=flow-control, 2=data-field-delay, 1=new-data
/// toggle, 0=producer-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CCon(pub u16);

impl CCon {
    #[must_use]
    pub fn counter(self) -> u8 {
        ((self.0 >> 12) & 0xF) as u8
    }

    #[must_use]
    pub fn real_time_bits(self) -> u8 {
        ((self.0 >> 6) & 0x3) as u8
    }

    #[must_use]
    pub fn flow_control(self) -> bool {
        self.0 & (1 << 4) != 0
    }

    #[must_use]
    pub fn data_field_delay(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    #[must_use]
    pub fn new_data(self) -> bool {
        self.0 & (1 << 1) != 0
    }

    #[must_use]
    pub fn producer_ready(self) -> bool {
        self.0 & 1 != 0
    }

    #[must_use]
    pub fn with_counter(mut self, counter: u8) -> Self {
        self.0 = (self.0 & !0xF000) | (u16::from(counter & 0xF) << 12);
        self
    }

    #[must_use]
    pub fn with_new_data(mut self, set: bool) -> Self {
        if set {
            self.0 |= 1 << 1;
        } else {
            self.0 &= !(1 << 1);
        }
        self
    }

    #[must_use]
    pub fn with_producer_ready(mut self, set: bool) -> Self {
        if set {
            self.0 |= 1;
        } else {
            self.0 &= !1;
        }
        self
    }
}

/// The Hot-Plug field: 8 bytes, 2 B selection (4-bit slave index + 12-bit
/// Sercos address), 2 B control/status, 4 B info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HotPlugField {
    pub slave_index: u8,
    pub sercos_address: u16,
    pub control_or_status: u16,
    pub info: [u8; 4],
}

impl HotPlugField {
    pub fn write(&self, cursor: &mut CursorMut<'_>) -> MemResult<()> {
        let selection = (u16::from(self.slave_index & 0xF) << 12) | (self.sercos_address & 0x0FFF);
        cursor.write_u16_le(selection)?;
        cursor.write_u16_le(self.control_or_status)?;
        cursor.write_bytes(&self.info)
    }

    pub fn read(cursor: &mut Cursor<'_>) -> MemResult<Self> {
        let selection = cursor.read_u16_le()?;
        let control_or_status = cursor.read_u16_le()?;
        let info_slice = cursor.read_bytes(4)?;
        let mut info = [0u8; 4];
        info.copy_from_slice(info_slice);
        Ok(Self {
            slave_index: (selection >> 12) as u8,
            sercos_address: selection & 0x0FFF,
            control_or_status,
            info,
        })
    }
}

/// The Extended Function field (MDT0 only): 4 bytes, optionally carrying
/// Sercos Time split across two consecutive cycles behind a toggle bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedFunctionField(pub u32);

impl ExtendedFunctionField {
    #[must_use]
    pub fn toggle_bit(self) -> bool {
        self.0 & (1 << 31) != 0
    }

    #[must_use]
    pub fn payload(self) -> u32 {
        self.0 & 0x7FFF_FFFF
    }
}

/// SVC control field (master -> slave), 2 bytes. Carries handshake bit,
/// write bit, data-block-element, set-end bit, last-transmission bit —
/// matches [`crate::svc::AtomicRequest::build_control_word`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SvcControl(pub u16);

/// SVC status field (slave -> master), 2 bytes: handshake bit, busy, error, valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SvcStatus(pub u16);

impl SvcStatus {
    #[must_use]
    pub fn handshake(self) -> bool {
        self.0 & 1 != 0
    }

    #[must_use]
    pub fn busy(self) -> bool {
        self.0 & (1 << 1) != 0
    }

    #[must_use]
    pub fn error(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    #[must_use]
    pub fn valid(self) -> bool {
        self.0 & (1 << 3) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrips() {
        let mut buf = [0u8; 6];
        let header = SercosHeader { telegram_type: 1, cycle_count: 42, phase: 4, phase_switch: true };
        {
            let mut w = CursorMut::new(&mut buf);
            header.write(&mut w).unwrap();
        }
        let mut r = Cursor::new(&buf);
        assert_eq!(SercosHeader::read(&mut r).unwrap(), header);
    }

    #[test]
    fn c_con_bit_accessors() {
        let c = CCon::default().with_counter(5).with_new_data(true).with_producer_ready(true);
        assert_eq!(c.counter(), 5);
        assert!(c.new_data());
        assert!(c.producer_ready());
    }

    #[test]
    fn hot_plug_field_roundtrips() {
        let mut buf = [0u8; 8];
        let hp = HotPlugField { slave_index: 3, sercos_address: 0x120, control_or_status: 0xABCD, info: [1, 2, 3, 4] };
        {
            let mut w = CursorMut::new(&mut buf);
            hp.write(&mut w).unwrap();
        }
        let mut r = Cursor::new(&buf);
        assert_eq!(HotPlugField::read(&mut r).unwrap(), hp);
    }

    #[test]
    fn svc_status_bit_accessors() {
        let s = SvcStatus(0b1111);
        assert!(s.handshake() && s.busy() && s.error() && s.valid());
    }
}
