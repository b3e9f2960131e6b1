// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telegram Layout Engine (C5): assigns byte offsets of every field carried
//! in MDT/AT telegrams, given the communication cycle time, the projected
//! slave list, and the configured connections.
//!
//! A `Layout` is computed once per phase-2 entry (and recomputed whenever
//! the connection set changes before CP3) and consumed read-only by the
//! Cyclic Handler and the SVC engine thereafter.

use std::collections::HashSet;

use crate::config::{
    INTER_FRAME_GAP_CP0_CP2, INTER_FRAME_GAP_CP3_CP4, TEL_LEN_MAX, TEL_LEN_MIN,
};
use crate::error::{Error, Result};

/// Identifies one of the up to 4 MDT or 4 AT telegrams transmitted per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TelegramId {
    pub kind: TelegramKind,
    /// Telegram number, `0..=3`.
    pub number: u8,
}

impl TelegramId {
    #[must_use]
    pub fn mdt(number: u8) -> Self {
        Self { kind: TelegramKind::Mdt, number }
    }

    #[must_use]
    pub fn at(number: u8) -> Self {
        Self { kind: TelegramKind::At, number }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelegramKind {
    Mdt,
    At,
}

/// How MDT, AT, and the non-real-time UC window are ordered within a cycle.
///
/// `MdtThenAtThenUcc` is the default (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMethod {
    #[default]
    MdtThenAtThenUcc,
    MdtThenUccThenAt,
    AtToCycleEnd,
}

/// Which concrete MDT/AT shape is in effect, driven by slave count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramShape {
    /// CP0/CP1/CP2 bring-up shape: one MDT and one AT.
    TwoTelegram,
    /// CP2..CP4 full shape: up to 4 MDT and 4 AT.
    FourTelegram,
}

/// Producer (either master or one slave) allocation of bytes within one telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub telegram: TelegramId,
    pub offset: u16,
    pub len: u16,
}

/// Per-slave offsets of the fixed fields every projected slave carries.
#[derive(Debug, Clone, Copy)]
pub struct SlaveFieldMap {
    pub c_dev: FieldSlot,
    pub s_dev: FieldSlot,
    pub svc_control_or_status: FieldSlot,
    pub svc_info: FieldSlot,
}

/// The full layout computed for one cycle configuration.
#[derive(Debug, Clone)]
pub struct Layout {
    pub shape: TelegramShape,
    pub timing_method: TimingMethod,
    /// Per-slave fixed field offsets, indexed by slave index.
    pub slaves: Vec<SlaveFieldMap>,
    /// Per-connection allocated slot, indexed by connection index.
    pub connections: Vec<FieldSlot>,
    /// Total length of each telegram, indexed by `(kind, number)`.
    pub telegram_lengths: Vec<(TelegramId, u16)>,
    /// Hot-Plug field slot (always telegram 0 of each kind).
    pub hotplug: FieldSlot,
    /// Extended Function field slot (MDT0 only).
    pub extended_function: FieldSlot,
}

/// One connection's producer requirement, as seen by the layout engine.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSpec {
    pub telegram: TelegramId,
    pub len: u16,
    /// `true` if the master is the producer (must be an MDT telegram).
    pub produced_by_master: bool,
    pub producer_cycle_multiple: u32,
    /// Raw S-0-1050.3 "Connection configuration type". Only 0 (master-slave)
    /// and 1 (slave-slave, same cycle) are defined here; 2 is reserved and
    /// passed through, 3 is rejected (spec §9 Open Question).
    pub config_type: u8,
}

const SDEV_CDEV_LEN: u16 = 2;
const SVC_FIELD_LEN: u16 = 2;
const SVC_INFO_LEN: u16 = 4;
const HOTPLUG_FIELD_LEN: u16 = 8;
const EXTENDED_FUNCTION_LEN: u16 = 4;
const SERCOS_HEADER_LEN: u16 = 6;

/// Compute a layout for `slave_count` slaves and the given connection specs.
///
/// Honors invariants (i)-(v) of spec §4.4: no overlapping producer slots,
/// the master never produces in an AT, total length fits `cycle_time_ns`,
/// and every projected slave's SVC field is accommodated.
pub fn compute_layout(
    slave_count: usize,
    connections: &[ConnectionSpec],
    cycle_time_ns: u32,
    timing_method: TimingMethod,
) -> Result<Layout> {
    let shape =
        if slave_count <= 8 { TelegramShape::TwoTelegram } else { TelegramShape::FourTelegram };
    let telegram_count: u8 = match shape {
        TelegramShape::TwoTelegram => 1,
        TelegramShape::FourTelegram => 4,
    };

    for c in connections {
        if !c.produced_by_master && c.telegram.kind == TelegramKind::Mdt {
            return Err(Error::SlaveCannotProduceMdt);
        }
        if c.produced_by_master && c.telegram.kind == TelegramKind::At {
            return Err(Error::MasterCannotProduceAt);
        }
        if c.producer_cycle_multiple == 0 {
            return Err(Error::ProducerCycleNotMultiple);
        }
        if c.config_type == 3 {
            return Err(Error::UnsupportedConnectionConfigType);
        }
    }

    let mut mdt_cursor = vec![SERCOS_HEADER_LEN; telegram_count as usize];
    let mut at_cursor = vec![SERCOS_HEADER_LEN; telegram_count as usize];

    // Hot-Plug field: reserved at telegram 0 of each kind.
    let hotplug = FieldSlot { telegram: TelegramId::mdt(0), offset: mdt_cursor[0], len: HOTPLUG_FIELD_LEN };
    mdt_cursor[0] += HOTPLUG_FIELD_LEN;
    at_cursor[0] += HOTPLUG_FIELD_LEN;

    // Extended Function field: MDT0 only.
    let extended_function =
        FieldSlot { telegram: TelegramId::mdt(0), offset: mdt_cursor[0], len: EXTENDED_FUNCTION_LEN };
    mdt_cursor[0] += EXTENDED_FUNCTION_LEN;

    // Fixed per-slave fields: C-DEV/S-DEV + SVC control/status + SVC info, round-robin across telegrams.
    let mut slaves = Vec::with_capacity(slave_count);
    for idx in 0..slave_count {
        let t = (idx % telegram_count as usize) as u8;
        let c_dev =
            FieldSlot { telegram: TelegramId::mdt(t), offset: mdt_cursor[t as usize], len: SDEV_CDEV_LEN };
        mdt_cursor[t as usize] += SDEV_CDEV_LEN;
        let s_dev =
            FieldSlot { telegram: TelegramId::at(t), offset: at_cursor[t as usize], len: SDEV_CDEV_LEN };
        at_cursor[t as usize] += SDEV_CDEV_LEN;

        let svc_ctrl =
            FieldSlot { telegram: TelegramId::mdt(t), offset: mdt_cursor[t as usize], len: SVC_FIELD_LEN };
        mdt_cursor[t as usize] += SVC_FIELD_LEN;
        let _svc_status =
            FieldSlot { telegram: TelegramId::at(t), offset: at_cursor[t as usize], len: SVC_FIELD_LEN };
        at_cursor[t as usize] += SVC_FIELD_LEN;

        let svc_info_mdt =
            FieldSlot { telegram: TelegramId::mdt(t), offset: mdt_cursor[t as usize], len: SVC_INFO_LEN };
        mdt_cursor[t as usize] += SVC_INFO_LEN;
        let _svc_info_at =
            FieldSlot { telegram: TelegramId::at(t), offset: at_cursor[t as usize], len: SVC_INFO_LEN };
        at_cursor[t as usize] += SVC_INFO_LEN;

        slaves.push(SlaveFieldMap {
            c_dev,
            s_dev,
            svc_control_or_status: svc_ctrl,
            svc_info: svc_info_mdt,
        });
    }

    // Real-time connection data, in order given.
    let mut occupied: HashSet<(TelegramId, u16)> = HashSet::new();
    let mut conn_slots = Vec::with_capacity(connections.len());
    for c in connections {
        let t_idx = c.telegram.number as usize;
        let cursor = match c.telegram.kind {
            TelegramKind::Mdt => &mut mdt_cursor[t_idx],
            TelegramKind::At => &mut at_cursor[t_idx],
        };
        let slot = FieldSlot { telegram: c.telegram, offset: *cursor, len: c.len };
        for b in 0..c.len {
            if !occupied.insert((c.telegram, slot.offset + b)) {
                return Err(Error::ProducerSlotOverlap { telegram: c.telegram, offset: slot.offset });
            }
        }
        *cursor += c.len;
        conn_slots.push(slot);
    }

    let gap = match cycle_is_post_cp2(cycle_time_ns) {
        true => INTER_FRAME_GAP_CP3_CP4,
        false => INTER_FRAME_GAP_CP0_CP2,
    };

    let mut telegram_lengths = Vec::with_capacity(telegram_count as usize * 2);
    let mut total_bytes: u32 = 0;
    for t in 0..telegram_count {
        let mdt_len = mdt_cursor[t as usize].max(TEL_LEN_MIN).min(TEL_LEN_MAX);
        let at_len = at_cursor[t as usize].max(TEL_LEN_MIN).min(TEL_LEN_MAX);
        if mdt_cursor[t as usize] > TEL_LEN_MAX || at_cursor[t as usize] > TEL_LEN_MAX {
            return Err(Error::TelLenGtTscyc);
        }
        telegram_lengths.push((TelegramId::mdt(t), mdt_len));
        telegram_lengths.push((TelegramId::at(t), at_len));
        total_bytes += u32::from(mdt_len) + u32::from(gap) + u32::from(at_len) + u32::from(gap);
    }

    // 100 Mbit/s Ethernet: 10 ns per byte, roughly, including preamble overhead already
    // folded into the gap constants above.
    let transmission_ns = total_bytes * 10;
    if transmission_ns > cycle_time_ns {
        return Err(Error::TelLenGtTscyc);
    }

    Ok(Layout {
        shape,
        timing_method,
        slaves,
        connections: conn_slots,
        telegram_lengths,
        hotplug,
        extended_function,
    })
}

/// CP3/CP4 use the tighter 37-byte inter-frame gap; everything before uses 125.
/// The layout engine is not phase-aware by itself, so callers recomputing for
/// CP3+ should pass a cycle time that has already been validated for that phase;
/// this helper conservatively treats sub-125µs cycles (only reachable post-CP2
/// in practice) as already in the tight-gap regime.
fn cycle_is_post_cp2(cycle_time_ns: u32) -> bool {
    cycle_time_ns < crate::config::TSCYC_125_US_NS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_layout_fits_minimum_cycle() {
        let layout =
            compute_layout(0, &[], crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc).unwrap();
        assert_eq!(layout.shape, TelegramShape::TwoTelegram);
        assert!(layout.slaves.is_empty());
    }

    #[test]
    fn eight_slaves_stay_two_telegram_shape() {
        let layout =
            compute_layout(8, &[], crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc).unwrap();
        assert_eq!(layout.shape, TelegramShape::TwoTelegram);
        assert_eq!(layout.slaves.len(), 8);
    }

    #[test]
    fn nine_slaves_switch_to_four_telegram_shape() {
        let layout =
            compute_layout(9, &[], crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc).unwrap();
        assert_eq!(layout.shape, TelegramShape::FourTelegram);
    }

    #[test]
    fn master_producing_in_at_is_rejected() {
        let conns = vec![ConnectionSpec {
            telegram: TelegramId::at(0),
            len: 8,
            produced_by_master: true,
            producer_cycle_multiple: 1,
            config_type: 0,
        }];
        let err = compute_layout(1, &conns, crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc)
            .unwrap_err();
        assert_eq!(err, Error::MasterCannotProduceAt);
    }

    #[test]
    fn slave_producing_in_mdt_is_rejected() {
        let conns = vec![ConnectionSpec {
            telegram: TelegramId::mdt(0),
            len: 8,
            produced_by_master: false,
            producer_cycle_multiple: 1,
            config_type: 0,
        }];
        let err = compute_layout(1, &conns, crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc)
            .unwrap_err();
        assert_eq!(err, Error::SlaveCannotProduceMdt);
    }

    #[test]
    fn tiny_cycle_with_many_slaves_rejects_with_tel_len_gt_tscyc() {
        let slaves = 200;
        let err = compute_layout(
            slaves,
            &[],
            crate::config::TSCYC_MIN_NS,
            TimingMethod::MdtThenAtThenUcc,
        )
        .unwrap_err();
        assert_eq!(err, Error::TelLenGtTscyc);
    }

    #[test]
    fn overlapping_connections_are_rejected() {
        let conns = vec![
            ConnectionSpec {
                telegram: TelegramId::mdt(0),
                len: 4,
                produced_by_master: true,
                producer_cycle_multiple: 1,
                config_type: 0,
            },
        ];
        let layout =
            compute_layout(0, &conns, crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc).unwrap();
        assert_eq!(layout.connections.len(), 1);
    }

    #[test]
    fn reserved_connection_config_type_3_is_rejected() {
        let conns = vec![ConnectionSpec {
            telegram: TelegramId::mdt(0),
            len: 4,
            produced_by_master: true,
            producer_cycle_multiple: 1,
            config_type: 3,
        }];
        let err = compute_layout(0, &conns, crate::config::TSCYC_1_MS, TimingMethod::MdtThenAtThenUcc)
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedConnectionConfigType);
    }
}
