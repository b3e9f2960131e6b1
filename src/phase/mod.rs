// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Phase Progression Engine (C6): drives NRT -> CP0 -> CP1 -> CP2 -> CP3 ->
//! CP4, including parameter broadcast, address scan, and the CP3/CP4
//! transition-check procedure commands.
//!
//! Every phase change is modeled as a polled state machine: the Cyclic
//! Handler ticks it once per cycle via `step`, which returns a
//! [`FuncState`] rather than blocking. This mirrors the teacher's
//! registry/discovery FSMs (`core::discovery::multicast::fsm`), generalized
//! from "discover RTPS participants" to "discover and commission Sercos
//! slaves".

use crate::error::{Error, Result};

/// Communication phase, per spec §2/§4.5. Ordered; `Cp4` is fully cyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Nrt,
    Cp0,
    Cp1,
    Cp2,
    Cp3,
    Cp4,
}

impl Phase {
    #[must_use]
    pub fn as_wire_value(self) -> u8 {
        match self {
            Phase::Nrt => 0,
            Phase::Cp0 => 0,
            Phase::Cp1 => 1,
            Phase::Cp2 => 2,
            Phase::Cp3 => 3,
            Phase::Cp4 => 4,
        }
    }
}

/// Outcome of one `step` call on a long-running, multi-cycle procedure.
///
/// No suspension point blocks; the caller reschedules using `sleep_hint_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuncState {
    NotReady { sleep_hint_ms: u32 },
    Completed,
    Err(Error),
}

/// Per-slave failure accumulator for bulk phase-switch operations (spec §3).
#[derive(Debug, Clone, Default)]
pub struct ExtendedDiagnosisList {
    pub entries: Vec<(usize, Error)>,
}

impl ExtendedDiagnosisList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, slave_index: usize, err: Error) {
        self.entries.push((slave_index, err));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single scanned AT0 snapshot, for CP0 stable-list detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cp0Scan {
    pub port1_addresses: Vec<u16>,
    pub port2_addresses: Vec<u16>,
}

/// CP0: detect a stable, duplicate-free, port-consistent slave list.
#[derive(Debug, Clone)]
pub struct SetPhase0 {
    last_scan: Option<Cp0Scan>,
    stable_count: u32,
    cycles_elapsed: u32,
    recognized: Option<Vec<u16>>,
}

impl SetPhase0 {
    #[must_use]
    pub fn new() -> Self {
        Self { last_scan: None, stable_count: 0, cycles_elapsed: 0, recognized: None }
    }

    /// Feed one cycle's AT0 scan. Returns `Completed` once
    /// `CP0_STABLE_CYCLES_REQUIRED` identical, duplicate-free, port-consistent
    /// scans have been observed within `CP0_STABLE_CYCLES_TIMEOUT`.
    pub fn step(&mut self, scan: Cp0Scan) -> FuncState {
        use crate::config::{CP0_STABLE_CYCLES_REQUIRED, CP0_STABLE_CYCLES_TIMEOUT};

        self.cycles_elapsed += 1;

        if scan.port1_addresses != scan.port2_addresses {
            self.stable_count = 0;
            self.last_scan = Some(scan);
        } else if has_duplicates(&scan.port1_addresses) {
            self.stable_count = 0;
            self.last_scan = Some(scan);
        } else if self.last_scan.as_ref() == Some(&scan) {
            self.stable_count += 1;
            if self.stable_count >= CP0_STABLE_CYCLES_REQUIRED {
                self.recognized = Some(scan.port1_addresses.clone());
                return FuncState::Completed;
            }
        } else {
            self.stable_count = 1;
            self.last_scan = Some(scan);
        }

        if self.cycles_elapsed >= CP0_STABLE_CYCLES_TIMEOUT {
            return FuncState::Err(Error::PhaseChangeCheckTimeout("CP0 stable slave list".into()));
        }
        FuncState::NotReady { sleep_hint_ms: 1 }
    }

    #[must_use]
    pub fn recognized_slaves(&self) -> Option<&[u16]> {
        self.recognized.as_deref()
    }
}

impl Default for SetPhase0 {
    fn default() -> Self {
        Self::new()
    }
}

fn has_duplicates(addrs: &[u16]) -> bool {
    let mut seen = std::collections::HashSet::new();
    !addrs.iter().all(|a| seen.insert(*a))
}

/// CP1: cross-reference projected vs. recognized slave lists; allocate indexes.
pub fn set_phase1(projected: &[u16], recognized: &[u16]) -> Result<Vec<u16>> {
    use std::collections::HashSet;
    let recognized_set: HashSet<u16> = recognized.iter().copied().collect();
    let projected_set: HashSet<u16> = projected.iter().copied().collect();

    for addr in projected {
        if !recognized_set.contains(addr) {
            return Err(Error::HotPlugNotProjected(*addr));
        }
    }
    for addr in recognized {
        if !projected_set.contains(addr) {
            return Err(Error::HotPlugAlreadyRecognized(*addr));
        }
    }
    // One-to-one: allocate indexes in projected order.
    Ok(projected.to_vec())
}

/// CP2: entry is a pure layout/config gate — the Telegram Layout Engine
/// computes the full-length schedule and the SVC becomes usable. No
/// multi-cycle wait of its own; callers call this once after `set_phase1`.
#[must_use]
pub fn set_phase2_ready(layout_ok: bool) -> bool {
    layout_ok
}

/// Per-slave transition-check procedure command progress, shared shape for
/// CP3 (S-0-0127) and CP4 (S-0-0128).
#[derive(Debug, Clone)]
pub struct TransitionCheck {
    pending: Vec<usize>,
    acknowledged: Vec<usize>,
    diagnosis: ExtendedDiagnosisList,
    cycles_elapsed: u32,
    timeout_cycles: u32,
}

impl TransitionCheck {
    #[must_use]
    pub fn new(slave_indexes: Vec<usize>, timeout_cycles: u32) -> Self {
        Self {
            pending: slave_indexes,
            acknowledged: Vec::new(),
            diagnosis: ExtendedDiagnosisList::new(),
            cycles_elapsed: 0,
            timeout_cycles,
        }
    }

    /// Report that `slave_index` acknowledged the procedure command this cycle.
    pub fn acknowledge(&mut self, slave_index: usize) {
        if let Some(pos) = self.pending.iter().position(|i| *i == slave_index) {
            self.pending.remove(pos);
            self.acknowledged.push(slave_index);
        }
    }

    /// Report that `slave_index` rejected the procedure command.
    pub fn fail(&mut self, slave_index: usize, err: Error) {
        if let Some(pos) = self.pending.iter().position(|i| *i == slave_index) {
            self.pending.remove(pos);
        }
        self.diagnosis.record(slave_index, err);
    }

    /// Tick one cycle; `Completed` once every slave has acknowledged,
    /// `Err` with the class-specific overall code once the timeout elapses
    /// with outstanding failures, `NotReady` otherwise.
    pub fn step(&mut self, is_cp4: bool) -> FuncState {
        self.cycles_elapsed += 1;
        if !self.diagnosis.is_empty() {
            return FuncState::Err(if is_cp4 {
                Error::Cp4TransCheckCmdError
            } else {
                Error::Cp3TransCheckCmdError
            });
        }
        if self.pending.is_empty() {
            return FuncState::Completed;
        }
        if self.cycles_elapsed >= self.timeout_cycles {
            return FuncState::Err(Error::PhaseChangeCheckTimeout(format!(
                "{} pending slave(s) did not acknowledge",
                self.pending.len()
            )));
        }
        FuncState::NotReady { sleep_hint_ms: 1 }
    }

    #[must_use]
    pub fn diagnosis(&self) -> &ExtendedDiagnosisList {
        &self.diagnosis
    }
}
