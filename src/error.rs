// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error taxonomy.
//!
//! Mirrors the class/number grouping of the Sercos master error codes:
//! system (0x10), Sercos protocol (0x20), configuration (0x21),
//! redundancy (0x22), hot-plug (0x23), connection FSM (0x25). The SVC
//! per-slave error sub-code space (0x1000..0x7fff) is kept separate in
//! [`crate::svc::SvcErrorCode`] since it travels over the wire rather
//! than being a local fault.

use std::fmt;

use crate::svc::SvcErrorCode;

/// Errors returned by the core's public operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ------------------------------------------------------------------
    // System (class 0x10)
    // ------------------------------------------------------------------
    /// The hardware port reported a fault the core cannot interpret further.
    SystemError(String),
    /// The installed hardware version is on the disallowed list.
    HardwareVersionBlacklisted(String),
    /// A timer/event time fell outside `[ulMinTime, ulMaxTime]` for the configured cycle time.
    EventTimeOutOfBounds { requested_ns: u32, min_ns: u32, max_ns: u32 },

    // ------------------------------------------------------------------
    // Sercos protocol (class 0x20)
    // ------------------------------------------------------------------
    /// Successive cyclic errors (MST-miss, window-error, no-telegrams) exceeded `usMaxNbrTelErr`.
    TelErrorOverrun,
    /// A telegram's computed length would exceed the communication cycle time budget.
    TelLenGtTscyc,
    /// MST (Master Synchronization Telegram) was missed this cycle.
    MstMiss,
    /// The CP3 transition-check procedure command (S-0-0127) failed.
    Cp3TransCheckCmdError,
    /// The CP4 transition-check procedure command (S-0-0128) failed.
    Cp4TransCheckCmdError,
    /// A phase-change-start step failed (e.g. phase register write rejected).
    PhaseChangeStartError(String),
    /// A phase-change-check step's timeout elapsed before the expected condition held.
    PhaseChangeCheckTimeout(String),
    /// An operation valid only within a specific phase was attempted outside it.
    WrongPhase { expected: crate::phase::Phase, actual: crate::phase::Phase },

    // ------------------------------------------------------------------
    // Configuration (class 0x21)
    // ------------------------------------------------------------------
    /// A connection was referenced that was never produced by anyone.
    ConnectionNotProduced(u16),
    /// A slave index outside `0..max_slaves` was used.
    WrongSlaveIndex(usize),
    /// A Sercos address outside `1..=511` was supplied.
    IllegalSlaveAddress(u16),
    /// Two connections attempted to occupy overlapping bytes of the same telegram.
    ProducerSlotOverlap { telegram: crate::telegram::TelegramId, offset: u16 },
    /// The master was configured as producer of an AT telegram (master never produces in AT).
    MasterCannotProduceAt,
    /// A slave was configured as producer of an MDT telegram (only the master produces in MDT).
    SlaveCannotProduceMdt,
    /// A connection's producer cycle time is not an integer multiple of the communication cycle.
    ProducerCycleNotMultiple,
    /// A reserved/unsupported S-0-1050 configuration-type value (3) was supplied.
    UnsupportedConnectionConfigType,

    // ------------------------------------------------------------------
    // Redundancy / hot-plug (classes 0x22 / 0x23)
    // ------------------------------------------------------------------
    /// Ring-delay measurement did not complete within its sample budget.
    RingDelayMeasurementTimeout,
    /// `RecoverRingTopology` was called while the topology was not `BrokenRing`.
    NotBrokenRing,
    /// Hot-plug HP0 parameter broadcast exhausted its retry envelope.
    HotPlugPhase0Timeout,
    /// Hot-plug HP0 slave address scan exceeded `HP0_SCAN_TIMEOUT`.
    HotPlugSlaveScanTimeout,
    /// The hot-plugged slave address was already recognized on the network.
    HotPlugAlreadyRecognized(u16),
    /// The hot-plugged slave address was not in the application's projected list.
    HotPlugNotProjected(u16),
    /// Two slaves announced the same Sercos address during hot-plug scan.
    HotPlugDoubleAddress(u16),
    /// The hot-plugged slave address is outside `1..=511`.
    HotPlugIllegalAddress(u16),

    // ------------------------------------------------------------------
    // SVC (sub-codes travel in-band; this wraps one for local propagation)
    // ------------------------------------------------------------------
    /// The slave reported an SVC-level error; the 16-bit sub-code is preserved unchanged.
    SvcErrorMessage(SvcErrorCode),
    /// A request was issued to a slave whose channel is already serving another in-flight request.
    ChannelInUse,
    /// A lower-priority request was preempted by a higher-priority one.
    RequestCanceled,
    /// The SVC handshake bit failed to toggle within `HS_Timeout` cycles.
    HandshakeTimeout,
    /// The SVC busy bit failed to clear within `BUSY_Timeout` cycles.
    BusyTimeout,
    /// A SetCommand/ClearCommand/ReadCmdStatus macro targeted an IDN without the procedure-command attribute bit.
    NotAProcedureCommand,

    // ------------------------------------------------------------------
    // Connection FSM (class 0x25)
    // ------------------------------------------------------------------
    /// A consumer connection exceeded its allowed-data-losses bound and entered `Error`.
    ConnectionInError(u16),
    /// `ClearConnectionError` was called on a connection not currently in `Error`.
    ConnectionNotInError(u16),

    // ------------------------------------------------------------------
    // Warnings (non-fatal; returned so the caller can log/ignore)
    // ------------------------------------------------------------------
    /// The requested connection state transition is a no-op (already in that state).
    SamePhaseRequest,
    /// Configured MTU and computed telegram length disagree; transmission still proceeds.
    MtuMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SystemError(msg) => write!(f, "system error: {msg}"),
            Error::HardwareVersionBlacklisted(v) => {
                write!(f, "hardware version blacklisted: {v}")
            }
            Error::EventTimeOutOfBounds { requested_ns, min_ns, max_ns } => write!(
                f,
                "event time {requested_ns} ns out of bounds [{min_ns}, {max_ns}]"
            ),
            Error::TelErrorOverrun => write!(f, "successive telegram error count exceeded"),
            Error::TelLenGtTscyc => write!(f, "telegram length exceeds communication cycle time"),
            Error::MstMiss => write!(f, "MST missed"),
            Error::Cp3TransCheckCmdError => write!(f, "CP3 transition check (S-0-0127) failed"),
            Error::Cp4TransCheckCmdError => write!(f, "CP4 transition check (S-0-0128) failed"),
            Error::PhaseChangeStartError(msg) => write!(f, "phase change start failed: {msg}"),
            Error::PhaseChangeCheckTimeout(msg) => {
                write!(f, "phase change check timed out: {msg}")
            }
            Error::WrongPhase { expected, actual } => {
                write!(f, "wrong phase: expected {expected:?}, actual {actual:?}")
            }
            Error::ConnectionNotProduced(conn) => write!(f, "connection {conn} is not produced"),
            Error::WrongSlaveIndex(idx) => write!(f, "slave index {idx} out of range"),
            Error::IllegalSlaveAddress(addr) => write!(f, "illegal slave address {addr}"),
            Error::ProducerSlotOverlap { telegram, offset } => write!(
                f,
                "producer slot overlap in telegram {telegram:?} at offset {offset}"
            ),
            Error::MasterCannotProduceAt => write!(f, "master cannot produce in an AT telegram"),
            Error::SlaveCannotProduceMdt => write!(f, "slave cannot produce in an MDT telegram"),
            Error::ProducerCycleNotMultiple => {
                write!(f, "producer cycle time is not a multiple of the communication cycle")
            }
            Error::UnsupportedConnectionConfigType => {
                write!(f, "unsupported connection configuration type (reserved value 3)")
            }
            Error::RingDelayMeasurementTimeout => write!(f, "ring delay measurement timed out"),
            Error::NotBrokenRing => write!(f, "topology is not BrokenRing"),
            Error::HotPlugPhase0Timeout => write!(f, "hot-plug HP0 parameter broadcast timed out"),
            Error::HotPlugSlaveScanTimeout => write!(f, "hot-plug slave address scan timed out"),
            Error::HotPlugAlreadyRecognized(addr) => {
                write!(f, "hot-plug address {addr} already recognized")
            }
            Error::HotPlugNotProjected(addr) => write!(f, "hot-plug address {addr} not projected"),
            Error::HotPlugDoubleAddress(addr) => write!(f, "hot-plug double address {addr}"),
            Error::HotPlugIllegalAddress(addr) => write!(f, "hot-plug illegal address {addr}"),
            Error::SvcErrorMessage(code) => write!(f, "SVC error 0x{:04X}", code.0),
            Error::ChannelInUse => write!(f, "SVC channel already in use"),
            Error::RequestCanceled => write!(f, "SVC request canceled by a higher-priority request"),
            Error::HandshakeTimeout => write!(f, "SVC handshake timeout"),
            Error::BusyTimeout => write!(f, "SVC busy timeout"),
            Error::NotAProcedureCommand => write!(f, "IDN does not carry the procedure-command attribute"),
            Error::ConnectionInError(conn) => write!(f, "connection {conn} is in Error state"),
            Error::ConnectionNotInError(conn) => write!(f, "connection {conn} is not in Error state"),
            Error::SamePhaseRequest => write!(f, "requested state equals current state"),
            Error::MtuMismatch => write!(f, "configured MTU and computed telegram length disagree"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias for results returned by the core.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_svc_code() {
        let e = Error::SvcErrorMessage(SvcErrorCode(0x7101));
        assert_eq!(format!("{e}"), "SVC error 0x7101");
    }

    #[test]
    fn wrong_phase_display() {
        let e = Error::WrongPhase {
            expected: crate::phase::Phase::Cp4,
            actual: crate::phase::Phase::Cp2,
        };
        assert!(format!("{e}").contains("Cp4"));
    }
}
