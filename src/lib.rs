// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # sercos3-master — Sercos III master communication core (CoSeMa)
//!
//! A master-side implementation of the Sercos III wire protocol for
//! real-time motion and I/O fieldbus networks over a redundant dual-port
//! 100 Mbit/s Ethernet physical layer: cyclic MDT/AT telegram scheduling,
//! communication-phase progression (NRT→CP0→CP1→CP2→CP3→CP4), a
//! hardware-accelerated and software-emulated service channel, redundancy
//! and hot-plug handling, and per-connection producer/consumer state
//! machines.
//!
//! ## Scope
//!
//! This crate implements the protocol core only. It consumes, but does
//! not implement, the concrete Sercos MAC/FPGA — see [`hal::HardwarePort`]
//! for the abstract interface a driver must provide. Configuration-file
//! parsing, CLI tooling, and diagnostic text formatting are not part of
//! this crate.
//!
//! ## Quick start
//!
//! ```ignore
//! // `MyHardwarePort` implements `hal::HardwarePort` for the concrete MAC/FPGA.
//! use sercos3_master::config::RuntimeConfig;
//! use sercos3_master::instance::Instance;
//!
//! let port = Box::new(MyHardwarePort::open()?);
//! let config = RuntimeConfig::builder().max_slaves(32).build()?;
//! let instance = Instance::new(port, config, &[])?;
//! assert_eq!(instance.phase(), sercos3_master::phase::Phase::Nrt);
//! ```
//!
//! For experimentation without real hardware, enable the `mock-hal`
//! feature and use [`hal::mock::MockPort`] in place of a concrete driver.
//!
//! ## Modules overview
//!
//! - [`hal`] — Hardware Port Abstraction (C1): the trait every concrete
//!   Sercos MAC/FPGA driver implements, plus an in-memory double for tests.
//! - [`mem`] / [`wire`] — byte-order helpers and bit-exact telegram field
//!   layouts (C2, §6).
//! - [`svc`] / [`svc_macro`] — the Service Channel engine and its
//!   higher-level read/write/command macro operations (C3, C4).
//! - [`telegram`] — the Telegram Layout Engine (C5).
//! - [`phase`] — the Phase Progression Engine (C6).
//! - [`conn`] — producer and consumer connection state machines (C7).
//! - [`cyclic`] — the per-cycle entry point (C8).
//! - [`redundancy`] — ring/line/broken-ring detection and hot-plug (C9).
//! - [`timing`] — timer/event programming (C10).
//! - [`instance`] — the root `Instance` tying every component together.
//! - [`config`] — protocol constants and per-`Instance` runtime tunables.
//! - [`error`] — the crate-wide error taxonomy.
//! - [`logging`] — compile-time configurable, zero-cost-when-disabled logging.

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Connection State Machines (C7): producer and consumer FSMs.
pub mod conn;
/// Per-cycle entry point (C8): harvest telegrams, run connection FSMs, advance software SVC.
pub mod cyclic;
/// Global configuration: wire-protocol constants and per-`Instance` runtime tunables.
pub mod config;
/// Crate-wide error taxonomy (§7).
pub mod error;
/// Hardware Port Abstraction (C1) and the in-memory `mock` double used by tests.
pub mod hal;
/// The root `Instance`: one per Sercos network, owning every other component's state.
pub mod instance;
/// Compile-time configurable logging system (zero-cost when disabled).
pub mod logging;
/// Endian/memory helpers (C2): bounds-checked cursors and block copy into telegram RAM.
pub mod mem;
/// Communication-Phase Progression Engine (C6): NRT→CP0..CP4.
pub mod phase;
/// Redundancy & Topology (C9): ring/line/broken-ring detection, ring recovery, hot-plug.
pub mod redundancy;
/// Projected Sercos slave records.
pub mod slave;
/// Service Channel Engine (C3): hardware-backed and software-emulated variants.
pub mod svc;
/// Service Channel Macro Layer (C4): Read/Write/SetCommand/ClearCommand/ReadCmdStatus.
pub mod svc_macro;
/// Telegram Layout Engine (C5): MDT/AT field offset assignment.
pub mod telegram;
/// Timing/Event Programming (C10): timer events, CYC_CLK/DIV_CLK, Sercos-time insertion.
pub mod timing;
/// Small free-standing helpers shared across components (4-bit counter wraparound, running stats).
pub mod util;
/// Bit-exact wire field layouts (C-DEV, S-DEV, C-CON, Hot-Plug, Extended Function) (§6).
pub mod wire;

pub use error::{Error, Result};
pub use instance::Instance;
pub use phase::Phase;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
