// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Software-emulated SVC engine (slave index >= `max_hw_svc_container`),
//! advanced explicitly once per Sercos cycle by the Cyclic Handler.
//! Implements the six-step algorithm of spec §4.2 verbatim.

use super::atomic::AtomicRequest;
use super::{Direction, SvcChannel, SvcErrorCode};
use crate::error::{Error, Result};

const CONTROL_HANDSHAKE_BIT: u16 = 1 << 4;
const STATUS_HANDSHAKE_BIT: u16 = 1 << 0;
const STATUS_BUSY_BIT: u16 = 1 << 1;
const STATUS_ERROR_BIT: u16 = 1 << 2;
const STATUS_VALID_BIT: u16 = 1 << 3;
const CONTROL_MASTER_BUSY_BIT: u16 = 1 << 7;

#[derive(Debug)]
pub struct SwSvcChannel {
    hs_timeout_cycles: u32,
    busy_timeout_cycles: u32,
    current: Option<AtomicRequest>,
    finished: Option<Result<Vec<u8>>>,
    local_control_extra: u16,
    master_busy: bool,
    interrupt_flag: bool,
}

impl SwSvcChannel {
    #[must_use]
    pub fn new(hs_timeout_cycles: u32, busy_timeout_cycles: u32) -> Self {
        Self {
            hs_timeout_cycles,
            busy_timeout_cycles,
            current: None,
            finished: None,
            local_control_extra: 0,
            master_busy: false,
            interrupt_flag: false,
        }
    }

    #[must_use]
    pub fn interrupt_flag(&self) -> bool {
        self.interrupt_flag
    }

    fn close_out(&mut self) {
        self.master_busy = true;
        self.interrupt_flag = true;
        if let Some(req) = self.current.take() {
            self.finished = Some(req.into_result());
        }
    }
}

impl SvcChannel for SwSvcChannel {
    fn start(&mut self, request: AtomicRequest) -> Result<()> {
        if let Some(existing) = &self.current {
            if existing.priority >= request.priority {
                return Err(Error::ChannelInUse);
            }
            let mut canceled = self.current.take().unwrap();
            canceled.mark_canceled();
            self.finished = Some(canceled.into_result());
        }
        self.master_busy = false;
        self.interrupt_flag = false;
        self.current = Some(request);
        Ok(())
    }

    /// `mdt_control` and `at_status` are this slave's mirrors read back from
    /// telegram RAM this cycle; `at_info` is the 4-byte AT info field.
    fn advance(&mut self, mdt_control: u16, at_status: u16, at_info: [u8; 4]) -> Result<bool> {
        let Some(req) = self.current.as_mut() else { return Ok(false) };

        // Step 4: cancellation check.
        if req.is_canceled() {
            self.master_busy = true;
            self.interrupt_flag = true;
            let req = self.current.take().unwrap();
            self.finished = Some(req.into_result());
            return Ok(true);
        }

        // Step 2: handshake check.
        let control_hs = mdt_control & CONTROL_HANDSHAKE_BIT != 0;
        let status_hs = at_status & STATUS_HANDSHAKE_BIT != 0;
        let status_valid = at_status & STATUS_VALID_BIT != 0;
        let handshake_ok = control_hs == status_hs && status_valid;
        if !handshake_ok {
            req.note_handshake_timeout();
        }

        // Step 3: busy check.
        let status_busy = at_status & STATUS_BUSY_BIT != 0;
        let busy_ok = !status_busy;
        if !busy_ok {
            req.note_busy_timeout();
        }

        let status_error = at_status & STATUS_ERROR_BIT != 0;

        // Step 6: error handling (checked before step 5's happy path).
        if status_error && handshake_ok && !self.master_busy {
            let code = SvcErrorCode(u16::from_le_bytes([at_info[0], at_info[1]]));
            req.fail(code);
            self.close_out();
            return Ok(true);
        }
        if req.busy_timeouts() > self.busy_timeout_cycles {
            req.fail(SvcErrorCode(0x1001));
            self.close_out();
            return Ok(true);
        }
        if req.handshake_timeouts() > self.hs_timeout_cycles {
            req.fail(SvcErrorCode(0x1002));
            self.close_out();
            return Ok(true);
        }

        // Step 5: happy-path advance.
        if !self.master_busy && handshake_ok && busy_ok {
            if control_hs != status_hs {
                // New sub-step: toggle handshake, advance data.
                match req.direction {
                    Direction::Write => req.advance_write(),
                    Direction::Read => req.advance_read(at_info),
                }
            } else if !status_error {
                match req.direction {
                    Direction::Read => {
                        if req.is_last_segment() {
                            req.advance_read(at_info);
                            self.close_out();
                            return Ok(true);
                        }
                    }
                    Direction::Write => {
                        if req.element as u16 == 0 {
                            self.close_out();
                            return Ok(true);
                        }
                    }
                }
            }
        }

        Ok(false)
    }

    fn mdt_control_word(&self) -> u16 {
        let mut word = self.current.as_ref().map_or(0, AtomicRequest::build_control_word);
        if self.master_busy {
            word |= CONTROL_MASTER_BUSY_BIT;
        }
        word | self.local_control_extra
    }

    fn mdt_info(&self) -> [u8; 4] {
        self.current.as_ref().map_or([0; 4], |req| {
            if req.direction == Direction::Write {
                req.next_write_chunk()
            } else {
                [0; 4]
            }
        })
    }

    fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    fn cancel(&mut self) {
        if let Some(req) = self.current.as_mut() {
            req.mark_canceled();
        }
    }

    fn take_result(&mut self) -> Option<Result<Vec<u8>>> {
        self.finished.take()
    }
}
