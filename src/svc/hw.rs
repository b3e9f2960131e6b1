// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hardware-backed SVC container driver (slave index < `max_hw_svc_container`).
//!
//! The MAC inserts/extracts the 6-byte per-cycle field automatically once
//! the container's control words are programmed; this driver's `advance`
//! is driven by the SVC-completion interrupt rather than by inspecting the
//! MDT/AT fields itself (spec §4.2 "Hardware containers").

use super::atomic::{AtomicRequest, AtomicState};
use super::{SvcChannel, SvcErrorCode};
use crate::error::{Error, Result};

const STATUS_ERROR_BIT: u16 = 1 << 2;
const STATUS_VALID_BIT: u16 = 1 << 3;

#[derive(Debug)]
pub struct HwSvcChannel {
    container_index: usize,
    current: Option<AtomicRequest>,
    finished: Option<Result<Vec<u8>>>,
}

impl HwSvcChannel {
    #[must_use]
    pub fn new(container_index: usize) -> Self {
        Self { container_index, current: None, finished: None }
    }

    #[must_use]
    pub fn container_index(&self) -> usize {
        self.container_index
    }
}

impl SvcChannel for HwSvcChannel {
    fn start(&mut self, request: AtomicRequest) -> Result<()> {
        if let Some(existing) = &self.current {
            if existing.priority >= request.priority {
                return Err(Error::ChannelInUse);
            }
            // Preempt: the in-flight request is canceled in place.
            let mut canceled = self.current.take().unwrap();
            canceled.mark_canceled();
            self.finished = Some(canceled.into_result());
        }
        self.current = Some(request);
        Ok(())
    }

    fn advance(&mut self, _mdt_control: u16, at_status: u16, at_info: [u8; 4]) -> Result<bool> {
        let Some(req) = self.current.as_mut() else { return Ok(false) };

        let status_error = at_status & STATUS_ERROR_BIT != 0;
        let status_valid = at_status & STATUS_VALID_BIT != 0;

        match req.state {
            AtomicState::InitRequest => {
                req.state = AtomicState::RequestInProgress;
                Ok(false)
            }
            AtomicState::RequestInProgress => {
                if status_error {
                    req.fail(SvcErrorCode(u16::from_le_bytes([at_info[0], at_info[1]])));
                    return self.finish();
                }
                if !status_valid {
                    return Ok(false);
                }
                match req.direction {
                    super::Direction::Write => req.advance_write(),
                    super::Direction::Read => req.advance_read(at_info),
                }
                if req.is_last_segment() {
                    req.state = AtomicState::LastStep;
                }
                Ok(false)
            }
            AtomicState::LastStep => {
                req.state = AtomicState::FinishedRequest;
                self.finish()
            }
            AtomicState::FinishedRequest => self.finish(),
        }
    }

    fn mdt_control_word(&self) -> u16 {
        self.current.as_ref().map_or(0, AtomicRequest::build_control_word)
    }

    fn mdt_info(&self) -> [u8; 4] {
        self.current.as_ref().map_or([0; 4], |req| {
            if req.direction == super::Direction::Write {
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
        if let Some(mut req) = self.current.take() {
            req.mark_canceled();
            self.finished = Some(req.into_result());
        }
    }

    fn take_result(&mut self) -> Option<Result<Vec<u8>>> {
        self.finished.take()
    }
}

impl HwSvcChannel {
    fn finish(&mut self) -> Result<bool> {
        if let Some(req) = self.current.take() {
            self.finished = Some(req.into_result());
        }
        Ok(true)
    }
}
