// Copyright (C) 2025, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Reno-equivalent additive increase.
//!
//! The compatibility growth strategy: roughly one full-sized segment per
//! fully-acknowledged round trip regardless of ack granularity, and strict
//! halving on loss.

/// Reno backoff factor.
const LOSS_REDUCTION_FACTOR: f64 = 0.5;

#[derive(Debug)]
pub(crate) struct Reno {
    max_datagram_size: usize,
}

impl Reno {
    pub(crate) fn new(max_datagram_size: usize) -> Self {
        Reno { max_datagram_size }
    }

    /// Target window for an acknowledgment of `acked_bytes`.
    ///
    /// Scaling the per-ack increase by `acked_bytes / congestion_window`
    /// sums to about one segment once a full window has been acknowledged.
    pub(crate) fn target(
        &self, congestion_window: usize, acked_bytes: usize,
    ) -> usize {
        if congestion_window == 0 {
            // No meaningful share of the window to attribute the ack to;
            // grow by nothing rather than divide by zero.
            return congestion_window;
        }

        congestion_window +
            self.max_datagram_size * acked_bytes / congestion_window
    }

    /// Window reduction for a congestion event; the caller clamps.
    pub(crate) fn after_loss(&mut self, congestion_window: usize) -> usize {
        (congestion_window as f64 * LOSS_REDUCTION_FACTOR) as usize
    }
}
