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

//! CUBIC window growth (RFC 8312).
//!
//! All curve arithmetic is double-precision; window sizes cross the
//! boundary as bytes and the polynomial is evaluated in segments.

use std::time::Duration;
use std::time::Instant;

/// Multiplicative window decrease factor applied on a congestion event.
const BETA: f64 = 0.7;

/// Scaling constant of the cubic term, in segments per second cubed.
const C: f64 = 0.4;

/// Additional `w_max` back-off applied when the saturation point is
/// falling, so competing flows that are also backing off get a share of
/// the freed capacity.
const BETA_LAST_MAX: f64 = 0.85;

/// Per-RTT additive increase factor of the TCP-friendly bound.
const ALPHA: f64 = 3.0 * (1.0 - BETA) / (1.0 + BETA);

#[derive(Debug)]
pub(crate) struct Cubic {
    max_datagram_size: usize,

    /// Window observed just before the last congestion event, in bytes.
    /// The saturation point the curve approaches and then exceeds.
    w_max: f64,

    /// Time for the curve to return to `w_max`, in seconds.
    k: f64,

    /// Anchor of the elapsed-time computation. Unset until the curve is
    /// re-anchored after a congestion event or on entry into avoidance.
    epoch: Option<Instant>,

    /// Window at the epoch, in bytes. Base of the TCP-friendly estimate.
    window_at_epoch: f64,
}

impl Cubic {
    pub(crate) fn new(max_datagram_size: usize) -> Self {
        Cubic {
            max_datagram_size,
            w_max: 0.0,
            k: 0.0,
            epoch: None,
            window_at_epoch: 0.0,
        }
    }

    /// Window reduction for a congestion event: records the saturation
    /// point (with fast convergence) and returns the backed-off window.
    /// The caller is responsible for clamping and for re-anchoring the
    /// epoch at the event time.
    pub(crate) fn after_loss(&mut self, congestion_window: usize) -> usize {
        let congestion_window = congestion_window as f64;

        self.w_max = if congestion_window < self.w_max {
            // We never got back to the previous saturation point, so assume
            // we are competing with another flow and back off further.
            congestion_window * BETA_LAST_MAX
        } else {
            congestion_window
        };

        self.epoch = None;

        (congestion_window * BETA) as usize
    }

    /// Anchors the curve at `now`, starting from `congestion_window`.
    ///
    /// When there is no saturation point above the current window (no prior
    /// congestion event, or the window already grew past `w_max`), the
    /// curve starts at its inflection point and is purely convex.
    pub(crate) fn set_epoch(&mut self, now: Instant, congestion_window: usize) {
        let congestion_window = congestion_window as f64;
        let mss = self.max_datagram_size as f64;

        self.epoch = Some(now);
        self.window_at_epoch = congestion_window;

        if self.w_max <= congestion_window {
            self.w_max = congestion_window;
            self.k = 0.0;
        } else {
            self.k = (self.w_max / mss * (1.0 - BETA) / C).cbrt();
        }
    }

    /// Target window for an acknowledgment at `event_time`.
    ///
    /// Elapsed time is projected one smoothed RTT ahead so the window
    /// anticipates the next round trip. The result is the larger of the
    /// cubic curve and the TCP-friendly Reno-equivalent estimate, and may
    /// be below the current window right after a loss; the caller must
    /// treat it as a floor, never a decrease.
    pub(crate) fn target(
        &mut self, congestion_window: usize, event_time: Instant,
        smoothed_rtt: Duration,
    ) -> usize {
        if self.epoch.is_none() {
            self.set_epoch(event_time, congestion_window);
        }

        let Some(epoch) = self.epoch else {
            return congestion_window;
        };

        let mss = self.max_datagram_size as f64;

        let t = event_time.saturating_duration_since(epoch).as_secs_f64() +
            smoothed_rtt.as_secs_f64();

        let w_cubic = (C * (t - self.k).powi(3) + self.w_max / mss) * mss;

        let smoothed_rtt = smoothed_rtt.as_secs_f64();

        let w_est = if smoothed_rtt > 0.0 {
            self.window_at_epoch + ALPHA * mss * (t / smoothed_rtt)
        } else {
            self.window_at_epoch
        };

        w_cubic.max(w_est) as usize
    }

    /// Full reset after a retransmission timeout.
    pub(crate) fn reset(&mut self) {
        self.w_max = 0.0;
        self.k = 0.0;
        self.epoch = None;
        self.window_at_epoch = 0.0;
    }
}
