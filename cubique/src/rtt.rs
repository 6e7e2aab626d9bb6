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

//! Round-trip time tracking.

use std::time::Duration;

pub(crate) const INITIAL_RTT: Duration = Duration::from_millis(333);

/// Smoothed round-trip estimates for a connection.
///
/// Updated by the loss-recovery layer as acknowledgments arrive; the
/// congestion controller only reads it.
#[derive(Debug)]
pub struct RttStats {
    latest_rtt: Duration,

    smoothed_rtt: Option<Duration>,

    rttvar: Duration,

    min_rtt: Duration,

    max_ack_delay: Duration,
}

impl RttStats {
    pub fn new(max_ack_delay: Duration) -> Self {
        RttStats {
            latest_rtt: Duration::ZERO,

            // Tracks whether any RTT sample was received; `rtt()` falls back
            // to `INITIAL_RTT` until then.
            smoothed_rtt: None,

            min_rtt: Duration::ZERO,

            max_ack_delay,

            rttvar: INITIAL_RTT / 2,
        }
    }

    /// Feeds a new RTT sample, adjusting for the peer's reported ack delay
    /// when plausible.
    pub fn update_rtt(&mut self, latest_rtt: Duration, ack_delay: Duration) {
        self.latest_rtt = latest_rtt;

        match self.smoothed_rtt {
            // First RTT sample.
            None => {
                self.min_rtt = latest_rtt;

                self.smoothed_rtt = Some(latest_rtt);

                self.rttvar = latest_rtt / 2;
            },

            Some(srtt) => {
                self.min_rtt = self.min_rtt.min(latest_rtt);

                let ack_delay = self.max_ack_delay.min(ack_delay);

                // Adjust for ack delay if plausible.
                let adjusted_rtt = if latest_rtt > self.min_rtt + ack_delay {
                    latest_rtt - ack_delay
                } else {
                    latest_rtt
                };

                let abs_difference = srtt
                    .saturating_sub(adjusted_rtt)
                    .max(adjusted_rtt.saturating_sub(srtt));

                self.rttvar = self.rttvar.mul_f64(3.0 / 4.0) +
                    abs_difference.mul_f64(1.0 / 4.0);

                self.smoothed_rtt = Some(
                    srtt.mul_f64(7.0 / 8.0) + adjusted_rtt.mul_f64(1.0 / 8.0),
                );
            },
        }
    }

    /// The most recent raw sample.
    pub fn latest_rtt(&self) -> Duration {
        self.latest_rtt
    }

    /// The smoothed RTT, or the conventional initial estimate before the
    /// first sample.
    pub fn rtt(&self) -> Duration {
        self.smoothed_rtt.unwrap_or(INITIAL_RTT)
    }

    /// The RTT variance estimate.
    pub fn rttvar(&self) -> Duration {
        self.rttvar
    }

    /// The minimum RTT observed over the connection's lifetime, if any
    /// sample was taken.
    pub fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt.ne(&Duration::ZERO).then_some(self.min_rtt)
    }
}

impl Default for RttStats {
    fn default() -> Self {
        RttStats::new(Duration::ZERO)
    }
}
