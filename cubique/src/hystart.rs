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

//! Hybrid slow start.
//!
//! Delay-increase detection that ends slow start before the first loss:
//! if the lowest RTT seen early in a round of acknowledgments sits well
//! above the connection's minimum RTT, a queue is already building and
//! exponential growth should stop.

use std::time::Duration;

/// RTT samples considered at the start of each round.
const MIN_RTT_SAMPLES: usize = 8;

/// The delay increase threshold is min_rtt divided by this power of two.
const DELAY_FACTOR_EXP: u32 = 3;

/// No exit below this window, in packets.
const LOW_WINDOW_PACKETS: usize = 16;

/// Bounds on the delay increase threshold.
const DELAY_THRESHOLD_FLOOR: Duration = Duration::from_micros(4000);
const DELAY_THRESHOLD_CEILING: Duration = Duration::from_micros(16000);

#[derive(Debug, Default)]
pub(crate) struct HybridSlowStart {
    /// Whether a round of acknowledgments is being sampled.
    round_open: bool,

    /// Whether a delay increase has been detected.
    exit_found: bool,

    /// Most recently sent packet number; the boundary of the next round.
    last_sent_packet_number: u64,

    /// Packet number that closes the current round.
    round_end_packet_number: Option<u64>,

    /// RTT samples taken in the current round.
    rtt_sample_count: usize,

    /// Lowest RTT seen in the current round.
    round_min_rtt: Duration,
}

impl HybridSlowStart {
    /// Forget any pending exit decision, e.g. after a retransmission
    /// timeout put the connection back into a fresh probing phase.
    pub(crate) fn restart(&mut self) {
        self.round_open = false;
        self.exit_found = false;
    }

    pub(crate) fn on_packet_sent(&mut self, packet_number: u64) {
        self.last_sent_packet_number = packet_number;
    }

    /// Closes the current round when its final packet is acknowledged;
    /// the next incoming ack starts a new one.
    pub(crate) fn on_packet_acked(&mut self, acked_packet_number: u64) {
        if self.is_round_end(acked_packet_number) {
            self.round_open = false;
        }
    }

    fn begin_round(&mut self, last_sent: u64) {
        self.round_end_packet_number = Some(last_sent);
        self.round_min_rtt = Duration::ZERO;
        self.rtt_sample_count = 0;
        self.round_open = true;
    }

    fn is_round_end(&self, acked_packet_number: u64) -> bool {
        match self.round_end_packet_number {
            None => true,
            Some(end) => end <= acked_packet_number,
        }
    }

    /// Whether slow start should end now, fed one `latest_rtt` sample per
    /// acknowledgment while the sender is in slow start.
    pub(crate) fn should_exit_slow_start(
        &mut self, latest_rtt: Duration, min_rtt: Duration,
        congestion_window_packets: usize,
    ) -> bool {
        if !self.round_open {
            self.begin_round(self.last_sent_packet_number);
        }

        if self.exit_found {
            return true;
        }

        // Track the lowest RTT of the first few acks of the round; only
        // that floor is comparable against the connection minimum,
        // anything later in the round already includes self-inflicted
        // queueing.
        self.rtt_sample_count += 1;

        if self.rtt_sample_count <= MIN_RTT_SAMPLES &&
            (self.round_min_rtt.is_zero() || self.round_min_rtt > latest_rtt)
        {
            self.round_min_rtt = latest_rtt;
        }

        if self.rtt_sample_count == MIN_RTT_SAMPLES {
            let threshold = (min_rtt / (1u32 << DELAY_FACTOR_EXP))
                .clamp(DELAY_THRESHOLD_FLOOR, DELAY_THRESHOLD_CEILING);

            if self.round_min_rtt > min_rtt + threshold {
                self.exit_found = true;
            }
        }

        congestion_window_packets >= LOW_WINDOW_PACKETS && self.exit_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_boundaries() {
        let mut hystart = HybridSlowStart::default();

        hystart.begin_round(3);

        assert!(!hystart.is_round_end(1));
        assert!(!hystart.is_round_end(2));
        assert!(hystart.is_round_end(3));
        assert!(hystart.is_round_end(4));

        hystart.begin_round(20);

        for packet_number in 4..20 {
            assert!(!hystart.is_round_end(packet_number));
        }
        assert!(hystart.is_round_end(20));
    }

    #[test]
    fn steady_rtt_never_exits() {
        let mut hystart = HybridSlowStart::default();
        let rtt = Duration::from_millis(60);

        hystart.on_packet_sent(100);

        for _ in 0..4 * MIN_RTT_SAMPLES {
            assert!(!hystart.should_exit_slow_start(rtt, rtt, 100));
        }
    }

    #[test]
    fn delay_increase_is_detected() {
        // With a 60ms minimum the detection threshold is 60 / 8 = 7.5ms.
        let mut hystart = HybridSlowStart::default();
        let min_rtt = Duration::from_millis(60);

        hystart.on_packet_sent(1);

        // A round whose floor matches the minimum does not trigger.
        for n in 0..MIN_RTT_SAMPLES as u64 {
            assert!(!hystart.should_exit_slow_start(
                min_rtt + Duration::from_millis(n),
                min_rtt,
                100
            ));
        }

        // Force a new round.
        hystart.on_packet_acked(1);
        hystart.on_packet_sent(2);

        // Every sample of this round is at least 10ms above the minimum.
        let mut exited = false;
        for n in 0..MIN_RTT_SAMPLES as u64 {
            exited = hystart.should_exit_slow_start(
                min_rtt + Duration::from_millis(10 + n),
                min_rtt,
                100,
            );
        }

        assert!(exited);

        // The decision is sticky.
        assert!(hystart.should_exit_slow_start(min_rtt, min_rtt, 100));
    }

    #[test]
    fn no_exit_below_low_window() {
        let mut hystart = HybridSlowStart::default();
        let min_rtt = Duration::from_millis(60);

        hystart.on_packet_sent(1);

        for n in 0..MIN_RTT_SAMPLES as u64 {
            assert!(!hystart.should_exit_slow_start(
                min_rtt + Duration::from_millis(10 + n),
                min_rtt,
                LOW_WINDOW_PACKETS - 1,
            ));
        }
    }

    #[test]
    fn restart_clears_detection() {
        let mut hystart = HybridSlowStart::default();
        let min_rtt = Duration::from_millis(60);

        hystart.on_packet_sent(1);

        for n in 0..MIN_RTT_SAMPLES as u64 {
            hystart.should_exit_slow_start(
                min_rtt + Duration::from_millis(10 + n),
                min_rtt,
                100,
            );
        }

        hystart.restart();

        assert!(!hystart.should_exit_slow_start(min_rtt, min_rtt, 100));
    }
}
