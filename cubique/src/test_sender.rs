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

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::bytes_in_flight::BytesInFlight;
use crate::clock::Clock;
use crate::clock::ManualClock;
use crate::rtt::RttStats;
use crate::sender::CubicSender;
use crate::Config;
use crate::CongestionControlAlgorithm;

pub(crate) const TEST_MSS: usize = 1350;

/// Drives a [`CubicSender`] with a deterministic clock and sequential
/// packet numbers, mirroring how a loss-recovery layer feeds it.
pub(crate) struct TestSender {
    pub(crate) sender: CubicSender,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) rtt_stats: RttStats,
    pub(crate) in_flight: BytesInFlight,
    pub(crate) max_datagram_size: usize,
    next_pkt: u64,
    next_ack: u64,
}

impl TestSender {
    pub(crate) fn new(
        algorithm: CongestionControlAlgorithm, initial_window_packets: usize,
        max_window_packets: usize,
    ) -> Self {
        let config = Config::new(
            algorithm,
            TEST_MSS,
            initial_window_packets * TEST_MSS,
            max_window_packets * TEST_MSS,
        )
        .unwrap();

        let clock = Arc::new(ManualClock::new(Instant::now()));

        TestSender {
            sender: CubicSender::new(&config, clock.clone(), None),
            clock,
            rtt_stats: RttStats::default(),
            in_flight: BytesInFlight::default(),
            max_datagram_size: TEST_MSS,
            next_pkt: 0,
            next_ack: 0,
        }
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    pub(crate) fn send_packet(&mut self) {
        let now = self.now();

        self.sender.on_packet_sent(
            now,
            self.in_flight.get(),
            self.next_pkt,
            self.max_datagram_size,
            true,
        );

        self.in_flight.add(self.max_datagram_size, now);
        self.next_pkt += 1;
    }

    /// Sends full-sized packets until the window is used up.
    pub(crate) fn send_available_window(&mut self) {
        while self.sender.can_send(self.in_flight.get()) {
            self.send_packet();
        }
    }

    /// Acknowledges the `n` oldest outstanding packets.
    pub(crate) fn ack_n_packets(&mut self, n: usize) {
        let now = self.now();

        for _ in 0..n {
            let prior_in_flight = self.in_flight.get();

            self.sender.on_packet_acked(
                self.next_ack,
                self.max_datagram_size,
                prior_in_flight,
                now,
                &self.rtt_stats,
            );

            self.in_flight.saturating_subtract(self.max_datagram_size, now);
            self.next_ack += 1;
        }
    }

    /// Acknowledges everything currently outstanding.
    pub(crate) fn ack_in_flight(&mut self) {
        let packets = self.in_flight.get() / self.max_datagram_size;
        self.ack_n_packets(packets);
    }

    /// Declares the `n` oldest outstanding packets lost, one congestion
    /// event notification each, the way a loss burst is reported.
    pub(crate) fn lose_n_packets(&mut self, n: usize) {
        let now = self.now();

        for _ in 0..n {
            let prior_in_flight = self.in_flight.get();

            self.sender.on_congestion_event(
                self.next_ack,
                self.max_datagram_size,
                prior_in_flight,
            );

            self.in_flight.saturating_subtract(self.max_datagram_size, now);
            self.next_ack += 1;
        }
    }

    pub(crate) fn update_rtt(&mut self, rtt: Duration) {
        self.rtt_stats.update_rtt(rtt, Duration::ZERO);
    }

    pub(crate) fn advance_time(&mut self, period: Duration) {
        self.clock.advance(period);
    }

    pub(crate) fn congestion_window(&self) -> usize {
        self.sender.congestion_window()
    }
}
