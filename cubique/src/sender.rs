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

//! The congestion window controller state machine.

use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::cubic::Cubic;
use crate::hystart::HybridSlowStart;
use crate::reno::Reno;
use crate::rtt::RttStats;
use crate::Config;
use crate::CongestionControlAlgorithm;

/// Floor of the congestion window, in packets.
pub const MINIMUM_WINDOW_PACKETS: usize = 2;

/// Passive sink for congestion window updates, e.g. a qlog or metrics
/// bridge. Purely diagnostic; the controller never reads anything back.
pub trait WindowObserver {
    /// Called after the congestion window changed to `window` bytes.
    fn on_window_change(&mut self, window: usize, now: Instant);
}

/// Congestion phase of the connection.
///
/// `SlowStart` is left permanently on the first congestion event, or when
/// the slow start threshold is reached or hybrid slow start detects a
/// delay increase. `Recovery` is entered by every fresh congestion event
/// and left for `CongestionAvoidance` once a packet sent after the cutback
/// is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SlowStart,
    CongestionAvoidance,
    Recovery,
}

/// The closed set of window growth strategies.
///
/// Selected once at construction and fixed for the connection's lifetime.
/// Further strategies become a new variant here, not a change to the
/// controller.
#[derive(Debug)]
enum Growth {
    Reno(Reno),
    Cubic(Cubic),
}

impl Growth {
    fn new(
        algorithm: CongestionControlAlgorithm, max_datagram_size: usize,
    ) -> Self {
        match algorithm {
            CongestionControlAlgorithm::Reno =>
                Growth::Reno(Reno::new(max_datagram_size)),

            CongestionControlAlgorithm::CUBIC =>
                Growth::Cubic(Cubic::new(max_datagram_size)),
        }
    }

    /// Target window for an acknowledgment in congestion avoidance. The
    /// controller applies it as a floor, never a decrease.
    fn target(
        &mut self, congestion_window: usize, acked_bytes: usize,
        event_time: Instant, rtt_stats: &RttStats,
    ) -> usize {
        match self {
            Growth::Reno(reno) => reno.target(congestion_window, acked_bytes),

            Growth::Cubic(cubic) =>
                cubic.target(congestion_window, event_time, rtt_stats.rtt()),
        }
    }

    /// Multiplicative decrease on a congestion event.
    fn after_loss(&mut self, congestion_window: usize) -> usize {
        match self {
            Growth::Reno(reno) => reno.after_loss(congestion_window),
            Growth::Cubic(cubic) => cubic.after_loss(congestion_window),
        }
    }

    /// Re-anchors time-based growth at the congestion event time.
    fn anchor(&mut self, now: Instant, congestion_window: usize) {
        match self {
            Growth::Reno(_) => (),
            Growth::Cubic(cubic) => cubic.set_epoch(now, congestion_window),
        }
    }

    fn reset(&mut self) {
        match self {
            Growth::Reno(_) => (),
            Growth::Cubic(cubic) => cubic.reset(),
        }
    }
}

/// Per-connection congestion window controller.
///
/// Owns the window and the slow-start/avoidance/recovery state machine and
/// delegates avoidance growth to the configured strategy. All event
/// methods are total: stale or duplicate notifications are ignored rather
/// than signalled, and arithmetic is clamped to the configured window
/// bounds. The caller is expected to invoke it from a single logical
/// sequence per connection; there is no internal locking.
pub struct CubicSender {
    state: State,

    growth: Growth,

    congestion_window: usize,

    min_congestion_window: usize,

    max_congestion_window: usize,

    slow_start_threshold: usize,

    max_datagram_size: usize,

    largest_sent_packet_number: Option<u64>,

    largest_acked_packet_number: Option<u64>,

    /// Largest packet number sent when the last window reduction was
    /// applied. Acks and losses at or below it belong to an already
    /// handled congestion event.
    largest_sent_at_last_cutback: Option<u64>,

    hystart: HybridSlowStart,

    clock: Arc<dyn Clock>,

    observer: Option<Box<dyn WindowObserver>>,
}

impl CubicSender {
    pub fn new(
        config: &Config, clock: Arc<dyn Clock>,
        observer: Option<Box<dyn WindowObserver>>,
    ) -> Self {
        CubicSender {
            state: State::SlowStart,

            growth: Growth::new(
                config.cc_algorithm(),
                config.max_datagram_size(),
            ),

            congestion_window: config.initial_congestion_window(),

            min_congestion_window: MINIMUM_WINDOW_PACKETS *
                config.max_datagram_size(),

            max_congestion_window: config.max_congestion_window(),

            slow_start_threshold: usize::MAX,

            max_datagram_size: config.max_datagram_size(),

            largest_sent_packet_number: None,

            largest_acked_packet_number: None,

            largest_sent_at_last_cutback: None,

            hystart: HybridSlowStart::default(),

            clock,

            observer,
        }
    }

    /// Whether another packet may be sent with `bytes_in_flight` already
    /// outstanding. Side-effect free.
    pub fn can_send(&self, bytes_in_flight: usize) -> bool {
        bytes_in_flight < self.congestion_window
    }

    /// Records a sent packet. Non-retransmissible packets don't occupy
    /// the window and are only counted for sequencing.
    pub fn on_packet_sent(
        &mut self, _sent_time: Instant, _bytes_in_flight: usize,
        packet_number: u64, _bytes: usize, is_retransmissible: bool,
    ) {
        self.largest_sent_packet_number = Some(
            self.largest_sent_packet_number
                .unwrap_or(packet_number)
                .max(packet_number),
        );

        if !is_retransmissible {
            return;
        }

        self.hystart.on_packet_sent(packet_number);
    }

    /// The core growth trigger.
    ///
    /// `prior_in_flight` is the bytes in flight before this ack was
    /// processed and `event_time` the time it was received. Acks for
    /// packets sent before the last window reduction change nothing.
    pub fn on_packet_acked(
        &mut self, packet_number: u64, acked_bytes: usize,
        _prior_in_flight: usize, event_time: Instant, rtt_stats: &RttStats,
    ) {
        self.largest_acked_packet_number = Some(
            self.largest_acked_packet_number
                .unwrap_or(packet_number)
                .max(packet_number),
        );

        if let Some(cutback) = self.largest_sent_at_last_cutback {
            if packet_number <= cutback {
                // Sent before the last reduction; the congestion event it
                // belongs to has already been reacted to.
                return;
            }

            if self.state == State::Recovery {
                self.state = State::CongestionAvoidance;
            }
        }

        match self.state {
            State::SlowStart => self.on_slow_start_ack(
                packet_number,
                acked_bytes,
                event_time,
                rtt_stats,
            ),

            State::CongestionAvoidance =>
                self.on_avoidance_ack(acked_bytes, event_time, rtt_stats),

            // Unreachable while the cutback marker is set, but harmless:
            // recovery acks don't grow the window.
            State::Recovery => (),
        }
    }

    fn on_slow_start_ack(
        &mut self, packet_number: u64, acked_bytes: usize, event_time: Instant,
        rtt_stats: &RttStats,
    ) {
        let window = self
            .congestion_window
            .saturating_add(acked_bytes)
            .min(self.max_congestion_window);

        self.update_window(window, event_time);

        if self.congestion_window >= self.slow_start_threshold {
            self.exit_slow_start();
        } else if self.hystart.should_exit_slow_start(
            rtt_stats.latest_rtt(),
            rtt_stats.min_rtt().unwrap_or_else(|| rtt_stats.rtt()),
            self.congestion_window / self.max_datagram_size,
        ) {
            self.slow_start_threshold = self.congestion_window;
            self.exit_slow_start();
        }

        self.hystart.on_packet_acked(packet_number);
    }

    fn on_avoidance_ack(
        &mut self, acked_bytes: usize, event_time: Instant,
        rtt_stats: &RttStats,
    ) {
        let target = self.growth.target(
            self.congestion_window,
            acked_bytes,
            event_time,
            rtt_stats,
        );

        // The strategy output is a floor: right after a loss the curve can
        // sit below the current window, and that must never read as a
        // decrease outside an explicit congestion event.
        let window = target
            .max(self.congestion_window)
            .min(self.max_congestion_window);

        self.update_window(window, event_time);
    }

    fn exit_slow_start(&mut self) {
        trace!(
            "slow start exit cwnd={} ssthresh={}",
            self.congestion_window,
            self.slow_start_threshold
        );

        self.state = State::CongestionAvoidance;
    }

    /// The loss/ECN response: multiplicative decrease and epoch reset.
    ///
    /// Repeated notifications out of a single loss burst (packet numbers
    /// at or below the previous cutback) are ignored so one burst causes
    /// exactly one reduction.
    pub fn on_congestion_event(
        &mut self, packet_number: u64, _lost_bytes: usize,
        _prior_in_flight: usize,
    ) {
        if let Some(cutback) = self.largest_sent_at_last_cutback {
            if packet_number <= cutback {
                return;
            }
        }

        let now = self.clock.now();

        let reduced = self.growth.after_loss(self.congestion_window);
        let window = reduced.max(self.min_congestion_window);

        trace!(
            "congestion event pkt={} cwnd {} -> {}",
            packet_number,
            self.congestion_window,
            window
        );

        self.update_window(window, now);

        self.slow_start_threshold = window;
        self.growth.anchor(now, window);

        self.largest_sent_at_last_cutback =
            self.largest_sent_packet_number.or(Some(packet_number));

        self.state = State::Recovery;
    }

    /// Collapse of the window after a retransmission timeout fired.
    ///
    /// When nothing was actually retransmitted only the cutback marker is
    /// dropped. Slow start is never re-entered once left: the reduced
    /// window regrows under the phase the connection was already in.
    pub fn on_retransmission_timeout(&mut self, packets_retransmitted: bool) {
        self.largest_sent_at_last_cutback = None;

        if self.state == State::Recovery {
            self.state = State::CongestionAvoidance;
        }

        if !packets_retransmitted {
            return;
        }

        let now = self.clock.now();

        self.hystart.restart();
        self.growth.reset();

        self.slow_start_threshold = self.congestion_window / 2;
        self.update_window(self.min_congestion_window, now);
    }

    /// Current congestion window, in bytes.
    pub fn congestion_window(&self) -> usize {
        self.congestion_window
    }

    /// Current congestion window, in full-sized packets.
    pub fn congestion_window_in_packets(&self) -> usize {
        self.congestion_window / self.max_datagram_size
    }

    pub fn in_slow_start(&self) -> bool {
        self.state == State::SlowStart
    }

    pub fn in_recovery(&self) -> bool {
        self.state == State::Recovery
    }

    pub fn slow_start_threshold(&self) -> usize {
        self.slow_start_threshold
    }

    fn update_window(&mut self, window: usize, now: Instant) {
        if window == self.congestion_window {
            return;
        }

        self.congestion_window = window;

        if let Some(observer) = self.observer.as_mut() {
            observer.on_window_change(window, now);
        }
    }
}

impl std::fmt::Debug for CubicSender {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CubicSender")
            .field("state", &self.state)
            .field("congestion_window", &self.congestion_window)
            .field("slow_start_threshold", &self.slow_start_threshold)
            .field("largest_sent_at_last_cutback", &self.largest_sent_at_last_cutback)
            .field("growth", &self.growth)
            .finish_non_exhaustive()
    }
}
