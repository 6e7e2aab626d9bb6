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

//! Congestion window control for QUIC-style transports.
//!
//! This crate implements the sender-side congestion window state machine of
//! a reliable transport: exponential slow start, congestion avoidance driven
//! by either the CUBIC growth function of RFC 8312 or a Reno-equivalent
//! additive increase, and multiplicative decrease with fast convergence on
//! loss.
//!
//! The controller is a pure in-memory state machine. It performs no I/O,
//! never blocks, and owns no packet state: the surrounding loss-recovery
//! layer feeds it send, ack and loss events, together with the bytes in
//! flight at the time of each event. Round-trip estimates are consumed
//! read-only through [`RttStats`], and wall-clock access goes through an
//! injected [`Clock`] so tests can advance time instantaneously.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use std::time::Instant;
//!
//! use cubique::Config;
//! use cubique::CongestionControlAlgorithm;
//! use cubique::CubicSender;
//! use cubique::RttStats;
//! use cubique::StdClock;
//!
//! const MSS: usize = 1350;
//!
//! let config =
//!     Config::new(CongestionControlAlgorithm::CUBIC, MSS, 10 * MSS, 100 * MSS)?;
//! let mut sender = CubicSender::new(&config, Arc::new(StdClock), None);
//!
//! let mut rtt_stats = RttStats::new(Duration::from_millis(25));
//! rtt_stats.update_rtt(Duration::from_millis(50), Duration::ZERO);
//!
//! let now = Instant::now();
//!
//! if sender.can_send(0) {
//!     sender.on_packet_sent(now, 0, 0, MSS, true);
//! }
//!
//! sender.on_packet_acked(0, MSS, MSS, now, &rtt_stats);
//!
//! assert!(sender.in_slow_start());
//! assert!(sender.congestion_window() > 10 * MSS);
//! # Ok::<(), cubique::Error>(())
//! ```
//!
//! Events arriving out of order or twice (stale acks, redundant loss
//! notifications for a single burst) are silently ignored, so callers can
//! forward network notifications as they arrive.

#[macro_use]
extern crate log;

use std::str::FromStr;

/// A specialized [`Result`] type for congestion control operations.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// A congestion control error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The provided configuration is invalid.
    InvalidConfig,

    /// The specified congestion control algorithm is not available.
    CongestionControl,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Available congestion control algorithms.
///
/// This enum provides the currently available list of congestion control
/// algorithms.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CongestionControlAlgorithm {
    /// Reno-equivalent congestion control algorithm. `reno` in a string form.
    Reno  = 0,
    /// CUBIC congestion control algorithm (default). `cubic` in a string
    /// form.
    CUBIC = 1,
}

impl FromStr for CongestionControlAlgorithm {
    type Err = Error;

    /// Converts a string to `CongestionControlAlgorithm`.
    ///
    /// If `name` is not valid, `Error::CongestionControl` is returned.
    fn from_str(name: &str) -> Result<Self> {
        match name {
            "reno" => Ok(CongestionControlAlgorithm::Reno),
            "cubic" => Ok(CongestionControlAlgorithm::CUBIC),

            _ => Err(Error::CongestionControl),
        }
    }
}

impl Default for CongestionControlAlgorithm {
    fn default() -> Self {
        CongestionControlAlgorithm::CUBIC
    }
}

/// Congestion controller configuration.
///
/// Supplied once at construction and immutable for the lifetime of the
/// connection. Window sizes are in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    cc_algorithm: CongestionControlAlgorithm,
    max_datagram_size: usize,
    initial_congestion_window: usize,
    max_congestion_window: usize,
}

impl Config {
    /// Creates a validated configuration.
    ///
    /// The datagram size must be non-zero, and both the initial and maximum
    /// windows must be able to hold at least [`MINIMUM_WINDOW_PACKETS`]
    /// full-sized datagrams, with the initial window not exceeding the
    /// maximum. Violations return [`Error::InvalidConfig`] rather than being
    /// tolerated at runtime.
    pub fn new(
        cc_algorithm: CongestionControlAlgorithm, max_datagram_size: usize,
        initial_congestion_window: usize, max_congestion_window: usize,
    ) -> Result<Config> {
        let min_congestion_window =
            sender::MINIMUM_WINDOW_PACKETS * max_datagram_size;

        if max_datagram_size == 0 ||
            max_congestion_window < min_congestion_window ||
            initial_congestion_window < min_congestion_window ||
            initial_congestion_window > max_congestion_window
        {
            return Err(Error::InvalidConfig);
        }

        Ok(Config {
            cc_algorithm,
            max_datagram_size,
            initial_congestion_window,
            max_congestion_window,
        })
    }

    /// The selected growth strategy.
    pub fn cc_algorithm(&self) -> CongestionControlAlgorithm {
        self.cc_algorithm
    }

    /// The maximum size of an outgoing datagram, in bytes.
    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// The congestion window at connection start, in bytes.
    pub fn initial_congestion_window(&self) -> usize {
        self.initial_congestion_window
    }

    /// The ceiling the congestion window may never exceed, in bytes.
    pub fn max_congestion_window(&self) -> usize {
        self.max_congestion_window
    }
}

pub use crate::bytes_in_flight::BytesInFlight;
pub use crate::clock::Clock;
pub use crate::clock::ManualClock;
pub use crate::clock::StdClock;
pub use crate::rtt::RttStats;
pub use crate::sender::CubicSender;
pub use crate::sender::WindowObserver;
pub use crate::sender::MINIMUM_WINDOW_PACKETS;

mod bytes_in_flight;
mod clock;
mod cubic;
mod hystart;
mod reno;
mod rtt;
mod sender;

#[cfg(test)]
mod test_sender;
