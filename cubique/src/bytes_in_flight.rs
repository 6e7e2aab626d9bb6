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

use std::time::Duration;
use std::time::Instant;

/// Bytes sent but neither acknowledged nor declared lost.
///
/// The congestion controller receives in-flight counts as event parameters;
/// this is the accounting a caller embeds to produce them. Besides the
/// running total it estimates how long the connection has had data
/// outstanding: intervals start when the count leaves zero and close when
/// it returns to zero, and the reported duration is the sum of all closed
/// intervals plus the currently open one.
#[derive(Debug, Default)]
pub struct BytesInFlight {
    // Current bytes in flight.
    bytes_in_flight: usize,

    // Instant at which bytes_in_flight last transitioned from 0 to >0,
    // i.e. the start of the currently open interval.
    interval_start: Option<Instant>,

    // Duration of the current open interval.
    open_interval_duration: Duration,

    // Sum of closed interval durations seen so far.
    closed_interval_duration: Duration,
}

impl BytesInFlight {
    /// Adds sent bytes, opening a non-idle interval if the count was zero.
    pub fn add(&mut self, delta: usize, now: Instant) {
        if delta == 0 {
            return;
        }

        self.bytes_in_flight += delta;

        if self.interval_start.is_some() {
            self.update_duration(now);
        } else {
            self.interval_start = Some(now);
        }
    }

    /// Removes acked or lost bytes. The count never goes negative, and
    /// reaching zero closes the current non-idle interval.
    pub fn saturating_subtract(&mut self, delta: usize, now: Instant) {
        self.bytes_in_flight = self.bytes_in_flight.saturating_sub(delta);
        self.update_duration(now);
    }

    /// Current bytes in flight.
    pub fn get(&self) -> usize {
        self.bytes_in_flight
    }

    /// Returns true if there are 0 bytes in flight.
    pub fn is_zero(&self) -> bool {
        self.bytes_in_flight == 0
    }

    /// Total time during which bytes in flight was > 0.
    pub fn duration(&self) -> Duration {
        self.closed_interval_duration + self.open_interval_duration
    }

    fn update_duration(&mut self, now: Instant) {
        if let Some(start) = self.interval_start {
            if self.bytes_in_flight == 0 {
                self.open_interval_duration = Duration::ZERO;
                self.closed_interval_duration += now - start;
                self.interval_start = None;
            } else {
                self.open_interval_duration = now - start;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounting_and_intervals() {
        let start = Instant::now();

        let mut in_flight = BytesInFlight::default();
        assert!(in_flight.is_zero());
        assert_eq!(in_flight.duration(), Duration::ZERO);

        in_flight.add(1000, start);
        assert_eq!(in_flight.get(), 1000);
        assert_eq!(in_flight.duration(), Duration::ZERO);

        // Adds don't move the interval start.
        let mut now = start + Duration::from_secs(2);
        in_flight.add(500, now);
        assert_eq!(in_flight.get(), 1500);
        assert_eq!(in_flight.duration(), Duration::from_secs(2));

        now += Duration::from_secs(5);
        in_flight.saturating_subtract(500, now);
        assert_eq!(in_flight.get(), 1000);
        assert_eq!(in_flight.duration(), Duration::from_secs(7));

        // Dropping to zero closes the interval.
        in_flight.saturating_subtract(1000, now);
        assert!(in_flight.is_zero());
        assert_eq!(in_flight.duration(), Duration::from_secs(7));

        // A later send opens a second interval; idle time in between is not
        // counted.
        now += Duration::from_secs(30);
        in_flight.add(200, now);

        now += Duration::from_secs(3);
        in_flight.saturating_subtract(200, now);
        assert!(in_flight.is_zero());
        assert_eq!(in_flight.duration(), Duration::from_secs(10));
    }

    #[test]
    fn never_negative() {
        let start = Instant::now();

        let mut in_flight = BytesInFlight::default();
        in_flight.add(300, start);

        in_flight.saturating_subtract(500, start + Duration::from_secs(1));

        assert_eq!(in_flight.get(), 0);
        assert_eq!(in_flight.duration(), Duration::from_secs(1));
    }
}
