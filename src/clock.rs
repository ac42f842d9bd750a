use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::CLOCK_HZ;

/// Periodic bit-time source on the shared nanosecond timeline.
///
/// Tick times are derived from the tick count since `origin`, so rounding
/// never accumulates.
#[derive(Default, Debug, Serialize, Deserialize)]
pub struct BitClock {
    rate: u32,
    origin: u64,
    ticks: u64,
}

impl BitClock {
    pub fn restart(&mut self, rate: u32, now: u64) {
        self.rate = rate;
        self.origin = now;
        self.ticks = 0;
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn period(&self) -> Duration {
        if self.rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(CLOCK_HZ / self.rate as u64)
        }
    }

    /// Time of the next tick, `None` while stopped or past the end of the timeline.
    pub fn next_tick(&self) -> Option<u64> {
        if self.rate == 0 {
            return None;
        }
        let elapsed = (self.ticks as u128 + 1) * CLOCK_HZ as u128 / self.rate as u128;
        u64::try_from(self.origin as u128 + elapsed).ok()
    }

    pub fn advance(&mut self) {
        self.ticks += 1;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge {
    Tx,
    Rx,
}

/// The transmit and receive bit clocks, advanced together in time order.
#[derive(Default, Debug, Serialize, Deserialize)]
pub struct Clocks {
    now: u64,
    pub tx: BitClock,
    pub rx: BitClock,
}

impl Clocks {
    pub fn now(&self) -> u64 {
        self.now
    }

    #[cfg(test)]
    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }

    pub fn restart(&mut self, tx_rate: u32, rx_rate: u32) {
        self.tx.restart(tx_rate, self.now);
        self.rx.restart(rx_rate, self.now);
    }

    /// Pop the earliest tick at or before `deadline`. Transmit wins ties so a
    /// looped-back bit is on the line before it is sampled.
    pub fn next_edge(&mut self, deadline: u64) -> Option<Edge> {
        let tx = self.tx.next_tick().filter(|&t| t <= deadline);
        let rx = self.rx.next_tick().filter(|&t| t <= deadline);

        let (edge, at) = match (tx, rx) {
            (Some(tx), Some(rx)) if rx < tx => (Edge::Rx, rx),
            (Some(tx), _) => (Edge::Tx, tx),
            (None, Some(rx)) => (Edge::Rx, rx),
            (None, None) => {
                self.now = self.now.max(deadline);
                return None;
            }
        };

        match edge {
            Edge::Tx => self.tx.advance(),
            Edge::Rx => self.rx.advance(),
        }
        self.now = at;
        Some(edge)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, clock) in [("TX", &self.tx), ("RX", &self.rx)] {
            if clock.origin > self.now {
                return Err(format!("{name} clock starts in the future"));
            }
            if clock.rate != 0 {
                let last = clock.ticks as u128 * CLOCK_HZ as u128 / clock.rate as u128;
                if clock.origin as u128 + last > self.now as u128 {
                    return Err(format!("{name} clock is ahead of the timeline"));
                }
            }
        }
        Ok(())
    }
}
