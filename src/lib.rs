mod clock;
pub mod config;
mod consts;
pub mod context;
mod fifo;
mod port;
mod serial;
mod util;

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use clock::{Clocks, Edge};
pub use config::Config;
pub use consts::FIFO_SIZE;
pub use context::{loopback, Console, Rs232Line};
pub use context::loopback::Loopback;
use port::Port;
pub use serial::{DataFrame, RxStatus};

/// Serial terminal wired to a host through an RS-232 port.
pub struct SerialTerminal<H> {
    ctx: State,
    host: H,
}

/// Everything that goes into a save state.
#[derive(Default, Serialize, Deserialize)]
struct State {
    config: Config,
    port: Port,
    clocks: Clocks,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("serialize failed: {0}")]
    SerializeFailed(bincode::Error),
    #[error("deserialize failed: {0}")]
    DeserializeFailed(#[from] bincode::Error),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl<H: context::Context> SerialTerminal<H> {
    pub fn new(config: Config, host: H) -> Self {
        let mut ret = SerialTerminal {
            ctx: State {
                config,
                ..Default::default()
            },
            host,
        };
        ret.reset();
        ret
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Apply new line settings. Anything queued or in flight is discarded.
    pub fn set_config(&mut self, config: &Config) {
        self.ctx.config = *config;
        self.reset();
    }

    pub fn reset(&mut self) {
        let State {
            config,
            port,
            clocks,
        } = &mut self.ctx;

        port.update_serial(config, &mut self.host);
        clocks.restart(port.serial().tra_rate(), port.serial().rcv_rate());
    }

    /// Queue a keystroke for transmission. Dropped with a warning if the FIFO is full.
    pub fn send_key(&mut self, code: u8) {
        self.ctx.port.send_key(code);
    }

    pub fn tx_tick(&mut self) {
        self.ctx.port.tx_tick(&mut self.host);
    }

    pub fn rx_tick(&mut self) {
        self.ctx.port.rx_tick(&mut self.host);
    }

    /// Advance the bit clocks by `nanos`, running every tick that falls due.
    pub fn run_for(&mut self, nanos: u64) {
        let deadline = self.ctx.clocks.now().saturating_add(nanos);
        while let Some(edge) = self.ctx.clocks.next_edge(deadline) {
            match edge {
                Edge::Tx => self.tx_tick(),
                Edge::Rx => self.rx_tick(),
            }
        }
    }

    pub fn run(&mut self, duration: Duration) {
        self.run_for(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
    }

    /// Nanoseconds elapsed on the bit-clock timeline.
    pub fn now(&self) -> u64 {
        self.ctx.clocks.now()
    }

    pub fn tx_rate(&self) -> u32 {
        self.ctx.port.serial().tra_rate()
    }

    pub fn rx_rate(&self) -> u32 {
        self.ctx.port.serial().rcv_rate()
    }

    pub fn tx_period(&self) -> Duration {
        self.ctx.clocks.tx.period()
    }

    pub fn rx_period(&self) -> Duration {
        self.ctx.clocks.rx.period()
    }

    pub fn data_frame(&self) -> &DataFrame {
        self.ctx.port.serial().data_frame()
    }

    /// Keystrokes waiting behind the one being shifted out.
    pub fn queued(&self) -> usize {
        self.ctx.port.fifo().len()
    }

    pub fn is_transmitting(&self) -> bool {
        !self.ctx.port.serial().is_transmit_register_empty()
    }

    pub fn overruns(&self) -> u64 {
        self.ctx.port.overruns()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn save_state(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(&self.ctx).map_err(Error::SerializeFailed)
    }

    pub fn load_state(&mut self, data: &[u8]) -> Result<(), Error> {
        let ctx: State = bincode::deserialize(data)?;

        ctx.port.validate().map_err(Error::InvalidState)?;
        ctx.clocks.validate().map_err(Error::InvalidState)?;
        if ctx.port.serial().data_frame() != &ctx.config.data_frame() {
            return Err(Error::InvalidState(
                "data frame does not match configuration".to_string(),
            ));
        }

        let serial = ctx.port.serial();
        for (name, baud, rate, clock) in [
            ("TX", ctx.config.tx_baud, serial.tra_rate(), &ctx.clocks.tx),
            ("RX", ctx.config.rx_baud, serial.rcv_rate(), &ctx.clocks.rx),
        ] {
            if rate != baud.rate() || clock.rate() != baud.rate() {
                return Err(Error::InvalidState(format!(
                    "{name} rate mismatch: {} bps configured, port at {rate}, clock at {}",
                    baud.rate(),
                    clock.rate()
                )));
            }
        }

        debug!("Restored state at {} ns", ctx.clocks.now());
        self.ctx = ctx;
        Ok(())
    }
}
