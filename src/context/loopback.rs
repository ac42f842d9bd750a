use ambassador::Delegate;

use super::{Console, Rs232Line};

/// Loopback plug: whatever the terminal transmits comes straight back in.
///
/// Handshake outputs are recorded so they can be inspected; `None` means the
/// line has not been driven yet.
#[derive(Delegate)]
#[delegate(Console, target = "console", where = "C: Console")]
pub struct Loopback<C> {
    console: C,
    rxd: bool,
    dcd: Option<bool>,
    dsr: Option<bool>,
    cts: Option<bool>,
}

impl<C> Loopback<C> {
    pub fn new(console: C) -> Self {
        Loopback {
            console,
            rxd: true,
            dcd: None,
            dsr: None,
            cts: None,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    pub fn rxd(&self) -> bool {
        self.rxd
    }

    pub fn dcd(&self) -> Option<bool> {
        self.dcd
    }

    pub fn dsr(&self) -> Option<bool> {
        self.dsr
    }

    pub fn cts(&self) -> Option<bool> {
        self.cts
    }
}

impl<C> Rs232Line for Loopback<C> {
    fn output_rxd(&mut self, state: bool) {
        self.rxd = state;
    }

    fn output_dcd(&mut self, state: bool) {
        self.dcd = Some(state);
    }

    fn output_dsr(&mut self, state: bool) {
        self.dsr = Some(state);
    }

    fn output_cts(&mut self, state: bool) {
        self.cts = Some(state);
    }

    fn txd(&self) -> bool {
        self.rxd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::RxStatus;

    #[test]
    fn echoes_rxd_on_txd() {
        let mut plug = Loopback::new(Vec::<u8>::new());
        assert!(plug.txd());
        plug.output_rxd(false);
        assert!(!plug.txd());
        plug.output_rxd(true);
        assert!(plug.txd());
    }

    #[test]
    fn forwards_to_console() {
        let mut plug = Loopback::new(Vec::<(u8, RxStatus)>::new());
        let status = RxStatus::new().with_parity_error(true);
        plug.term_write(b'k', status);
        assert_eq!(plug.into_console(), vec![(b'k', status)]);
    }
}
