use ambassador::delegatable_trait;

use crate::{serial::RxStatus, util::trait_alias};

/// RS-232 signals as seen from the terminal end of the cable.
///
/// Levels are logical: `true` is mark.
#[delegatable_trait]
pub trait Rs232Line {
    fn output_rxd(&mut self, state: bool);
    fn output_dcd(&mut self, state: bool);
    fn output_dsr(&mut self, state: bool);
    fn output_cts(&mut self, state: bool);

    /// Level the host is driving on TXD, sampled once per receive bit-time.
    fn txd(&self) -> bool;
}

/// Where received characters end up.
#[delegatable_trait]
pub trait Console {
    fn term_write(&mut self, data: u8, status: crate::serial::RxStatus);
}

trait_alias!(pub trait Context = Rs232Line + Console);

impl Console for Vec<u8> {
    fn term_write(&mut self, data: u8, _status: RxStatus) {
        self.push(data);
    }
}

impl Console for Vec<(u8, RxStatus)> {
    fn term_write(&mut self, data: u8, status: RxStatus) {
        self.push((data, status));
    }
}

// Declared after the traits so the delegation macros are in scope
pub mod loopback;
