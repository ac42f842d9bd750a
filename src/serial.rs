use bitvec::prelude::*;
use log::trace;
use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{Parity, StopBits};

/// Shape of one character on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DataFrame {
    pub start_bits: u8,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for DataFrame {
    fn default() -> Self {
        DataFrame {
            start_bits: 1,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl DataFrame {
    fn parity_bits(&self) -> u8 {
        if self.parity == Parity::None {
            0
        } else {
            1
        }
    }

    /// Bit-times from the leading edge of the start bit to the end of the last stop bit.
    pub fn bit_count(&self) -> u8 {
        self.start_bits + self.data_bits + self.parity_bits() + self.stop_bits.count()
    }

    fn data_mask(&self) -> u8 {
        (0xFF_u16 >> (8 - self.data_bits)) as u8
    }
}

/// Status delivered alongside every received character.
#[bitfield(bits = 8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RxStatus {
    pub parity_error: bool,
    pub framing_error: bool,
    #[skip]
    __: B6,
}

impl RxStatus {
    pub fn is_ok(&self) -> bool {
        !self.parity_error() && !self.framing_error()
    }
}

#[derive(Default, Serialize, Deserialize)]
pub struct TransmitRegister {
    bits: u16,
    bit_count: u8,
    sent: u8,
}

impl TransmitRegister {
    pub fn is_empty(&self) -> bool {
        self.sent >= self.bit_count
    }

    #[cfg(test)]
    pub fn remaining(&self) -> u8 {
        self.bit_count.saturating_sub(self.sent)
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ReceiveState {
    #[default]
    Listening,
    Receiving,
    Full,
}

#[derive(Default, Serialize, Deserialize)]
pub struct ReceiveRegister {
    pub(crate) state: ReceiveState,
    pub(crate) bits: u16,
    pub(crate) received: u8,
}

/// Bit-level half of the port: frame layout, bit rates and the two shift registers.
#[derive(Default, Serialize, Deserialize)]
pub struct Serial {
    frame: DataFrame,
    tra_rate: u32,
    rcv_rate: u32,
    tra: TransmitRegister,
    rcv: ReceiveRegister,
}

impl Serial {
    pub fn set_data_frame(&mut self, frame: DataFrame) {
        assert_eq!(frame.start_bits, 1);
        assert!((5..=8).contains(&frame.data_bits));
        self.frame = frame;
    }

    pub fn data_frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn set_tra_rate(&mut self, rate: u32) {
        self.tra_rate = rate;
    }

    pub fn set_rcv_rate(&mut self, rate: u32) {
        self.rcv_rate = rate;
    }

    pub fn tra_rate(&self) -> u32 {
        self.tra_rate
    }

    pub fn rcv_rate(&self) -> u32 {
        self.rcv_rate
    }

    pub fn transmit_register_reset(&mut self) {
        self.tra = TransmitRegister::default();
    }

    pub fn is_transmit_register_empty(&self) -> bool {
        self.tra.is_empty()
    }

    #[cfg(test)]
    pub fn transmit_register(&self) -> &TransmitRegister {
        &self.tra
    }

    /// Lay out `data` as a complete frame, ready to be shifted out LSB first.
    pub fn transmit_register_setup(&mut self, data: u8) {
        let frame = self.frame;
        let data = data & frame.data_mask();

        let mut bits = 0_u16;
        let view = bits.view_bits_mut::<Lsb0>();
        let mut pos = frame.start_bits as usize;

        view[pos..pos + frame.data_bits as usize].store(data);
        pos += frame.data_bits as usize;

        if let Some(parity) = frame.parity.bit(data) {
            view.set(pos, parity);
            pos += 1;
        }

        view[pos..frame.bit_count() as usize].fill(true);

        trace!("TX frame: 0x{data:02X} -> {bits:#018b}");

        self.tra = TransmitRegister {
            bits,
            bit_count: frame.bit_count(),
            sent: 0,
        };
    }

    pub fn transmit_register_get_data_bit(&mut self) -> bool {
        debug_assert!(!self.tra.is_empty());
        let bit = self.tra.bits.view_bits::<Lsb0>()[self.tra.sent as usize];
        self.tra.sent += 1;
        bit
    }

    pub fn receive_register_reset(&mut self) {
        self.rcv = ReceiveRegister::default();
    }

    #[cfg(test)]
    pub fn receive_state(&self) -> ReceiveState {
        self.rcv.state
    }

    #[cfg(test)]
    pub fn receive_register_mut(&mut self) -> &mut ReceiveRegister {
        &mut self.rcv
    }

    pub fn is_receive_register_full(&self) -> bool {
        self.rcv.state == ReceiveState::Full
    }

    pub fn receive_register_update_bit(&mut self, bit: bool) {
        match self.rcv.state {
            ReceiveState::Listening => {
                // Mark is idle line, space is the start bit
                if !bit {
                    self.rcv.bits = 0;
                    self.rcv.received = 1;
                    self.rcv.state = ReceiveState::Receiving;
                }
            }
            ReceiveState::Receiving => {
                let pos = self.rcv.received as usize;
                self.rcv.bits.view_bits_mut::<Lsb0>().set(pos, bit);
                self.rcv.received += 1;
                if self.rcv.received == self.frame.bit_count() {
                    self.rcv.state = ReceiveState::Full;
                }
            }
            ReceiveState::Full => {
                trace!("RX bit dropped, register not extracted");
            }
        }
    }

    /// Pull the character out of a full receive register and go back to listening.
    pub fn receive_register_extract(&mut self) -> (u8, RxStatus) {
        debug_assert!(self.is_receive_register_full());

        let frame = self.frame;
        let view = self.rcv.bits.view_bits::<Lsb0>();
        let mut pos = frame.start_bits as usize;

        let data: u8 = view[pos..pos + frame.data_bits as usize].load();
        pos += frame.data_bits as usize;

        let mut status = RxStatus::new();

        if let Some(expected) = frame.parity.bit(data) {
            status.set_parity_error(view[pos] != expected);
            pos += 1;
        }

        status.set_framing_error(view[pos..frame.bit_count() as usize].not_all());

        trace!("RX frame: {:#018b} -> 0x{data:02X}", self.rcv.bits);

        self.rcv = ReceiveRegister::default();
        (data, status)
    }

    /// Reject restored register state that could not have come from this frame layout.
    pub fn validate(&self) -> Result<(), String> {
        let frame = &self.frame;
        if frame.start_bits != 1 || !(5..=8).contains(&frame.data_bits) {
            return Err(format!("bad data frame: {frame:?}"));
        }
        if self.tra.bit_count != 0 && self.tra.bit_count != frame.bit_count() {
            return Err(format!(
                "transmit register holds {} bits, frame has {}",
                self.tra.bit_count,
                frame.bit_count()
            ));
        }
        if self.tra.sent > self.tra.bit_count {
            return Err(format!(
                "transmit register position {} past {}",
                self.tra.sent, self.tra.bit_count
            ));
        }
        let received = self.rcv.received;
        let valid = match self.rcv.state {
            ReceiveState::Listening => received == 0,
            ReceiveState::Receiving => (1..frame.bit_count()).contains(&received),
            ReceiveState::Full => received == frame.bit_count(),
        };
        if !valid {
            return Err(format!(
                "receive register {:?} at bit {received} of {}",
                self.rcv.state,
                frame.bit_count()
            ));
        }
        Ok(())
    }
}
