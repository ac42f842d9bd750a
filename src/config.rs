use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::serial::DataFrame;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub enum StartBits {
    #[default]
    One,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub enum Baud {
    B110,
    B150,
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    #[default]
    B9600,
    B14400,
    B19200,
    B28800,
    B38400,
    B57600,
    B115200,
}

impl StartBits {
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => StartBits::One,
            _ => unreachable!("invalid start bits selection: {index}"),
        }
    }

    pub fn count(self) -> u8 {
        match self {
            StartBits::One => 1,
        }
    }
}

impl DataBits {
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => DataBits::Five,
            1 => DataBits::Six,
            2 => DataBits::Seven,
            3 => DataBits::Eight,
            _ => unreachable!("invalid data bits selection: {index}"),
        }
    }

    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl Parity {
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Parity::None,
            1 => Parity::Odd,
            2 => Parity::Even,
            3 => Parity::Mark,
            4 => Parity::Space,
            _ => unreachable!("invalid parity selection: {index}"),
        }
    }

    /// Level of the parity bit for `data`, or `None` when no parity bit is sent.
    pub fn bit(self, data: u8) -> Option<bool> {
        let odd_ones = data.count_ones() % 2 == 1;
        match self {
            Parity::None => None,
            Parity::Odd => Some(!odd_ones),
            Parity::Even => Some(odd_ones),
            Parity::Mark => Some(true),
            Parity::Space => Some(false),
        }
    }
}

impl StopBits {
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => StopBits::One,
            1 => StopBits::OnePointFive,
            2 => StopBits::Two,
            _ => unreachable!("invalid stop bits selection: {index}"),
        }
    }

    /// Whole bit-times spent at mark after the data. 1.5 is rounded up.
    pub fn count(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::OnePointFive | StopBits::Two => 2,
        }
    }
}

impl Baud {
    const TABLE: [(Baud, u32); 14] = [
        (Baud::B110, 110),
        (Baud::B150, 150),
        (Baud::B300, 300),
        (Baud::B600, 600),
        (Baud::B1200, 1200),
        (Baud::B2400, 2400),
        (Baud::B4800, 4800),
        (Baud::B9600, 9600),
        (Baud::B14400, 14400),
        (Baud::B19200, 19200),
        (Baud::B28800, 28800),
        (Baud::B38400, 38400),
        (Baud::B57600, 57600),
        (Baud::B115200, 115200),
    ];

    pub fn from_index(index: u8) -> Self {
        match Self::TABLE.get(index as usize) {
            Some((baud, _)) => *baud,
            None => unreachable!("invalid baud selection: {index}"),
        }
    }

    /// Bits per second
    pub fn rate(self) -> u32 {
        Self::TABLE[self as usize].1
    }
}

/// Line settings, as selected on the terminal's configuration panel.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub struct Config {
    pub tx_baud: Baud,
    pub rx_baud: Baud,
    pub start_bits: StartBits,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Config {
    pub fn data_frame(&self) -> DataFrame {
        DataFrame {
            start_bits: self.start_bits.count(),
            data_bits: self.data_bits.count(),
            parity: self.parity,
            stop_bits: self.stop_bits,
        }
    }
}
