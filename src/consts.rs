pub const FIFO_SIZE: usize = 16;

// Bit clocks run on a nanosecond timeline
pub const CLOCK_HZ: u64 = 1_000_000_000;
