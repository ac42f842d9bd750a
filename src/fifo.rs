use serde::{Deserialize, Serialize};

use crate::consts::FIFO_SIZE;

/// Outbound character queue.
///
/// `head == tail` is ambiguous on its own; `empty` tells a drained queue
/// from one holding `FIFO_SIZE` characters.
#[derive(Serialize, Deserialize)]
pub struct Fifo {
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
    head: usize,
    tail: usize,
    empty: bool,
}

impl Default for Fifo {
    fn default() -> Self {
        Self::new()
    }
}

impl Fifo {
    pub fn new() -> Self {
        Fifo {
            data: vec![0; FIFO_SIZE],
            head: 0,
            tail: 0,
            empty: true,
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
        self.head = 0;
        self.tail = 0;
        self.empty = true;
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_full(&self) -> bool {
        !self.empty && self.head == self.tail
    }

    pub fn len(&self) -> usize {
        if self.is_full() {
            FIFO_SIZE
        } else {
            (self.tail + FIFO_SIZE - self.head) % FIFO_SIZE
        }
    }

    #[cfg(test)]
    pub fn head(&self) -> usize {
        self.head
    }

    #[cfg(test)]
    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn push(&mut self, data: u8) {
        self.check();
        debug_assert!(!self.is_full());

        self.data[self.tail] = data;
        self.tail = (self.tail + 1) % FIFO_SIZE;
        self.empty = false;
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.check();

        if self.empty {
            return None;
        }

        let data = self.data[self.head];
        self.head = (self.head + 1) % FIFO_SIZE;
        self.empty = self.head == self.tail;
        Some(data)
    }

    pub fn check(&self) {
        debug_assert!(!self.empty || self.head == self.tail);
        debug_assert!(self.head < self.data.len());
        debug_assert!(self.tail < self.data.len());
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.data.len() != FIFO_SIZE {
            return Err(format!("FIFO holds {} slots, expected {FIFO_SIZE}", self.data.len()));
        }
        if self.head >= FIFO_SIZE || self.tail >= FIFO_SIZE {
            return Err(format!(
                "FIFO index out of range: head = {}, tail = {}",
                self.head, self.tail
            ));
        }
        if self.empty && self.head != self.tail {
            return Err(format!(
                "empty FIFO with head = {} != tail = {}",
                self.head, self.tail
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_drain() {
        let mut fifo = Fifo::new();
        assert!(fifo.is_empty());
        assert_eq!(fifo.pop(), None);

        for i in 0..FIFO_SIZE as u8 {
            assert!(!fifo.is_full());
            fifo.push(i);
        }
        assert!(fifo.is_full());
        assert!(!fifo.is_empty());
        assert_eq!(fifo.head(), fifo.tail());
        assert_eq!(fifo.len(), FIFO_SIZE);

        for i in 0..FIFO_SIZE as u8 {
            assert_eq!(fifo.pop(), Some(i));
        }
        assert!(fifo.is_empty());
        assert_eq!(fifo.head(), fifo.tail());
        assert_eq!(fifo.len(), 0);
    }

    #[test]
    fn wraparound() {
        let mut fifo = Fifo::new();
        let mut next_in = 0_u8;
        let mut next_out = 0_u8;

        // Three in, two out, until the indices have lapped the buffer a few times
        for _ in 0..40 {
            for _ in 0..3 {
                if !fifo.is_full() {
                    fifo.push(next_in);
                    next_in = next_in.wrapping_add(1);
                }
            }
            for _ in 0..2 {
                assert_eq!(fifo.pop(), Some(next_out));
                next_out = next_out.wrapping_add(1);
            }
            assert!(fifo.head() < FIFO_SIZE);
            assert!(fifo.tail() < FIFO_SIZE);
            assert_eq!(fifo.len(), next_in.wrapping_sub(next_out) as usize);
            assert!(fifo.validate().is_ok());
        }

        while let Some(data) = fifo.pop() {
            assert_eq!(data, next_out);
            next_out = next_out.wrapping_add(1);
        }
        assert_eq!(next_in, next_out);
        assert!(fifo.is_empty());
    }

    #[test]
    fn clear_resets_indices() {
        let mut fifo = Fifo::new();
        for i in 0..5 {
            fifo.push(i + 1);
        }
        fifo.pop();
        fifo.clear();

        assert!(fifo.is_empty());
        assert_eq!((fifo.head(), fifo.tail()), (0, 0));
        assert!(fifo.data.iter().all(|&b| b == 0));
    }
}
