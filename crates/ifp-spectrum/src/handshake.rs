//! Start-up handshake between the decode core and the rest of the firmware.
//!
//! The decode core is launched first, configures its sequencers, then parks
//! until the other core reports that shared I/O (USB stdio) is up. A
//! single-slot inter-core FIFO carries the one token.

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

const BEGIN: u32 = 0;

/// Create the two ends of the start FIFO.
#[must_use]
pub fn start_fifo() -> (StartSender, StartReceiver) {
    let (producer, consumer) = HeapRb::<u32>::new(1).split();
    (StartSender { producer }, StartReceiver { consumer })
}

/// Held by the companion core; signals once.
pub struct StartSender {
    producer: HeapProd<u32>,
}

impl StartSender {
    /// Release the decode core.
    pub fn signal(mut self) {
        match self.producer.try_push(BEGIN) {
            Ok(()) => log::debug!("start token sent to bus decoder"),
            Err(token) => log::error!("start FIFO already full, token {token} not sent"),
        }
    }
}

/// Held by the decode core.
pub struct StartReceiver {
    consumer: HeapCons<u32>,
}

impl StartReceiver {
    /// Spin until the start token arrives.
    pub fn wait(&mut self) {
        while !self.try_wait() {
            std::hint::spin_loop();
        }
    }

    /// Consume the start token if it has arrived.
    pub fn try_wait(&mut self) -> bool {
        self.consumer.try_pop().is_some()
    }
}
