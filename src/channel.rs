//! Typed, ordered message transport between the two parties.

use oblivious_transfer_rs::{ReceiverPublicKeys, SenderResponse};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::trace;

use crate::cut_and_choose::{CircuitOpening, InputOpening, OfflineCircuit};
use crate::error::{Result, TransportError};
use crate::garbled::GarbledTables;

pub enum Message {
    GarbledTables(GarbledTables),
    TranslationTable(Vec<u8>),
    /// The garbler's selected input keys, flat, in wire order.
    InputKeys(Vec<u8>),
    OtReceiverKeys(Vec<ReceiverPublicKeys>),
    OtSenderResponses(Vec<SenderResponse>),
    OfflineCircuits(Vec<OfflineCircuit>),
    /// Indices of the circuit copies the evaluator wants opened.
    CircuitSelection(Vec<usize>),
    CircuitOpenings(Vec<CircuitOpening>),
    InputOpenings(Vec<InputOpening>),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::GarbledTables(_) => "GarbledTables",
            Message::TranslationTable(_) => "TranslationTable",
            Message::InputKeys(_) => "InputKeys",
            Message::OtReceiverKeys(_) => "OtReceiverKeys",
            Message::OtSenderResponses(_) => "OtSenderResponses",
            Message::OfflineCircuits(_) => "OfflineCircuits",
            Message::CircuitSelection(_) => "CircuitSelection",
            Message::CircuitOpenings(_) => "CircuitOpenings",
            Message::InputOpenings(_) => "InputOpenings",
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(self.kind()).field(&"{ ... }").finish()
    }
}

/// Reliable, ordered transport. `receive` blocks until a message arrives or
/// the transport fails.
pub trait Channel {
    fn send(&mut self, message: Message) -> Result<()>;

    fn receive(&mut self) -> Result<Message>;
}

/// Receives the next message and unwraps the given variant, failing with a
/// structural error on any other variant.
macro_rules! expect_message {
    ($channel:expr, $variant:ident) => {
        match $channel.receive()? {
            $crate::channel::Message::$variant(inner) => inner,
            other => {
                return Err($crate::error::StructuralError::UnexpectedMessage {
                    expected: stringify!($variant),
                    received: other.kind(),
                }
                .into())
            }
        }
    };
}
pub(crate) use expect_message;

/// In-process channel endpoint backed by a pair of mpsc queues.
pub struct MemoryChannel {
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
    timeout: Option<Duration>,
}

impl MemoryChannel {
    /// Returns two connected endpoints. A `timeout` bounds every receive.
    pub fn pair(timeout: Option<Duration>) -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel();
        let (tx_b, rx_a) = mpsc::channel();
        (
            MemoryChannel {
                tx: tx_a,
                rx: rx_a,
                timeout,
            },
            MemoryChannel {
                tx: tx_b,
                rx: rx_b,
                timeout,
            },
        )
    }
}

impl Channel for MemoryChannel {
    fn send(&mut self, message: Message) -> Result<()> {
        trace!(kind = message.kind(), "send");
        self.tx
            .send(message)
            .map_err(|_| TransportError::Disconnected.into())
    }

    fn receive(&mut self) -> Result<Message> {
        let message = match self.timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => TransportError::Timeout(timeout),
                RecvTimeoutError::Disconnected => TransportError::Disconnected,
            })?,
            None => self.rx.recv().map_err(|_| TransportError::Disconnected)?,
        };
        trace!(kind = message.kind(), "receive");
        Ok(message)
    }
}
