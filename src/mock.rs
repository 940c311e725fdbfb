//! Ideal OT functionality for tests and local runs. The pairs travel over a
//! side queue, so nothing is hidden from the receiver's process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::channel::Channel;
use crate::error::{ConfigError, Result, StructuralError, TransportError};
use crate::key::Key;
use crate::ot::{OtReceiver, OtSender};

pub fn create_mock_ot_pair() -> (MockOtSender, MockOtReceiver) {
    let (tx, rx) = mpsc::channel();
    let calls = Arc::new(AtomicUsize::new(0));
    (
        MockOtSender {
            tx,
            calls: calls.clone(),
        },
        MockOtReceiver {
            rx: Arc::new(Mutex::new(rx)),
            calls,
        },
    )
}

pub struct MockOtSender {
    tx: mpsc::Sender<Vec<(Key, Key)>>,
    calls: Arc<AtomicUsize>,
}

impl OtSender for MockOtSender {
    fn transfer<C: Channel>(&mut self, _channel: &mut C, inputs: &[(Key, Key)]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tx
            .send(inputs.to_vec())
            .map_err(|_| TransportError::Disconnected.into())
    }
}

#[derive(Clone)]
pub struct MockOtReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Vec<(Key, Key)>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockOtReceiver {
    /// Number of `transfer` calls made on either side of the pair.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OtReceiver for MockOtReceiver {
    fn transfer<C: Channel>(&mut self, _channel: &mut C, choices: &[u8]) -> Result<Vec<Key>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pairs = self
            .rx
            .lock()
            .map_err(|_| TransportError::Disconnected)?
            .recv()
            .map_err(|_| TransportError::Disconnected)?;
        if pairs.len() != choices.len() {
            return Err(StructuralError::InvalidShape {
                what: "ot batch",
                reason: format!("expected {} items, got {}", choices.len(), pairs.len()),
            }
            .into());
        }
        pairs
            .iter()
            .zip(choices)
            .enumerate()
            .map(|(position, ((key0, key1), &bit))| match bit {
                0 => Ok(*key0),
                1 => Ok(*key1),
                _ => Err(ConfigError::InvalidInputBit { position, bit }.into()),
            })
            .collect()
    }
}
