//! Batched 1-of-2 oblivious transfer of wire keys.

use oblivious_transfer_rs::{Choice, OTReceiver, OTSender};
use std::fmt::Display;
use tracing::{debug, instrument};

use crate::channel::{expect_message, Channel, Message};
use crate::error::{ConfigError, ProtocolError, Result, StructuralError, TransportError};
use crate::key::Key;

/// Sender side: transfers one of `(key0, key1)` per item without learning
/// which.
pub trait OtSender {
    fn transfer<C: Channel>(&mut self, channel: &mut C, inputs: &[(Key, Key)]) -> Result<()>;
}

/// Receiver side: obtains `inputs[i].choices[i]` for every item.
pub trait OtReceiver {
    fn transfer<C: Channel>(&mut self, channel: &mut C, choices: &[u8]) -> Result<Vec<Key>>;
}

fn ot_error(err: impl Display) -> ProtocolError {
    TransportError::ObliviousTransfer(err.to_string()).into()
}

fn check_batch(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StructuralError::InvalidShape {
            what,
            reason: format!("expected {expected} items, got {actual}"),
        }
        .into())
    }
}

/// Runs one RSA based OT instance per pair; the whole batch travels in one
/// message per direction.
#[derive(Debug, Default)]
pub struct RsaOtSender;

impl OtSender for RsaOtSender {
    #[instrument(level = "debug", skip_all, fields(items = inputs.len()), err)]
    fn transfer<C: Channel>(&mut self, channel: &mut C, inputs: &[(Key, Key)]) -> Result<()> {
        let receiver_keys = expect_message!(channel, OtReceiverKeys);
        check_batch("ot receiver keys", inputs.len(), receiver_keys.len())?;

        let mut responses = Vec::with_capacity(inputs.len());
        for ((key0, key1), receiver_pks) in inputs.iter().zip(receiver_keys) {
            let sender = OTSender::new(key0.0.to_vec(), key1.0.to_vec()).map_err(ot_error)?;
            responses.push(sender.encrypt_messages(receiver_pks).map_err(ot_error)?);
        }

        channel.send(Message::OtSenderResponses(responses))?;
        debug!("ot sender done");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RsaOtReceiver;

impl OtReceiver for RsaOtReceiver {
    #[instrument(level = "debug", skip_all, fields(items = choices.len()), err)]
    fn transfer<C: Channel>(&mut self, channel: &mut C, choices: &[u8]) -> Result<Vec<Key>> {
        let mut receivers = Vec::with_capacity(choices.len());
        let mut public_keys = Vec::with_capacity(choices.len());
        for (position, &bit) in choices.iter().enumerate() {
            let choice = match bit {
                0 => Choice::Zero,
                1 => Choice::One,
                _ => return Err(ConfigError::InvalidInputBit { position, bit }.into()),
            };
            let mut receiver = OTReceiver::new(choice);
            public_keys.push(receiver.generate_public_keys().map_err(ot_error)?);
            receivers.push(receiver);
        }
        channel.send(Message::OtReceiverKeys(public_keys))?;

        let responses = expect_message!(channel, OtSenderResponses);
        check_batch("ot sender responses", choices.len(), responses.len())?;

        let mut keys = Vec::with_capacity(choices.len());
        for (receiver, response) in receivers.into_iter().zip(responses) {
            let key_bytes = receiver.decrypt_message(response).map_err(ot_error)?;
            keys.push(Key::from_slice(&key_bytes)?);
        }
        debug!("ot receiver done");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::key::WireKeys;
    use std::thread;

    #[test]
    fn test_receiver_gets_chosen_keys() -> Result<()> {
        let mut rng = rand::thread_rng();
        let pairs: Vec<WireKeys> = (0..2).map(|_| WireKeys::random(&mut rng)).collect();
        let inputs: Vec<(Key, Key)> = pairs.iter().map(|k| (k.zero, k.one)).collect();
        let choices = vec![1u8, 0];

        let (mut sender_channel, mut receiver_channel) = MemoryChannel::pair(None);
        let sender = thread::spawn(move || RsaOtSender.transfer(&mut sender_channel, &inputs));
        let keys = RsaOtReceiver.transfer(&mut receiver_channel, &choices)?;
        sender.join().expect("sender thread panicked")?;

        assert_eq!(keys, vec![pairs[0].one, pairs[1].zero]);
        Ok(())
    }

    #[test]
    fn test_receiver_rejects_non_binary_choice() {
        let (mut channel, _peer) = MemoryChannel::pair(None);
        assert!(matches!(
            RsaOtReceiver.transfer(&mut channel, &[0, 2]),
            Err(ProtocolError::Configuration(ConfigError::InvalidInputBit {
                position: 1,
                bit: 2
            }))
        ));
    }

    #[test]
    fn test_sender_rejects_wrong_message() -> Result<()> {
        let (mut sender_channel, mut peer) = MemoryChannel::pair(None);
        peer.send(Message::InputKeys(vec![]))?;
        let result = RsaOtSender.transfer(&mut sender_channel, &[]);
        assert!(matches!(
            result,
            Err(ProtocolError::Structural(StructuralError::UnexpectedMessage {
                expected: "OtReceiverKeys",
                ..
            }))
        ));
        Ok(())
    }
}
