use std::time::Instant;
use tracing::{info, instrument};

use crate::channel::{Channel, Message};
use crate::circuit::Party;
use crate::error::Result;
use crate::key::{pack_keys, Key};
use crate::oracle::{check_input_bits, GarbledCircuitOracle};
use crate::ot::OtSender;
use crate::state::{abort_on_error, ProtocolState};

/// Party one: garbles the circuit, sends tables and its own input keys, and
/// acts as OT sender for the evaluator's keys.
pub struct Garbler<O, C, S> {
    oracle: O,
    channel: C,
    ot_sender: S,
    state: ProtocolState,
}

impl<O, C, S> Garbler<O, C, S>
where
    O: GarbledCircuitOracle,
    C: Channel,
    S: OtSender,
{
    pub fn new(channel: C, ot_sender: S, oracle: O) -> Self {
        Garbler {
            oracle,
            channel,
            ot_sender,
            state: ProtocolState::Idle,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Runs the protocol with the garbler's input bits, one per input wire.
    #[instrument(level = "info", skip_all, err)]
    pub fn run(&mut self, private_bits: &[u8]) -> Result<()> {
        let Self {
            oracle,
            channel,
            ot_sender,
            state,
        } = self;
        let protocol_start = Instant::now();

        abort_on_error(state, |state| {
            let garbler_wires = oracle.input_wire_indices(Party::Garbler);
            check_input_bits(private_bits, garbler_wires.len())?;

            let start = Instant::now();
            let values = oracle.garble()?;
            info!(elapsed = ?start.elapsed(), "garbled the circuit");

            // The evaluator checks the tables before it sees any key.
            let start = Instant::now();
            channel.send(Message::GarbledTables(oracle.garbled_tables()?.clone()))?;
            channel.send(Message::TranslationTable(
                oracle.translation_table()?.to_vec(),
            ))?;
            *state = ProtocolState::TablesExchanged;
            info!(elapsed = ?start.elapsed(), "sent garbled tables and translation table");

            let own_keys = values.select_keys(&garbler_wires, private_bits);
            channel.send(Message::InputKeys(pack_keys(&own_keys)))?;
            *state = ProtocolState::InputKeysExchanged;

            let start = Instant::now();
            let evaluator_wires = oracle.input_wire_indices(Party::Evaluator);
            let pairs: Vec<(Key, Key)> = values
                .keys_for(&evaluator_wires)
                .map(|keys| (keys.zero, keys.one))
                .collect();
            ot_sender.transfer(channel, &pairs)?;
            *state = ProtocolState::OtComplete;
            info!(elapsed = ?start.elapsed(), "ran ot transfer");

            *state = ProtocolState::Done;
            Ok(())
        })?;

        info!(elapsed = ?protocol_start.elapsed(), "garbler finished");
        Ok(())
    }
}
