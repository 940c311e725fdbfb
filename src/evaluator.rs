use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::channel::{expect_message, Channel};
use crate::circuit::Party;
use crate::error::{Result, StructuralError};
use crate::key::{pack_keys, KEY_SIZE};
use crate::oracle::{check_input_bits, GarbledCircuitOracle};
use crate::ot::OtReceiver;
use crate::state::{abort_on_error, ProtocolState};

/// Party two: receives the garbled circuit, obtains its keys through OT and
/// evaluates.
pub struct Evaluator<O, C, R> {
    oracle: O,
    channel: C,
    ot_receiver: R,
    state: ProtocolState,
}

impl<O, C, R> Evaluator<O, C, R>
where
    O: GarbledCircuitOracle,
    C: Channel,
    R: OtReceiver,
{
    pub fn new(channel: C, ot_receiver: R, oracle: O) -> Self {
        Evaluator {
            oracle,
            channel,
            ot_receiver,
            state: ProtocolState::Idle,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Runs the protocol with the evaluator's input bits and returns the
    /// plaintext output bits.
    #[instrument(level = "info", skip_all, err)]
    pub fn run(&mut self, private_bits: &[u8]) -> Result<Vec<u8>> {
        let Self {
            oracle,
            channel,
            ot_receiver,
            state,
        } = self;
        let protocol_start = Instant::now();

        let output = abort_on_error(state, |state| {
            check_input_bits(private_bits, oracle.number_of_input_wires(Party::Evaluator))?;

            let start = Instant::now();
            let tables = expect_message!(channel, GarbledTables);
            let translation_table = expect_message!(channel, TranslationTable);
            oracle.set_garbled_tables(tables)?;
            oracle.set_translation_table(translation_table)?;
            *state = ProtocolState::TablesExchanged;
            info!(elapsed = ?start.elapsed(), "received garbled tables and translation table");

            let garbler_keys = expect_message!(channel, InputKeys);
            let expected = oracle.number_of_input_wires(Party::Garbler) * KEY_SIZE;
            if garbler_keys.len() != expected {
                return Err(StructuralError::InvalidLength {
                    what: "garbler input keys",
                    expected,
                    actual: garbler_keys.len(),
                }
                .into());
            }
            *state = ProtocolState::InputKeysExchanged;

            let start = Instant::now();
            let own_keys = ot_receiver.transfer(channel, private_bits)?;
            if own_keys.len() != private_bits.len() {
                return Err(StructuralError::InvalidShape {
                    what: "ot output",
                    reason: format!("expected {} keys, got {}", private_bits.len(), own_keys.len()),
                }
                .into());
            }
            *state = ProtocolState::OtComplete;
            info!(elapsed = ?start.elapsed(), "ran ot transfer");

            let start = Instant::now();
            let mut all_inputs = garbler_keys;
            all_inputs.extend(pack_keys(&own_keys));
            oracle.set_inputs(&all_inputs)?;
            let garbled_output = oracle.compute()?;
            let output = oracle.translate(&garbled_output)?;
            *state = ProtocolState::Evaluated;
            debug!(elapsed = ?start.elapsed(), outputs = output.len(), "computed the circuit");

            *state = ProtocolState::Done;
            Ok(output)
        })?;

        info!(elapsed = ?protocol_start.elapsed(), "evaluator finished");
        Ok(output)
    }
}
