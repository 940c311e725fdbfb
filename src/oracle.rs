//! The garbling capability consumed by the orchestrators.

use std::collections::HashMap;

use crate::circuit::Party;
use crate::error::{ConfigError, Result};
use crate::garbled::GarbledTables;
use crate::key::{Key, WireKeys};

/// Everything the garbler learns from garbling one circuit.
#[derive(Clone, Debug)]
pub struct CircuitCreationValues {
    /// Input wires in key order: garbler wires first, then evaluator wires.
    pub input_wires: Vec<u32>,
    pub input_keys: HashMap<u32, WireKeys>,
    /// Signal bit of each input wire's zero key.
    pub input_signal_bits: HashMap<u32, u8>,
    pub output_keys: HashMap<u32, WireKeys>,
    pub translation_table: Vec<u8>,
}

impl CircuitCreationValues {
    /// Keys of `wires`, in the given order.
    pub fn keys_for<'a>(&'a self, wires: &'a [u32]) -> impl Iterator<Item = &'a WireKeys> + 'a {
        wires.iter().map(move |w| &self.input_keys[w])
    }

    /// Picks `keys[w][bit]` for each wire.
    pub fn select_keys(&self, wires: &[u32], bits: &[u8]) -> Vec<Key> {
        self.keys_for(wires)
            .zip(bits)
            .map(|(keys, &bit)| *keys.select(bit))
            .collect()
    }
}

/// A garbled boolean circuit, seen from either party.
///
/// The garbler calls [`garble`](Self::garble) and ships the tables; the
/// evaluator installs the received tables, assigns input keys and computes.
pub trait GarbledCircuitOracle {
    /// Garbles with fresh randomness.
    fn garble(&mut self) -> Result<CircuitCreationValues>;

    /// Garbles deterministically from `seed`. Two calls with the same seed
    /// yield identical keys and tables.
    fn garble_with_seed(&mut self, seed: [u8; 32]) -> Result<CircuitCreationValues>;

    /// Tables produced by the last garbling or installed by the peer.
    fn garbled_tables(&self) -> Result<&GarbledTables>;

    fn translation_table(&self) -> Result<&[u8]>;

    fn set_garbled_tables(&mut self, tables: GarbledTables) -> Result<()>;

    fn set_translation_table(&mut self, table: Vec<u8>) -> Result<()>;

    /// Assigns all input keys: garbler keys then evaluator keys, flat.
    fn set_inputs(&mut self, keys: &[u8]) -> Result<()>;

    /// Evaluates the garbled circuit and returns the flat output keys.
    fn compute(&mut self) -> Result<Vec<u8>>;

    /// Maps flat output keys to plaintext bits.
    fn translate(&self, garbled_output: &[u8]) -> Result<Vec<u8>>;

    fn number_of_input_wires(&self, party: Party) -> usize;

    fn input_wire_indices(&self, party: Party) -> Vec<u32>;

    fn output_wire_indices(&self) -> Vec<u32>;
}

/// Checks that `bits` holds exactly `expected` values, each 0 or 1.
pub fn check_input_bits(bits: &[u8], expected: usize) -> Result<()> {
    if bits.len() != expected {
        return Err(ConfigError::InputLength {
            expected,
            actual: bits.len(),
        }
        .into());
    }
    match bits.iter().position(|bit| *bit > 1) {
        Some(position) => Err(ConfigError::InvalidInputBit {
            position,
            bit: bits[position],
        }
        .into()),
        None => Ok(()),
    }
}
