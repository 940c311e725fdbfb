use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

use crate::circuit::{Circuit, Gate, Party};
use crate::error::{CheatDetected, ConfigError, ProtocolError, Result, StructuralError};
use crate::key::{pack_keys, unpack_keys, Key, WireKeys, KEY_SIZE};
use crate::oracle::{CircuitCreationValues, GarbledCircuitOracle};

// AES-GCM appends a 16 byte tag to every encrypted key.
const ROW_SIZE: usize = KEY_SIZE + 16;

/// Encrypted rows of one gate, indexed by the signal bits of its input keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledGate {
    pub id: u32,
    pub rows: Vec<Vec<u8>>,
}

impl GarbledGate {
    fn garble(gate: &Gate, keys: &HashMap<u32, WireKeys>) -> Self {
        let output_keys = &keys[&gate.id];
        let arity = gate.gate_type.arity();
        let mut rows = vec![Vec::new(); 1 << arity];

        for a_bit in 0..2 {
            for b_bit in 0..(arity as u8) {
                let key_a = keys[&gate.inputs[0]].select(a_bit);
                let mut inputs = vec![key_a];
                let mut row = key_a.signal_bit() as usize;
                if arity == 2 {
                    let key_b = keys[&gate.inputs[1]].select(b_bit);
                    inputs.push(key_b);
                    row = (row << 1) | key_b.signal_bit() as usize;
                }
                let output_key = output_keys.select(gate.gate_type.eval(a_bit, b_bit));
                rows[row] = row_key(gate.id, &inputs).encrypt(&output_key.0);
            }
        }

        GarbledGate { id: gate.id, rows }
    }

    fn evaluate(&self, inputs: &[&Key]) -> Result<Key> {
        let row = inputs
            .iter()
            .fold(0usize, |acc, key| (acc << 1) | key.signal_bit() as usize);
        let plaintext = row_key(self.id, inputs)
            .decrypt(&self.rows[row])
            .ok_or(CheatDetected::CorruptGarbledTable { gate: self.id })?;
        Key::from_slice(&plaintext)
            .map_err(|_| CheatDetected::CorruptGarbledTable { gate: self.id }.into())
    }
}

/// The garbled tables of a whole circuit, in gate order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledTables {
    pub gates: Vec<GarbledGate>,
}

fn row_key(gate_id: u32, inputs: &[&Key]) -> Key {
    let mut hasher = Sha256::new();
    hasher.update(gate_id.to_le_bytes());
    for key in inputs {
        hasher.update(key.0);
    }
    let digest = hasher.finalize();
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest[..KEY_SIZE]);
    Key(key)
}

/// Point-and-permute garbling of a [`Circuit`].
#[derive(Clone, Debug)]
pub struct GarbledCircuit {
    pub circuit: Circuit,
    tables: Option<GarbledTables>,
    translation_table: Option<Vec<u8>>,
    inputs: Option<Vec<Key>>,
}

impl GarbledCircuit {
    pub fn new(circuit: Circuit) -> Self {
        GarbledCircuit {
            circuit,
            tables: None,
            translation_table: None,
            inputs: None,
        }
    }

    fn garble_with_rng<R: Rng>(&mut self, rng: &mut R) -> Result<CircuitCreationValues> {
        self.circuit.validate()?;

        // Wires are keyed in definition order so seeded garbling is reproducible.
        let mut keys = HashMap::new();
        for wire in self.circuit.all_input_wires() {
            keys.insert(wire, WireKeys::random(rng));
        }
        for gate in &self.circuit.gates {
            keys.insert(gate.id, WireKeys::random(rng));
        }

        let gates = self
            .circuit
            .gates
            .iter()
            .map(|gate| GarbledGate::garble(gate, &keys))
            .collect();
        let translation_table: Vec<u8> = self
            .circuit
            .out
            .iter()
            .map(|w| keys[w].signal_bit())
            .collect();

        let input_wires: Vec<u32> = self.circuit.all_input_wires().collect();
        let input_keys: HashMap<u32, WireKeys> =
            input_wires.iter().map(|w| (*w, keys[w])).collect();
        let input_signal_bits = input_keys
            .iter()
            .map(|(w, k)| (*w, k.signal_bit()))
            .collect();
        let output_keys = self.circuit.out.iter().map(|w| (*w, keys[w])).collect();

        debug!(
            circuit = %self.circuit.id,
            gates = self.circuit.gates.len(),
            "garbled circuit"
        );
        self.tables = Some(GarbledTables { gates });
        self.translation_table = Some(translation_table.clone());

        Ok(CircuitCreationValues {
            input_wires,
            input_keys,
            input_signal_bits,
            output_keys,
            translation_table,
        })
    }

    /// Evaluate all gates given the input wire keys.
    pub fn evaluate_gates(&self, mut wire_values: HashMap<u32, Key>) -> Result<HashMap<u32, Key>> {
        let tables = self.garbled_tables()?;
        for (gate, garbled) in self.circuit.gates.iter().zip(&tables.gates) {
            let inputs = gate
                .inputs
                .iter()
                .map(|w| {
                    wire_values.get(w).ok_or_else(|| {
                        ConfigError::MalformedCircuit(format!("gate {} reads unset wire {w}", gate.id))
                    })
                })
                .collect::<std::result::Result<Vec<&Key>, _>>()?;
            let output = garbled.evaluate(&inputs)?;
            wire_values.insert(gate.id, output);
        }
        Ok(wire_values)
    }

    fn shape_error(reason: String) -> ProtocolError {
        StructuralError::InvalidShape {
            what: "garbled tables",
            reason,
        }
        .into()
    }
}

impl GarbledCircuitOracle for GarbledCircuit {
    fn garble(&mut self) -> Result<CircuitCreationValues> {
        self.garble_with_rng(&mut rand::thread_rng())
    }

    fn garble_with_seed(&mut self, seed: [u8; 32]) -> Result<CircuitCreationValues> {
        self.garble_with_rng(&mut StdRng::from_seed(seed))
    }

    fn garbled_tables(&self) -> Result<&GarbledTables> {
        self.tables
            .as_ref()
            .ok_or_else(|| ConfigError::MissingComponent("garbled tables").into())
    }

    fn translation_table(&self) -> Result<&[u8]> {
        self.translation_table
            .as_deref()
            .ok_or_else(|| ConfigError::MissingComponent("translation table").into())
    }

    fn set_garbled_tables(&mut self, tables: GarbledTables) -> Result<()> {
        self.circuit.validate()?;
        if tables.gates.len() != self.circuit.gates.len() {
            return Err(Self::shape_error(format!(
                "expected {} gates, got {}",
                self.circuit.gates.len(),
                tables.gates.len()
            )));
        }
        for (gate, garbled) in self.circuit.gates.iter().zip(&tables.gates) {
            let rows = 1 << gate.gate_type.arity();
            if garbled.id != gate.id {
                return Err(Self::shape_error(format!(
                    "expected gate {}, got gate {}",
                    gate.id, garbled.id
                )));
            }
            if garbled.rows.len() != rows || garbled.rows.iter().any(|r| r.len() != ROW_SIZE) {
                return Err(Self::shape_error(format!(
                    "gate {} must have {rows} rows of {ROW_SIZE} bytes",
                    gate.id
                )));
            }
        }
        self.tables = Some(tables);
        Ok(())
    }

    fn set_translation_table(&mut self, table: Vec<u8>) -> Result<()> {
        if table.len() != self.circuit.out.len() {
            return Err(StructuralError::InvalidLength {
                what: "translation table",
                expected: self.circuit.out.len(),
                actual: table.len(),
            }
            .into());
        }
        if table.iter().any(|b| *b > 1) {
            return Err(StructuralError::InvalidShape {
                what: "translation table",
                reason: "entries must be 0 or 1".to_string(),
            }
            .into());
        }
        self.translation_table = Some(table);
        Ok(())
    }

    fn set_inputs(&mut self, keys: &[u8]) -> Result<()> {
        if keys.len() % KEY_SIZE != 0 {
            return Err(StructuralError::InvalidLength {
                what: "input keys",
                expected: keys.len() / KEY_SIZE * KEY_SIZE,
                actual: keys.len(),
            }
            .into());
        }
        self.inputs = Some(unpack_keys(keys, keys.len() / KEY_SIZE, "input keys")?);
        Ok(())
    }

    fn compute(&mut self) -> Result<Vec<u8>> {
        let expected = self.circuit.garbler.len() + self.circuit.evaluator.len();
        let actual = self.inputs.as_ref().map_or(0, Vec::len);
        let inputs = match &self.inputs {
            Some(inputs) if inputs.len() == expected => inputs,
            _ => return Err(ProtocolError::IncompleteInput { expected, actual }),
        };

        let wire_values = self.circuit.all_input_wires().zip(inputs.iter().copied()).collect();
        let wire_values = self.evaluate_gates(wire_values)?;
        Ok(pack_keys(self.circuit.out.iter().map(|w| &wire_values[w])))
    }

    fn translate(&self, garbled_output: &[u8]) -> Result<Vec<u8>> {
        let table = self.translation_table()?;
        let keys = unpack_keys(garbled_output, table.len(), "garbled output")?;
        Ok(keys
            .iter()
            .zip(table)
            .map(|(key, mask)| key.signal_bit() ^ mask)
            .collect())
    }

    fn number_of_input_wires(&self, party: Party) -> usize {
        self.circuit.input_wires(party).len()
    }

    fn input_wire_indices(&self, party: Party) -> Vec<u32> {
        self.circuit.input_wires(party).to_vec()
    }

    fn output_wire_indices(&self) -> Vec<u32> {
        self.circuit.out.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::tests::pairwise_and_circuit;
    use crate::circuit::GateType;

    fn single_gate_circuit(gate_type: GateType) -> Circuit {
        let inputs = if gate_type == GateType::Not {
            vec![1]
        } else {
            vec![1, 2]
        };
        Circuit {
            id: format!("{gate_type:?}"),
            garbler: vec![1],
            evaluator: vec![2],
            out: vec![3],
            gates: vec![Gate {
                id: 3,
                gate_type,
                inputs,
            }],
        }
    }

    fn run_locally(circuit: &Circuit, garbler: &[u8], evaluator: &[u8]) -> Result<Vec<u8>> {
        let mut garbled = GarbledCircuit::new(circuit.clone());
        let values = garbled.garble()?;
        let mut keys = values.select_keys(&circuit.garbler, garbler);
        keys.extend(values.select_keys(&circuit.evaluator, evaluator));

        let mut evaluating = GarbledCircuit::new(circuit.clone());
        evaluating.set_garbled_tables(garbled.garbled_tables()?.clone())?;
        evaluating.set_translation_table(values.translation_table.clone())?;
        evaluating.set_inputs(&pack_keys(&keys))?;
        let output = evaluating.compute()?;
        evaluating.translate(&output)
    }

    #[test]
    fn test_every_gate_type_matches_truth_table() -> Result<()> {
        for gate_type in [GateType::And, GateType::Or, GateType::Xor, GateType::Not] {
            let circuit = single_gate_circuit(gate_type);
            for a in 0..2 {
                for b in 0..2 {
                    let expected = circuit.evaluate_plain(&[a], &[b])?;
                    assert_eq!(
                        run_locally(&circuit, &[a], &[b])?,
                        expected,
                        "{gate_type:?}({a}, {b})"
                    );
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_seeded_garbling_is_deterministic() -> Result<()> {
        let mut first = GarbledCircuit::new(pairwise_and_circuit());
        let mut second = GarbledCircuit::new(pairwise_and_circuit());
        let a = first.garble_with_seed([7u8; 32])?;
        let b = second.garble_with_seed([7u8; 32])?;
        assert_eq!(a.input_keys, b.input_keys);
        assert_eq!(a.translation_table, b.translation_table);
        assert_eq!(first.garbled_tables()?, second.garbled_tables()?);
        Ok(())
    }

    #[test]
    fn test_input_signal_bits_match_zero_keys() -> Result<()> {
        let values = GarbledCircuit::new(pairwise_and_circuit()).garble()?;
        assert_eq!(values.input_wires, vec![1, 2, 3, 4]);
        for (wire, keys) in &values.input_keys {
            assert_eq!(values.input_signal_bits[wire], keys.zero.signal_bit());
        }
        Ok(())
    }

    #[test]
    fn test_compute_without_all_inputs() -> Result<()> {
        let circuit = pairwise_and_circuit();
        let mut garbled = GarbledCircuit::new(circuit.clone());
        let values = garbled.garble()?;
        let keys = values.select_keys(&circuit.garbler, &[1, 0]);
        garbled.set_inputs(&pack_keys(&keys))?;
        assert!(matches!(
            garbled.compute(),
            Err(ProtocolError::IncompleteInput {
                expected: 4,
                actual: 2
            })
        ));
        Ok(())
    }

    #[test]
    fn test_tampered_row_is_detected() -> Result<()> {
        let circuit = single_gate_circuit(GateType::And);
        let mut garbled = GarbledCircuit::new(circuit.clone());
        let values = garbled.garble()?;
        let mut tables = garbled.garbled_tables()?.clone();
        for row in &mut tables.gates[0].rows {
            row[0] ^= 0xff;
        }

        let mut evaluating = GarbledCircuit::new(circuit.clone());
        evaluating.set_garbled_tables(tables)?;
        evaluating.set_translation_table(values.translation_table.clone())?;
        let mut keys = values.select_keys(&circuit.garbler, &[1]);
        keys.extend(values.select_keys(&circuit.evaluator, &[1]));
        evaluating.set_inputs(&pack_keys(&keys))?;
        assert!(matches!(
            evaluating.compute(),
            Err(ProtocolError::Cheat(CheatDetected::CorruptGarbledTable { gate: 3 }))
        ));
        Ok(())
    }

    #[test]
    fn test_set_garbled_tables_rejects_wrong_shape() -> Result<()> {
        let mut garbled = GarbledCircuit::new(pairwise_and_circuit());
        garbled.garble()?;
        let mut tables = garbled.garbled_tables()?.clone();
        tables.gates.pop();
        let mut evaluating = GarbledCircuit::new(pairwise_and_circuit());
        assert!(matches!(
            evaluating.set_garbled_tables(tables),
            Err(ProtocolError::Structural(StructuralError::InvalidShape { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_garble_rejects_malformed_circuit() {
        let mut circuit = pairwise_and_circuit();
        circuit.out.push(42);
        assert!(matches!(
            GarbledCircuit::new(circuit).garble(),
            Err(ProtocolError::Configuration(ConfigError::MalformedCircuit(_)))
        ));
    }

    #[test]
    fn test_evaluating_side_rejects_malformed_circuit() -> Result<()> {
        let mut garbled = GarbledCircuit::new(pairwise_and_circuit());
        garbled.garble()?;
        let tables = garbled.garbled_tables()?.clone();

        // Same shape as the garbler's, but gate 5 reads a wire nobody defines.
        let mut circuit = pairwise_and_circuit();
        circuit.gates[0].inputs = vec![1, 9];
        let mut evaluating = GarbledCircuit::new(circuit);
        assert!(matches!(
            evaluating.set_garbled_tables(tables),
            Err(ProtocolError::Configuration(ConfigError::MalformedCircuit(_)))
        ));
        assert!(evaluating.compute().is_err());
        Ok(())
    }
}
