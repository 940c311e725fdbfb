use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateType {
    And,
    Or,
    Xor,
    Not,
}

impl GateType {
    pub fn arity(self) -> usize {
        match self {
            GateType::Not => 1,
            _ => 2,
        }
    }

    pub fn eval(self, a: u8, b: u8) -> u8 {
        match self {
            GateType::And => a & b,
            GateType::Or => a | b,
            GateType::Xor => a ^ b,
            GateType::Not => a ^ 1,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Gate {
    pub id: u32,
    #[serde(rename = "type")]
    pub gate_type: GateType,
    #[serde(rename = "in")]
    pub inputs: Vec<u32>,
}

/// Boolean circuit shared by both parties. Gates are evaluated in order.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Circuit {
    pub id: String,
    pub gates: Vec<Gate>,
    #[serde(alias = "alice", default)]
    pub garbler: Vec<u32>,
    #[serde(alias = "bob", default)]
    pub evaluator: Vec<u32>,
    pub out: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CircuitCollection {
    pub name: String,
    pub circuits: Vec<Circuit>,
}

/// The two parties of the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Garbler,
    Evaluator,
}

impl Circuit {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Circuit>> {
        let contents = fs::read_to_string(path)?;
        let collection: CircuitCollection = serde_json::from_str(&contents)?;
        Ok(collection.circuits)
    }

    pub fn load_single<P: AsRef<Path>>(path: P) -> anyhow::Result<Circuit> {
        let contents = fs::read_to_string(path)?;
        let circuit: Circuit = serde_json::from_str(&contents)?;
        Ok(circuit)
    }

    pub fn input_wires(&self, party: Party) -> &[u32] {
        match party {
            Party::Garbler => &self.garbler,
            Party::Evaluator => &self.evaluator,
        }
    }

    /// Input wires in key order: garbler wires, then evaluator wires.
    pub fn all_input_wires(&self) -> impl Iterator<Item = u32> + '_ {
        self.garbler.iter().chain(self.evaluator.iter()).copied()
    }

    /// Checks that every wire is defined once, before it is used, and that
    /// each gate has the right number of inputs.
    pub fn validate(&self) -> Result<()> {
        let mut defined = HashSet::new();
        for wire in self.all_input_wires() {
            if !defined.insert(wire) {
                return Err(malformed(format!("input wire {wire} declared twice")));
            }
        }

        for gate in &self.gates {
            if gate.inputs.len() != gate.gate_type.arity() {
                return Err(malformed(format!(
                    "gate {} ({:?}) expects {} inputs, got {}",
                    gate.id,
                    gate.gate_type,
                    gate.gate_type.arity(),
                    gate.inputs.len()
                )));
            }
            if let Some(wire) = gate.inputs.iter().find(|w| !defined.contains(*w)) {
                return Err(malformed(format!(
                    "gate {} reads wire {wire} before it is defined",
                    gate.id
                )));
            }
            if !defined.insert(gate.id) {
                return Err(malformed(format!("wire {} defined twice", gate.id)));
            }
        }

        if self.out.is_empty() {
            return Err(malformed("circuit has no output wires".to_string()));
        }
        if let Some(wire) = self.out.iter().find(|w| !defined.contains(*w)) {
            return Err(malformed(format!("output wire {wire} is never defined")));
        }
        Ok(())
    }

    /// Evaluates the circuit in the clear. Used to cross-check garbled runs.
    pub fn evaluate_plain(&self, garbler: &[u8], evaluator: &[u8]) -> Result<Vec<u8>> {
        self.validate()?;
        let mut values = std::collections::HashMap::new();
        for (party, bits) in [(Party::Garbler, garbler), (Party::Evaluator, evaluator)] {
            let wires = self.input_wires(party);
            if wires.len() != bits.len() {
                return Err(ConfigError::InputLength {
                    expected: wires.len(),
                    actual: bits.len(),
                }
                .into());
            }
            values.extend(wires.iter().copied().zip(bits.iter().copied()));
        }
        for gate in &self.gates {
            let a = values[&gate.inputs[0]];
            let b = gate.inputs.get(1).map_or(0, |w| values[w]);
            values.insert(gate.id, gate.gate_type.eval(a, b));
        }
        Ok(self.out.iter().map(|w| values[w]).collect())
    }
}

fn malformed(reason: String) -> crate::error::ProtocolError {
    ConfigError::MalformedCircuit(reason).into()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two garbler wires, two evaluator wires, pairwise AND.
    pub(crate) fn pairwise_and_circuit() -> Circuit {
        Circuit {
            id: "pairwise_and".to_string(),
            garbler: vec![1, 2],
            evaluator: vec![3, 4],
            out: vec![5, 6],
            gates: vec![
                Gate {
                    id: 5,
                    gate_type: GateType::And,
                    inputs: vec![1, 3],
                },
                Gate {
                    id: 6,
                    gate_type: GateType::And,
                    inputs: vec![2, 4],
                },
            ],
        }
    }

    #[test]
    fn test_parse_legacy_party_names() {
        let json = r#"{
            "id": "and",
            "alice": [1],
            "bob": [2],
            "out": [3],
            "gates": [{"id": 3, "type": "AND", "in": [1, 2]}]
        }"#;
        let circuit: Circuit = serde_json::from_str(json).unwrap();
        assert_eq!(circuit.garbler, vec![1]);
        assert_eq!(circuit.evaluator, vec![2]);
        assert_eq!(circuit.gates[0].gate_type, GateType::And);
        circuit.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_undefined_wire() {
        let mut circuit = pairwise_and_circuit();
        circuit.gates[0].inputs = vec![1, 9];
        assert!(matches!(
            circuit.validate(),
            Err(crate::error::ProtocolError::Configuration(
                ConfigError::MalformedCircuit(_)
            ))
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_arity() {
        let mut circuit = pairwise_and_circuit();
        circuit.gates[1].gate_type = GateType::Not;
        assert!(circuit.validate().is_err());
    }

    #[test]
    fn test_evaluate_plain() {
        let circuit = pairwise_and_circuit();
        assert_eq!(
            circuit.evaluate_plain(&[1, 0], &[1, 1]).unwrap(),
            vec![1, 0]
        );
    }
}
