//! Cut-and-choose over many garbled copies of one circuit.
//!
//! The garbler garbles `num_circuits` copies from independent seeds and
//! commits to each copy's seed, translation mask, input keys and output keys.
//! The evaluator opens `num_checked` copies, regenerates them from their seeds
//! and compares every commitment; it evaluates the remaining copies and
//! requires them to agree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::bundle::CommitmentBundle;
use crate::channel::{expect_message, Channel, Message};
use crate::circuit::Party;
use crate::commitment::{commit, commit_with, CommitmentMsg, DecommitmentMsg, COMMITMENT_SIZE};
use crate::error::{CheatDetected, ConfigError, ProtocolError, Result, StructuralError};
use crate::garbled::GarbledTables;
use crate::key::{pack_keys, unpack_keys, Key};
use crate::oracle::{check_input_bits, CircuitCreationValues, GarbledCircuitOracle};
use crate::ot::{OtReceiver, OtSender};
use crate::package::CommitmentsPackage;
use crate::state::{abort_on_error, ProtocolState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutAndChooseParams {
    /// Total number of garbled copies.
    pub num_circuits: usize,
    /// Copies opened and checked; the rest are evaluated.
    pub num_checked: usize,
    /// Statistical security parameter carried by every commitments package.
    pub security_parameter: usize,
}

impl CutAndChooseParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_checked >= self.num_circuits {
            return Err(ConfigError::InvalidParameter(format!(
                "num_checked ({}) must be smaller than num_circuits ({})",
                self.num_checked, self.num_circuits
            ))
            .into());
        }
        if self.security_parameter == 0 {
            return Err(ConfigError::InvalidParameter(
                "security_parameter must be positive".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn num_evaluated(&self) -> usize {
        self.num_circuits - self.num_checked
    }
}

impl Default for CutAndChooseParams {
    fn default() -> Self {
        CutAndChooseParams {
            num_circuits: 8,
            num_checked: 4,
            security_parameter: 40,
        }
    }
}

/// What the garbler sends for every copy before the selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineCircuit {
    pub tables: GarbledTables,
    pub translation_table: Vec<u8>,
    pub commitments: CommitmentsPackage,
}

/// Opening of a checked copy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CircuitOpening {
    pub index: usize,
    pub seed: [u8; 32],
    pub seed_randomness: [u8; COMMITMENT_SIZE],
}

/// The garbler's selected input keys for an evaluated copy, each with the
/// decommitment of the slot it was committed in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputOpening {
    pub index: usize,
    pub keys: Vec<u8>,
    pub decommitments: Vec<DecommitmentMsg>,
}

/// Commitment material of one copy. Everything but the seed commitment is
/// derived from the seed, so the evaluator can rebuild it after opening.
struct CopyCommitments {
    package: CommitmentsPackage,
    x: CommitmentBundle,
}

fn copy_id_base(index: usize) -> u64 {
    (index as u64) << 32
}

fn commitment_rng(seed: &[u8; 32]) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(b"yao-2pc/commitments");
    hasher.update(seed);
    StdRng::from_seed(hasher.finalize().into())
}

fn commit_copy(
    index: usize,
    seed: &[u8; 32],
    seed_cmt: CommitmentMsg,
    values: &CircuitCreationValues,
    wires: &CopyWires,
    security_parameter: usize,
) -> Result<CopyCommitments> {
    let mut rng = commitment_rng(seed);
    let base = copy_id_base(index);

    let mut package = CommitmentsPackage::new(security_parameter)?;
    package.set_seed_cmt(seed_cmt);

    let mut randomness = [0u8; COMMITMENT_SIZE];
    rng.fill(&mut randomness);
    package.set_mask_cmt(commit_with(base + 1, &values.translation_table, randomness).0);

    let x = CommitmentBundle::commit_wire_keys(&mut rng, base + 2, values.keys_for(&wires.garbler));
    let y2_first_id = base + 2 + 2 * wires.garbler.len() as u64;
    let y2 = CommitmentBundle::commit_wire_keys(
        &mut rng,
        y2_first_id,
        values.keys_for(&wires.evaluator),
    );
    package.set_commitments_x(&x);
    package.set_commitments_y2(&y2);

    let output_keys = pack_keys(
        wires
            .output
            .iter()
            .flat_map(|w| [&values.output_keys[w].zero, &values.output_keys[w].one]),
    );
    rng.fill(&mut randomness);
    package.set_commitments_output_keys(commit_with(0, &output_keys, randomness).0);

    Ok(CopyCommitments { package, x })
}

struct CopyWires {
    garbler: Vec<u32>,
    evaluator: Vec<u32>,
    output: Vec<u32>,
}

impl CopyWires {
    fn of<O: GarbledCircuitOracle>(oracle: &O) -> Self {
        CopyWires {
            garbler: oracle.input_wire_indices(Party::Garbler),
            evaluator: oracle.input_wire_indices(Party::Evaluator),
            output: oracle.output_wire_indices(),
        }
    }
}

struct GarbledCopy {
    seed: [u8; 32],
    seed_decommitment: DecommitmentMsg,
    values: CircuitCreationValues,
    x: CommitmentBundle,
}

/// Garbler side of the cut-and-choose protocol.
pub struct CutAndChooseGarbler<O, C, S> {
    template: O,
    channel: C,
    ot_sender: S,
    params: CutAndChooseParams,
    state: ProtocolState,
}

impl<O, C, S> CutAndChooseGarbler<O, C, S>
where
    O: GarbledCircuitOracle + Clone,
    C: Channel,
    S: OtSender,
{
    pub fn new(channel: C, ot_sender: S, template: O, params: CutAndChooseParams) -> Result<Self> {
        params.validate()?;
        Ok(CutAndChooseGarbler {
            template,
            channel,
            ot_sender,
            params,
            state: ProtocolState::Idle,
        })
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    #[instrument(level = "info", skip_all, fields(circuits = self.params.num_circuits), err)]
    pub fn run(&mut self, private_bits: &[u8]) -> Result<()> {
        let Self {
            template,
            channel,
            ot_sender,
            params,
            state,
        } = self;
        let params = *params;
        let template = &*template;
        let wires = CopyWires::of(template);

        abort_on_error(state, |state| {
            check_input_bits(private_bits, wires.garbler.len())?;

            let start = Instant::now();
            let mut rng = rand::thread_rng();
            let mut copies = Vec::with_capacity(params.num_circuits);
            let mut offline = Vec::with_capacity(params.num_circuits);
            for index in 0..params.num_circuits {
                let mut seed = [0u8; 32];
                rng.fill(&mut seed);
                let (seed_cmt, seed_decommitment) = commit(&mut rng, copy_id_base(index), &seed);

                let mut oracle = template.clone();
                let values = oracle.garble_with_seed(seed)?;
                let commitments = commit_copy(
                    index,
                    &seed,
                    seed_cmt,
                    &values,
                    &wires,
                    params.security_parameter,
                )?;
                offline.push(OfflineCircuit {
                    tables: oracle.garbled_tables()?.clone(),
                    translation_table: values.translation_table.clone(),
                    commitments: commitments.package,
                });
                copies.push(GarbledCopy {
                    seed,
                    seed_decommitment,
                    values,
                    x: commitments.x,
                });
            }
            channel.send(Message::OfflineCircuits(offline))?;
            info!(elapsed = ?start.elapsed(), "garbled and committed all copies");

            let selection = expect_message!(channel, CircuitSelection);
            let checked = validate_selection(&selection, params)?;
            let openings = checked
                .iter()
                .map(|&index| CircuitOpening {
                    index,
                    seed: copies[index].seed,
                    seed_randomness: copies[index].seed_decommitment.randomness,
                })
                .collect();
            channel.send(Message::CircuitOpenings(openings))?;
            *state = ProtocolState::TablesExchanged;

            let evaluated: Vec<usize> = (0..params.num_circuits)
                .filter(|i| !checked.contains(i))
                .collect();
            let mut input_openings = Vec::with_capacity(evaluated.len());
            for &index in &evaluated {
                let copy = &copies[index];
                let keys = copy.values.select_keys(&wires.garbler, private_bits);
                let decommitments = keys
                    .iter()
                    .enumerate()
                    .map(|(position, key)| copy.x.decommitment(position, key.signal_bit()))
                    .collect::<Result<Vec<_>>>()?;
                input_openings.push(InputOpening {
                    index,
                    keys: pack_keys(&keys),
                    decommitments,
                });
            }
            channel.send(Message::InputOpenings(input_openings))?;
            *state = ProtocolState::InputKeysExchanged;

            let pairs: Vec<(Key, Key)> = evaluated
                .iter()
                .flat_map(|&index| copies[index].values.keys_for(&wires.evaluator))
                .map(|keys| (keys.zero, keys.one))
                .collect();
            ot_sender.transfer(channel, &pairs)?;
            *state = ProtocolState::OtComplete;

            *state = ProtocolState::Done;
            Ok(())
        })
    }
}

fn validate_selection(selection: &[usize], params: CutAndChooseParams) -> Result<BTreeSet<usize>> {
    let checked: BTreeSet<usize> = selection.iter().copied().collect();
    let in_range = checked.iter().all(|&i| i < params.num_circuits);
    if checked.len() != selection.len() || selection.len() != params.num_checked || !in_range {
        return Err(StructuralError::InvalidShape {
            what: "circuit selection",
            reason: format!(
                "expected {} distinct indices below {}, got {:?}",
                params.num_checked, params.num_circuits, selection
            ),
        }
        .into());
    }
    Ok(checked)
}

/// Evaluator side of the cut-and-choose protocol.
pub struct CutAndChooseEvaluator<O, C, R> {
    template: O,
    channel: C,
    ot_receiver: R,
    params: CutAndChooseParams,
    state: ProtocolState,
}

impl<O, C, R> CutAndChooseEvaluator<O, C, R>
where
    O: GarbledCircuitOracle + Clone,
    C: Channel,
    R: OtReceiver,
{
    pub fn new(channel: C, ot_receiver: R, template: O, params: CutAndChooseParams) -> Result<Self> {
        params.validate()?;
        Ok(CutAndChooseEvaluator {
            template,
            channel,
            ot_receiver,
            params,
            state: ProtocolState::Idle,
        })
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    #[instrument(level = "info", skip_all, fields(circuits = self.params.num_circuits), err)]
    pub fn run(&mut self, private_bits: &[u8]) -> Result<Vec<u8>> {
        let Self {
            template,
            channel,
            ot_receiver,
            params,
            state,
        } = self;
        let params = *params;
        let template = &*template;
        let wires = CopyWires::of(template);

        abort_on_error(state, |state| {
            check_input_bits(private_bits, wires.evaluator.len())?;

            let offline = expect_message!(channel, OfflineCircuits);
            if offline.len() != params.num_circuits {
                return Err(StructuralError::InvalidShape {
                    what: "offline circuits",
                    reason: format!("expected {} copies, got {}", params.num_circuits, offline.len()),
                }
                .into());
            }
            for (index, copy) in offline.iter().enumerate() {
                check_package_shape(index, &copy.commitments, &wires, params)?;
            }

            let mut selection =
                rand::seq::index::sample(&mut rand::thread_rng(), params.num_circuits, params.num_checked)
                    .into_vec();
            selection.sort_unstable();
            channel.send(Message::CircuitSelection(selection.clone()))?;

            let start = Instant::now();
            let openings = expect_message!(channel, CircuitOpenings);
            let opened: Vec<usize> = openings.iter().map(|o| o.index).collect();
            if opened != selection {
                return Err(StructuralError::InvalidShape {
                    what: "circuit openings",
                    reason: format!("expected copies {selection:?}, got {opened:?}"),
                }
                .into());
            }
            for opening in &openings {
                check_opened_copy(template, &wires, params, opening, &offline[opening.index])?;
            }
            *state = ProtocolState::TablesExchanged;
            info!(elapsed = ?start.elapsed(), checked = openings.len(), "checked opened copies");

            let evaluated: Vec<usize> = (0..params.num_circuits)
                .filter(|i| selection.binary_search(i).is_err())
                .collect();
            let input_openings = expect_message!(channel, InputOpenings);
            let indices: Vec<usize> = input_openings.iter().map(|o| o.index).collect();
            if indices != evaluated {
                return Err(StructuralError::InvalidShape {
                    what: "input openings",
                    reason: format!("expected copies {evaluated:?}, got {indices:?}"),
                }
                .into());
            }
            let garbler_keys = input_openings
                .iter()
                .map(|opening| {
                    check_input_opening(&wires, opening, &offline[opening.index].commitments)
                })
                .collect::<Result<Vec<_>>>()?;
            *state = ProtocolState::InputKeysExchanged;

            let choices: Vec<u8> = evaluated
                .iter()
                .flat_map(|_| private_bits.iter().copied())
                .collect();
            let own_keys = ot_receiver.transfer(channel, &choices)?;
            if own_keys.len() != choices.len() {
                return Err(StructuralError::InvalidShape {
                    what: "ot output",
                    reason: format!("expected {} keys, got {}", choices.len(), own_keys.len()),
                }
                .into());
            }
            *state = ProtocolState::OtComplete;

            let mut output: Option<Vec<u8>> = None;
            let per_copy = wires.evaluator.len();
            for (position, &index) in evaluated.iter().enumerate() {
                let copy = &offline[index];
                let mut oracle = template.clone();
                oracle.set_garbled_tables(copy.tables.clone())?;
                oracle.set_translation_table(copy.translation_table.clone())?;

                let own = &own_keys[position * per_copy..(position + 1) * per_copy];
                let mut inputs = pack_keys(&garbler_keys[position]);
                inputs.extend(pack_keys(own));
                oracle.set_inputs(&inputs)?;
                let garbled_output = oracle.compute()?;
                let result = oracle.translate(&garbled_output)?;
                debug!(copy = index, "evaluated copy");

                if let Some(previous) = &output {
                    if *previous != result {
                        return Err(CheatDetected::InconsistentOutputs.into());
                    }
                } else {
                    output = Some(result);
                }
            }
            *state = ProtocolState::Evaluated;

            *state = ProtocolState::Done;
            output.ok_or_else(|| {
                ConfigError::InvalidParameter("no circuit left to evaluate".to_string()).into()
            })
        })
    }
}

/// Checks a received package before anything in it is compared or opened.
/// Malformed peer data is reported as a structural error.
fn check_package_shape(
    index: usize,
    package: &CommitmentsPackage,
    wires: &CopyWires,
    params: CutAndChooseParams,
) -> Result<()> {
    let invalid = |reason: String| -> ProtocolError {
        StructuralError::InvalidShape {
            what: "commitments package",
            reason: format!("copy {index}: {reason}"),
        }
        .into()
    };

    if package.security_parameter() != params.security_parameter {
        return Err(invalid(format!(
            "security parameter {} instead of {}",
            package.security_parameter(),
            params.security_parameter
        )));
    }
    let seed_cmt = package.seed_cmt().map_err(|err| invalid(err.to_string()))?;
    if seed_cmt.id != copy_id_base(index) {
        return Err(invalid(format!("seed commitment has id {}", seed_cmt.id)));
    }
    package.mask_cmt().map_err(|err| invalid(err.to_string()))?;
    package
        .commitments_output_keys()
        .map_err(|err| invalid(err.to_string()))?;

    for (what, bundle, expected) in [
        ("X", package.commitments_x(), wires.garbler.len()),
        ("Y2", package.commitments_y2(), wires.evaluator.len()),
    ] {
        let bundle = bundle.map_err(|err| invalid(format!("{what}: {err}")))?;
        if bundle.num_wires() != expected {
            return Err(invalid(format!(
                "{what} covers {} wires instead of {expected}",
                bundle.num_wires()
            )));
        }
    }
    Ok(())
}

/// Regenerates an opened copy from its seed and compares it with what the
/// garbler sent.
fn check_opened_copy<O: GarbledCircuitOracle + Clone>(
    template: &O,
    wires: &CopyWires,
    params: CutAndChooseParams,
    opening: &CircuitOpening,
    received: &OfflineCircuit,
) -> Result<()> {
    let circuit = opening.index;
    let mismatch = |what| CheatDetected::CircuitMismatch { circuit, what };

    let seed_cmt = received.commitments.seed_cmt()?;
    let seed_decommitment = DecommitmentMsg {
        randomness: opening.seed_randomness,
        value: opening.seed.to_vec(),
    };
    if !seed_decommitment.verify(&seed_cmt) {
        return Err(mismatch("seed commitment").into());
    }

    let mut oracle = template.clone();
    let values = oracle.garble_with_seed(opening.seed)?;
    if oracle.garbled_tables()? != &received.tables {
        return Err(mismatch("garbled tables").into());
    }
    if values.translation_table != received.translation_table {
        return Err(mismatch("translation table").into());
    }

    let expected = commit_copy(
        circuit,
        &opening.seed,
        seed_cmt,
        &values,
        wires,
        params.security_parameter,
    )?
    .package;
    let commitments = &received.commitments;
    expected
        .commitments_x()?
        .verify_equal(&commitments.commitments_x()?)?;
    expected
        .commitments_y2()?
        .verify_equal(&commitments.commitments_y2()?)?;
    if expected.mask_cmt()? != commitments.mask_cmt()? {
        return Err(mismatch("mask commitment").into());
    }
    if expected.commitments_output_keys()? != commitments.commitments_output_keys()? {
        return Err(mismatch("output keys commitment").into());
    }
    debug!(copy = circuit, "opened copy is consistent");
    Ok(())
}

/// Checks the garbler's keys for an evaluated copy against its `X`
/// commitments and returns them.
fn check_input_opening(
    wires: &CopyWires,
    opening: &InputOpening,
    commitments: &CommitmentsPackage,
) -> Result<Vec<Key>> {
    let keys = unpack_keys(&opening.keys, wires.garbler.len(), "garbler input keys")?;
    if opening.decommitments.len() != keys.len() {
        return Err(StructuralError::InvalidShape {
            what: "input decommitments",
            reason: format!(
                "expected {} decommitments, got {}",
                keys.len(),
                opening.decommitments.len()
            ),
        }
        .into());
    }

    let x = commitments.commitments_x()?;
    for (wire, (key, decommitment)) in keys.iter().zip(&opening.decommitments).enumerate() {
        let sigma = key.signal_bit();
        if decommitment.value != key.0 {
            return Err(CheatDetected::InvalidDecommitment { wire, sigma }.into());
        }
        x.verify_opening(wire, sigma, decommitment)?;
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::circuit::tests::pairwise_and_circuit;
    use crate::error::ProtocolError;
    use crate::garbled::GarbledCircuit;
    use crate::mock::create_mock_ot_pair;
    use std::thread;

    fn params() -> CutAndChooseParams {
        CutAndChooseParams {
            num_circuits: 6,
            num_checked: 3,
            security_parameter: 4,
        }
    }

    #[test]
    fn test_honest_run() -> Result<()> {
        let (garbler_channel, evaluator_channel) = MemoryChannel::pair(None);
        let (ot_sender, ot_receiver) = create_mock_ot_pair();
        let template = GarbledCircuit::new(pairwise_and_circuit());

        let garbler_template = template.clone();
        let garbler = thread::spawn(move || {
            CutAndChooseGarbler::new(garbler_channel, ot_sender, garbler_template, params())?
                .run(&[1, 0])
        });
        let mut evaluator =
            CutAndChooseEvaluator::new(evaluator_channel, ot_receiver, template, params())?;
        let output = evaluator.run(&[1, 1])?;
        garbler.join().expect("garbler thread panicked")?;

        assert_eq!(output, vec![1, 0]);
        assert_eq!(evaluator.state(), ProtocolState::Done);
        Ok(())
    }

    #[test]
    fn test_params_validation() {
        let mut p = params();
        p.num_checked = p.num_circuits;
        assert!(p.validate().is_err());
        p.num_checked = 0;
        p.security_parameter = 0;
        assert!(p.validate().is_err());
        assert!(CutAndChooseParams::default().validate().is_ok());
    }

    #[test]
    fn test_selection_validation() {
        let p = params();
        assert!(validate_selection(&[0, 2, 5], p).is_ok());
        assert!(validate_selection(&[0, 0, 5], p).is_err());
        assert!(validate_selection(&[0, 2, 6], p).is_err());
        assert!(validate_selection(&[0, 2], p).is_err());
    }

    fn garble_copy(
        template: &GarbledCircuit,
        index: usize,
    ) -> Result<(OfflineCircuit, CircuitOpening, CopyCommitments, CircuitCreationValues)> {
        let mut rng = rand::thread_rng();
        let seed: [u8; 32] = rng.gen();
        let (seed_cmt, seed_decommitment) = commit(&mut rng, copy_id_base(index), &seed);
        let mut oracle = template.clone();
        let values = oracle.garble_with_seed(seed)?;
        let wires = CopyWires::of(template);
        let commitments = commit_copy(index, &seed, seed_cmt, &values, &wires, 2)?;
        let offline = OfflineCircuit {
            tables: oracle.garbled_tables()?.clone(),
            translation_table: values.translation_table.clone(),
            commitments: commitments.package.clone(),
        };
        let opening = CircuitOpening {
            index,
            seed,
            seed_randomness: seed_decommitment.randomness,
        };
        Ok((offline, opening, commitments, values))
    }

    #[test]
    fn test_opened_copy_consistency() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let mut p = params();
        p.security_parameter = 2;
        let (offline, opening, _, _) = garble_copy(&template, 3)?;
        check_opened_copy(&template, &wires, p, &opening, &offline)
    }

    #[test]
    fn test_inconsistent_x_commitments_are_caught() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let mut p = params();
        p.security_parameter = 2;
        let (mut offline, opening, _, _) = garble_copy(&template, 1)?;

        // Swap in the X commitments of an unrelated copy.
        let (other, _, _, _) = garble_copy(&template, 1)?;
        offline
            .commitments
            .set_commitments_x(&other.commitments.commitments_x()?);

        assert!(matches!(
            check_opened_copy(&template, &wires, p, &opening, &offline),
            Err(ProtocolError::Cheat(CheatDetected::CommitmentMismatch { wire: 0, sigma: 0, .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_wrong_seed_is_caught() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let mut p = params();
        p.security_parameter = 2;
        let (offline, mut opening, _, _) = garble_copy(&template, 0)?;
        opening.seed[0] ^= 1;
        assert!(matches!(
            check_opened_copy(&template, &wires, p, &opening, &offline),
            Err(ProtocolError::Cheat(CheatDetected::CircuitMismatch {
                circuit: 0,
                what: "seed commitment"
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_input_opening_checks_decommitments() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let (offline, _, commitments, values) = garble_copy(&template, 2)?;

        let keys = values.select_keys(&wires.garbler, &[0, 1]);
        let decommitments = keys
            .iter()
            .enumerate()
            .map(|(w, k)| commitments.x.decommitment(w, k.signal_bit()))
            .collect::<Result<Vec<_>>>()?;
        let mut opening = InputOpening {
            index: 2,
            keys: pack_keys(&keys),
            decommitments,
        };
        assert_eq!(check_input_opening(&wires, &opening, &offline.commitments)?, keys);

        // A key for the other value does not open the committed slot.
        let other = values.select_keys(&wires.garbler, &[1, 1]);
        opening.keys = pack_keys(&other);
        assert!(matches!(
            check_input_opening(&wires, &opening, &offline.commitments),
            Err(ProtocolError::Cheat(CheatDetected::InvalidDecommitment { wire: 0, .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_package_shape_of_honest_copy() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let mut p = params();
        p.security_parameter = 2;
        let (offline, _, _, _) = garble_copy(&template, 4)?;
        check_package_shape(4, &offline.commitments, &wires, p)
    }

    #[test]
    fn test_truncated_x_bundle_is_structural() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let mut p = params();
        p.security_parameter = 2;
        let (mut offline, _, _, values) = garble_copy(&template, 1)?;

        let one_wire = CommitmentBundle::commit_wire_keys(
            &mut rand::thread_rng(),
            copy_id_base(1) + 2,
            values.keys_for(&wires.garbler[..1]),
        );
        offline.commitments.set_commitments_x(&one_wire);

        let err = check_package_shape(1, &offline.commitments, &wires, p).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Structural(StructuralError::InvalidShape { what: "commitments package", .. })
        ));
        assert!(err.is_adversarial());
        Ok(())
    }

    #[test]
    fn test_package_with_foreign_parameters_is_structural() -> Result<()> {
        let template = GarbledCircuit::new(pairwise_and_circuit());
        let wires = CopyWires::of(&template);
        let (offline, _, _, _) = garble_copy(&template, 1)?;

        // Built with s = 2.
        assert!(matches!(
            check_package_shape(1, &offline.commitments, &wires, params()),
            Err(ProtocolError::Structural(_))
        ));

        // Seed commitment id belongs to copy 1.
        let mut p = params();
        p.security_parameter = 2;
        assert!(matches!(
            check_package_shape(0, &offline.commitments, &wires, p),
            Err(ProtocolError::Structural(_))
        ));
        Ok(())
    }
}
