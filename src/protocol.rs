//! Runs both parties in one process, each on its own thread, connected by a
//! [`MemoryChannel`].

use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use crate::channel::MemoryChannel;
use crate::circuit::Circuit;
use crate::cut_and_choose::{CutAndChooseEvaluator, CutAndChooseGarbler, CutAndChooseParams};
use crate::error::{ProtocolError, Result, TransportError};
use crate::evaluator::Evaluator;
use crate::garbled::GarbledCircuit;
use crate::garbler::Garbler;
use crate::ot::{OtReceiver, OtSender, RsaOtReceiver, RsaOtSender};

/// Semi-honest Yao with RSA based OT. Returns the evaluator's output bits.
pub fn execute_secure_protocol(
    circuit: &Circuit,
    garbler_bits: &[u8],
    evaluator_bits: &[u8],
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    run_two_party(
        circuit,
        garbler_bits,
        evaluator_bits,
        timeout,
        RsaOtSender,
        RsaOtReceiver,
    )
}

/// Cut-and-choose Yao with RSA based OT.
pub fn execute_cut_and_choose(
    circuit: &Circuit,
    garbler_bits: &[u8],
    evaluator_bits: &[u8],
    params: CutAndChooseParams,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    run_cut_and_choose(
        circuit,
        garbler_bits,
        evaluator_bits,
        params,
        timeout,
        RsaOtSender,
        RsaOtReceiver,
    )
}

pub fn run_two_party<S, R>(
    circuit: &Circuit,
    garbler_bits: &[u8],
    evaluator_bits: &[u8],
    timeout: Option<Duration>,
    ot_sender: S,
    ot_receiver: R,
) -> Result<Vec<u8>>
where
    S: OtSender + Send + 'static,
    R: OtReceiver,
{
    let start = Instant::now();
    let (garbler_channel, evaluator_channel) = MemoryChannel::pair(timeout);
    let garbler_circuit = GarbledCircuit::new(circuit.clone());
    let garbler_bits = garbler_bits.to_vec();

    let garbler = thread::spawn(move || {
        Garbler::new(garbler_channel, ot_sender, garbler_circuit).run(&garbler_bits)
    });
    let output = Evaluator::new(
        evaluator_channel,
        ot_receiver,
        GarbledCircuit::new(circuit.clone()),
    )
    .run(evaluator_bits);

    let output = join_parties(garbler, output)?;
    info!(circuit = %circuit.id, elapsed = ?start.elapsed(), "two-party run finished");
    Ok(output)
}

pub fn run_cut_and_choose<S, R>(
    circuit: &Circuit,
    garbler_bits: &[u8],
    evaluator_bits: &[u8],
    params: CutAndChooseParams,
    timeout: Option<Duration>,
    ot_sender: S,
    ot_receiver: R,
) -> Result<Vec<u8>>
where
    S: OtSender + Send + 'static,
    R: OtReceiver,
{
    let start = Instant::now();
    let (garbler_channel, evaluator_channel) = MemoryChannel::pair(timeout);
    let template = GarbledCircuit::new(circuit.clone());
    let mut garbler = CutAndChooseGarbler::new(garbler_channel, ot_sender, template.clone(), params)?;
    let mut evaluator = CutAndChooseEvaluator::new(evaluator_channel, ot_receiver, template, params)?;
    let garbler_bits = garbler_bits.to_vec();

    let garbler = thread::spawn(move || garbler.run(&garbler_bits));
    let output = evaluator.run(evaluator_bits);
    // The garbler may still be waiting on the evaluator's endpoint.
    drop(evaluator);

    let output = join_parties(garbler, output)?;
    info!(
        circuit = %circuit.id,
        copies = params.num_circuits,
        elapsed = ?start.elapsed(),
        "cut-and-choose run finished"
    );
    Ok(output)
}

/// Prefers the garbler's error when the evaluator only saw the channel close
/// underneath it.
fn join_parties(
    garbler: thread::JoinHandle<Result<()>>,
    evaluator: Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let garbler = garbler
        .join()
        .map_err(|_| ProtocolError::from(TransportError::Disconnected))?;
    match (garbler, evaluator) {
        (Err(err), Err(ProtocolError::Transport(_))) => Err(err),
        (_, Err(err)) => Err(err),
        (Err(err), Ok(_)) => Err(err),
        (Ok(()), Ok(output)) => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::tests::pairwise_and_circuit;
    use crate::error::ConfigError;
    use crate::mock::create_mock_ot_pair;

    #[test]
    fn test_garbler_error_wins_over_disconnect() {
        let (ot_sender, ot_receiver) = create_mock_ot_pair();
        let result = run_two_party(
            &pairwise_and_circuit(),
            &[1],
            &[1, 1],
            Some(Duration::from_secs(5)),
            ot_sender,
            ot_receiver,
        );
        assert!(matches!(
            result,
            Err(ProtocolError::Configuration(ConfigError::InputLength { expected: 2, actual: 1 }))
        ));
    }

    #[test]
    fn test_cut_and_choose_evaluator_failure_returns() {
        let (ot_sender, ot_receiver) = create_mock_ot_pair();
        let params = CutAndChooseParams {
            num_circuits: 4,
            num_checked: 2,
            security_parameter: 4,
        };
        let result = run_cut_and_choose(
            &pairwise_and_circuit(),
            &[1, 0],
            &[1],
            params,
            None,
            ot_sender,
            ot_receiver,
        );
        assert!(matches!(
            result,
            Err(ProtocolError::Configuration(ConfigError::InputLength { expected: 2, actual: 1 }))
        ));
    }

    #[test]
    fn test_all_input_combinations() -> Result<()> {
        let circuit = pairwise_and_circuit();
        for g in 0..4u8 {
            for e in 0..4u8 {
                let garbler_bits = [g >> 1, g & 1];
                let evaluator_bits = [e >> 1, e & 1];
                let (ot_sender, ot_receiver) = create_mock_ot_pair();
                let output = run_two_party(
                    &circuit,
                    &garbler_bits,
                    &evaluator_bits,
                    None,
                    ot_sender,
                    ot_receiver,
                )?;
                assert_eq!(output, circuit.evaluate_plain(&garbler_bits, &evaluator_bits)?);
            }
        }
        Ok(())
    }
}
