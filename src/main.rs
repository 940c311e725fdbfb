use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use yao_2pc::config::{parse_bits, read_input_file};
use yao_2pc::{
    execute_cut_and_choose, execute_secure_protocol, Circuit, CutAndChooseParams, Party,
    ProtocolConfig,
};

struct Run {
    circuit: Circuit,
    garbler_bits: Vec<u8>,
    evaluator_bits: Vec<u8>,
    iterations: usize,
    print_output: bool,
    timeout: Option<Duration>,
    cut_and_choose: Option<CutAndChooseParams>,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <config.json>");
    eprintln!("       {program} <circuit_file.json> <circuit_index> <garbler_bits> <evaluator_bits> [--malicious]");
    eprintln!("  config.json: run configuration (circuit, input files, iterations, cut-and-choose)");
    eprintln!("  circuit_file.json: JSON file containing circuits");
    eprintln!("  circuit_index: 0-based index of the circuit to evaluate");
    eprintln!("  garbler_bits: binary string for the garbler's input (e.g. '10')");
    eprintln!("  evaluator_bits: binary string for the evaluator's input");
    eprintln!("  --malicious: run the cut-and-choose protocol");
    eprintln!("\nExamples:");
    eprintln!("  {program} circuits/bool.json 0 10 11");
    eprintln!("  {program} circuits/bool.json 0 10 11 --malicious");
}

fn load_circuit(path: &Path, index: usize) -> Result<Circuit> {
    let mut circuits = Circuit::from_json_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if index >= circuits.len() {
        let available: Vec<&str> = circuits.iter().map(|c| c.id.as_str()).collect();
        bail!(
            "circuit index {index} is out of range, available circuits: {}",
            available.join(", ")
        );
    }
    Ok(circuits.swap_remove(index))
}

fn parse_args(args: &[String]) -> Result<Run> {
    if args.len() == 2 {
        let config = ProtocolConfig::from_json_file(&args[1])?;
        return Ok(Run {
            circuit: load_circuit(&config.circuit_file, config.circuit_index)?,
            garbler_bits: read_input_file(&config.garbler_input_file)?,
            evaluator_bits: read_input_file(&config.evaluator_input_file)?,
            iterations: config.iterations,
            print_output: config.print_output,
            timeout: config.timeout(),
            cut_and_choose: config.malicious.then_some(config.cut_and_choose),
        });
    }

    let index: usize = args[2]
        .parse()
        .with_context(|| format!("invalid circuit index '{}'", args[2]))?;
    let malicious = match args.get(5).map(String::as_str) {
        None => false,
        Some("--malicious") => true,
        Some(other) => bail!("unknown argument '{other}'"),
    };
    Ok(Run {
        circuit: load_circuit(Path::new(&args[1]), index)?,
        garbler_bits: parse_bits(&args[3]).context("in the garbler's input")?,
        evaluator_bits: parse_bits(&args[4]).context("in the evaluator's input")?,
        iterations: 1,
        print_output: true,
        timeout: None,
        cut_and_choose: malicious.then(CutAndChooseParams::default),
    })
}

fn average(elapsed: Duration, iterations: usize) -> Duration {
    elapsed.div_f64(iterations.max(1) as f64)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 && !(5..=6).contains(&args.len()) {
        print_usage(&args[0]);
        std::process::exit(1);
    }
    let run = match parse_args(&args) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error: {e:#}");
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let mut output = Vec::new();
    for _ in 0..run.iterations {
        output = match run.cut_and_choose {
            Some(params) => execute_cut_and_choose(
                &run.circuit,
                &run.garbler_bits,
                &run.evaluator_bits,
                params,
                run.timeout,
            )?,
            None => execute_secure_protocol(
                &run.circuit,
                &run.garbler_bits,
                &run.evaluator_bits,
                run.timeout,
            )?,
        };
    }
    eprintln!(
        "{} iteration(s), average {:?} per run",
        run.iterations,
        average(start.elapsed(), run.iterations)
    );

    if run.print_output {
        print!("Garbler");
        for (wire, bit) in run.circuit.input_wires(Party::Garbler).iter().zip(&run.garbler_bits) {
            print!("[{wire}]={bit} ");
        }
        print!("Evaluator");
        for (wire, bit) in run.circuit.input_wires(Party::Evaluator).iter().zip(&run.evaluator_bits) {
            print!("[{wire}]={bit} ");
        }
        print!("Output");
        for (wire, bit) in run.circuit.out.iter().zip(&output) {
            print!("[{wire}]={bit} ");
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_unknown_trailing_argument() {
        let err = parse_args(&args(&["yao_2pc", "circuits/bool.json", "0", "10", "11", "--fast"]))
            .err()
            .expect("unknown flag must be rejected");
        assert!(err.to_string().contains("--fast"));
    }

    #[test]
    fn test_average_over_many_iterations() {
        let elapsed = Duration::from_secs(8);
        assert_eq!(average(elapsed, 4), Duration::from_secs(2));
        assert!(average(elapsed, usize::MAX) < Duration::from_micros(2));
    }
}
