pub mod bundle;
pub mod channel;
pub mod circuit;
pub mod commitment;
pub mod config;
pub mod cut_and_choose;
pub mod error;
pub mod evaluator;
pub mod garbled;
pub mod garbler;
pub mod key;
pub mod mock;
pub mod oracle;
pub mod ot;
pub mod package;
pub mod protocol;
pub mod state;

pub use bundle::CommitmentBundle;
pub use channel::{Channel, MemoryChannel, Message};
pub use circuit::{Circuit, Gate, GateType, Party};
pub use commitment::{CommitmentMsg, DecommitmentMsg};
pub use config::ProtocolConfig;
pub use cut_and_choose::{CutAndChooseEvaluator, CutAndChooseGarbler, CutAndChooseParams};
pub use error::{ProtocolError, Result};
pub use evaluator::Evaluator;
pub use garbled::{GarbledCircuit, GarbledTables};
pub use garbler::Garbler;
pub use key::Key;
pub use oracle::GarbledCircuitOracle;
pub use package::CommitmentsPackage;
pub use protocol::{execute_cut_and_choose, execute_secure_protocol};
pub use state::ProtocolState;
