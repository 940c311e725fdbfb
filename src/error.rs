//! Error kinds surfaced by the protocol.
//!
//! Nothing in this crate recovers from an error locally: every step hands the
//! error back to the caller and the protocol instance ends up aborted.

/// Top-level error returned by every protocol operation.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Cheat(#[from] CheatDetected),
    #[error("not all inputs set: expected {expected} input keys, got {actual}")]
    IncompleteInput { expected: usize, actual: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl ProtocolError {
    /// Returns `true` if the error points at the peer rather than at local
    /// configuration or the transport.
    pub fn is_adversarial(&self) -> bool {
        matches!(self, Self::Structural(_) | Self::Cheat(_))
    }
}

/// A received message had an unexpected type or shape.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("unexpected message: expected {expected}, received {received}")]
    UnexpectedMessage {
        expected: &'static str,
        received: &'static str,
    },
    #[error("malformed {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("malformed {what}: {reason}")]
    InvalidShape { what: &'static str, reason: String },
}

/// An explicit protocol-level inconsistency.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheatDetected {
    #[error("commitments differ for index={wire} and sigma={sigma}: c1 = {ours}, c2 = {theirs}")]
    CommitmentMismatch {
        wire: usize,
        sigma: u8,
        ours: String,
        theirs: String,
    },
    #[error("commitment bundles cover different numbers of wires: {ours} != {theirs}")]
    BundleSizeMismatch { ours: usize, theirs: usize },
    #[error("decommitment for index={wire} and sigma={sigma} does not open its commitment")]
    InvalidDecommitment { wire: usize, sigma: u8 },
    #[error("{what} of circuit {circuit} does not match its regenerated value")]
    CircuitMismatch { circuit: usize, what: &'static str },
    #[error("garbled row of gate {gate} failed to decrypt")]
    CorruptGarbledTable { gate: u32 },
    #[error("evaluation circuits disagree on the output")]
    InconsistentOutputs,
}

/// Channel or OT I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("receive timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("peer disconnected")]
    Disconnected,
    #[error("oblivious transfer failed: {0}")]
    ObliviousTransfer(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Local misconfiguration: malformed circuits, invalid arguments, misuse.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sigma must be 0 or 1, got {0}")]
    InvalidSigma(u8),
    #[error("wire index {index} out of range ({wires} wires)")]
    WireOutOfRange { index: usize, wires: usize },
    #[error("invalid input bit {bit} at position {position}")]
    InvalidInputBit { position: usize, bit: u8 },
    #[error("expected {expected} input bits, got {actual}")]
    InputLength { expected: usize, actual: usize },
    #[error("malformed circuit: {0}")]
    MalformedCircuit(String),
    #[error("{what} length {actual} is not consistent with {expected}")]
    BufferLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("decommitments have not been set")]
    MissingDecommitments,
    #[error("{0} has not been set")]
    MissingComponent(&'static str),
    #[error("protocol instance already used (state {0:?})")]
    AlreadyRun(crate::state::ProtocolState),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;
