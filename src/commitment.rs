//! Simple hash commitments: `SHA-256(randomness || value)`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Result, StructuralError};

/// Size of a commitment and of its randomness, in bytes.
pub const COMMITMENT_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMsg {
    pub id: u64,
    pub commitment: [u8; COMMITMENT_SIZE],
}

impl CommitmentMsg {
    pub fn from_slice(id: u64, bytes: &[u8]) -> Result<Self> {
        let commitment = bytes.try_into().map_err(|_| StructuralError::InvalidLength {
            what: "commitment",
            expected: COMMITMENT_SIZE,
            actual: bytes.len(),
        })?;
        Ok(CommitmentMsg { id, commitment })
    }
}

/// Canonical encoding, `<id>:<hex>`.
impl fmt::Display for CommitmentMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, hex::encode(self.commitment))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecommitmentMsg {
    pub randomness: [u8; COMMITMENT_SIZE],
    pub value: Vec<u8>,
}

impl DecommitmentMsg {
    pub fn verify(&self, commitment: &CommitmentMsg) -> bool {
        digest(&self.randomness, &self.value) == commitment.commitment
    }
}

fn digest(randomness: &[u8; COMMITMENT_SIZE], value: &[u8]) -> [u8; COMMITMENT_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(randomness);
    hasher.update(value);
    hasher.finalize().into()
}

/// Commits with caller-supplied randomness.
pub fn commit_with(
    id: u64,
    value: &[u8],
    randomness: [u8; COMMITMENT_SIZE],
) -> (CommitmentMsg, DecommitmentMsg) {
    let commitment = CommitmentMsg {
        id,
        commitment: digest(&randomness, value),
    };
    let decommitment = DecommitmentMsg {
        randomness,
        value: value.to_vec(),
    };
    (commitment, decommitment)
}

pub fn commit<R: Rng + ?Sized>(
    rng: &mut R,
    id: u64,
    value: &[u8],
) -> (CommitmentMsg, DecommitmentMsg) {
    let mut randomness = [0u8; COMMITMENT_SIZE];
    rng.fill(&mut randomness);
    commit_with(id, value, randomness)
}
