//! Flat-buffer commitments on the two keys of a group of wires.
//!
//! Slot `(w, sigma)` lives at index `w * 2 + sigma`: byte offset
//! `(w * 2 + sigma) * COMMITMENT_SIZE` in the commitment and randomness
//! buffers and `(w * 2 + sigma) * KEY_SIZE` in the decommitment buffer.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::commitment::{commit, CommitmentMsg, DecommitmentMsg, COMMITMENT_SIZE};
use crate::error::{CheatDetected, ConfigError, ProtocolError, Result};
use crate::key::{WireKeys, KEY_SIZE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCommitmentBundle")]
pub struct CommitmentBundle {
    commitments: Vec<u8>,
    commitment_ids: Vec<u64>,
    decommitments: Option<Vec<u8>>,
    decommitment_randoms: Option<Vec<u8>>,
}

/// Decoded form, checked by the same constructors as local bundles.
#[derive(Deserialize)]
struct RawCommitmentBundle {
    commitments: Vec<u8>,
    commitment_ids: Vec<u64>,
    decommitments: Option<Vec<u8>>,
    decommitment_randoms: Option<Vec<u8>>,
}

impl TryFrom<RawCommitmentBundle> for CommitmentBundle {
    type Error = ProtocolError;

    fn try_from(raw: RawCommitmentBundle) -> Result<Self> {
        match (raw.decommitments, raw.decommitment_randoms) {
            (Some(decommitments), Some(randoms)) => Self::with_decommitments(
                raw.commitments,
                raw.commitment_ids,
                decommitments,
                randoms,
            ),
            (None, None) => Self::new(raw.commitments, raw.commitment_ids),
            _ => Err(ConfigError::MissingDecommitments.into()),
        }
    }
}

impl CommitmentBundle {
    pub fn new(commitments: Vec<u8>, commitment_ids: Vec<u64>) -> Result<Self> {
        if commitment_ids.len() % 2 != 0 {
            return Err(ConfigError::BufferLength {
                what: "commitment ids",
                expected: commitment_ids.len() + 1,
                actual: commitment_ids.len(),
            }
            .into());
        }
        check_len("commitments", &commitments, commitment_ids.len() * COMMITMENT_SIZE)?;
        Ok(CommitmentBundle {
            commitments,
            commitment_ids,
            decommitments: None,
            decommitment_randoms: None,
        })
    }

    pub fn with_decommitments(
        commitments: Vec<u8>,
        commitment_ids: Vec<u64>,
        decommitments: Vec<u8>,
        decommitment_randoms: Vec<u8>,
    ) -> Result<Self> {
        let mut bundle = Self::new(commitments, commitment_ids)?;
        bundle.set_decommitments(decommitments, decommitment_randoms)?;
        Ok(bundle)
    }

    /// Commits to both keys of every wire. Slot `sigma` holds the key whose
    /// signal bit is `sigma`, so opening a slot reveals nothing about the
    /// plaintext value. Ids are `first_id`, `first_id + 1`, ...
    pub fn commit_wire_keys<'a, R: Rng + ?Sized>(
        rng: &mut R,
        first_id: u64,
        keys: impl IntoIterator<Item = &'a WireKeys>,
    ) -> Self {
        let mut commitments = Vec::new();
        let mut commitment_ids = Vec::new();
        let mut decommitments = Vec::new();
        let mut decommitment_randoms = Vec::new();

        for wire_keys in keys {
            for sigma in 0..2 {
                let id = first_id + commitment_ids.len() as u64;
                let (cmt, decmt) = commit(rng, id, &wire_keys.by_signal(sigma).0);
                commitments.extend_from_slice(&cmt.commitment);
                commitment_ids.push(id);
                decommitments.extend_from_slice(&decmt.value);
                decommitment_randoms.extend_from_slice(&decmt.randomness);
            }
        }

        CommitmentBundle {
            commitments,
            commitment_ids,
            decommitments: Some(decommitments),
            decommitment_randoms: Some(decommitment_randoms),
        }
    }

    /// Opens the bundle. Called once the garbler knows which copies to reveal.
    pub fn set_decommitments(&mut self, decommitments: Vec<u8>, randoms: Vec<u8>) -> Result<()> {
        let slots = self.commitment_ids.len();
        check_len("decommitments", &decommitments, slots * KEY_SIZE)?;
        check_len("decommitment randoms", &randoms, slots * COMMITMENT_SIZE)?;
        self.decommitments = Some(decommitments);
        self.decommitment_randoms = Some(randoms);
        Ok(())
    }

    /// Number of wires covered.
    pub fn num_wires(&self) -> usize {
        self.commitment_ids.len() / 2
    }

    pub fn commitments(&self) -> &[u8] {
        &self.commitments
    }

    pub fn commitment_ids(&self) -> &[u64] {
        &self.commitment_ids
    }

    pub fn has_decommitments(&self) -> bool {
        self.decommitments.is_some()
    }

    /// Drops the openings, keeping only what may be sent to the evaluator.
    pub fn without_decommitments(&self) -> Self {
        CommitmentBundle {
            commitments: self.commitments.clone(),
            commitment_ids: self.commitment_ids.clone(),
            decommitments: None,
            decommitment_randoms: None,
        }
    }

    fn slot(&self, wire: usize, sigma: u8) -> Result<usize> {
        if sigma > 1 {
            return Err(ConfigError::InvalidSigma(sigma).into());
        }
        if wire >= self.num_wires() {
            return Err(ConfigError::WireOutOfRange {
                index: wire,
                wires: self.num_wires(),
            }
            .into());
        }
        Ok(wire * 2 + sigma as usize)
    }

    pub fn commitment(&self, wire: usize, sigma: u8) -> Result<CommitmentMsg> {
        let slot = self.slot(wire, sigma)?;
        let offset = slot * COMMITMENT_SIZE;
        CommitmentMsg::from_slice(
            self.commitment_ids[slot],
            &self.commitments[offset..offset + COMMITMENT_SIZE],
        )
    }

    pub fn decommitment(&self, wire: usize, sigma: u8) -> Result<DecommitmentMsg> {
        let slot = self.slot(wire, sigma)?;
        let (Some(values), Some(randoms)) = (&self.decommitments, &self.decommitment_randoms) else {
            return Err(ConfigError::MissingDecommitments.into());
        };

        let mut randomness = [0u8; COMMITMENT_SIZE];
        randomness.copy_from_slice(&randoms[slot * COMMITMENT_SIZE..(slot + 1) * COMMITMENT_SIZE]);
        Ok(DecommitmentMsg {
            randomness,
            value: values[slot * KEY_SIZE..(slot + 1) * KEY_SIZE].to_vec(),
        })
    }

    /// Checks `decommitment` against slot `(wire, sigma)`.
    pub fn verify_opening(&self, wire: usize, sigma: u8, decommitment: &DecommitmentMsg) -> Result<()> {
        if decommitment.verify(&self.commitment(wire, sigma)?) {
            Ok(())
        } else {
            Err(CheatDetected::InvalidDecommitment { wire, sigma }.into())
        }
    }

    /// Checks this bundle's own decommitment for slot `(wire, sigma)`.
    pub fn verify_decommitment(&self, wire: usize, sigma: u8) -> Result<()> {
        self.verify_opening(wire, sigma, &self.decommitment(wire, sigma)?)
    }

    /// Fails on the first slot whose commitment differs from `other`'s.
    pub fn verify_equal(&self, other: &CommitmentBundle) -> Result<()> {
        if self.num_wires() != other.num_wires() {
            return Err(CheatDetected::BundleSizeMismatch {
                ours: self.num_wires(),
                theirs: other.num_wires(),
            }
            .into());
        }
        for wire in 0..self.num_wires() {
            for sigma in 0..2 {
                let ours = self.commitment(wire, sigma)?.to_string();
                let theirs = other.commitment(wire, sigma)?.to_string();
                if ours != theirs {
                    return Err(CheatDetected::CommitmentMismatch {
                        wire,
                        sigma,
                        ours,
                        theirs,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

fn check_len(what: &'static str, buffer: &[u8], expected: usize) -> Result<()> {
    if buffer.len() == expected {
        Ok(())
    } else {
        Err(ConfigError::BufferLength {
            what,
            expected,
            actual: buffer.len(),
        }
        .into())
    }
}
