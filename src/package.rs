//! All commitments the garbler sends for one circuit copy, packed as flat
//! buffers so thousands of them travel without per-item framing.

use serde::{Deserialize, Serialize};

use crate::bundle::CommitmentBundle;
use crate::commitment::{CommitmentMsg, COMMITMENT_SIZE};
use crate::error::{ConfigError, ProtocolError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCommitmentsPackage")]
pub struct CommitmentsPackage {
    /// Statistical security parameter: diff rows hold `2 * s` commitments.
    s: usize,
    seed_cmt: Option<CommitmentMsg>,
    mask_cmt: Option<CommitmentMsg>,
    commitments_x: Vec<u8>,
    commitments_x_ids: Vec<u64>,
    commitments_y1_extended: Vec<u8>,
    commitments_y1_extended_ids: Vec<u64>,
    commitments_y2: Vec<u8>,
    commitments_y2_ids: Vec<u64>,
    commitments_output_keys: Option<CommitmentMsg>,
    diff_commitments: Vec<u8>,
    diff_commitments_ids: Vec<u64>,
}

#[derive(Deserialize)]
struct RawCommitmentsPackage {
    s: usize,
    seed_cmt: Option<CommitmentMsg>,
    mask_cmt: Option<CommitmentMsg>,
    commitments_x: Vec<u8>,
    commitments_x_ids: Vec<u64>,
    commitments_y1_extended: Vec<u8>,
    commitments_y1_extended_ids: Vec<u64>,
    commitments_y2: Vec<u8>,
    commitments_y2_ids: Vec<u64>,
    commitments_output_keys: Option<CommitmentMsg>,
    diff_commitments: Vec<u8>,
    diff_commitments_ids: Vec<u64>,
}

impl TryFrom<RawCommitmentsPackage> for CommitmentsPackage {
    type Error = ProtocolError;

    fn try_from(raw: RawCommitmentsPackage) -> Result<Self> {
        let package = CommitmentsPackage {
            seed_cmt: raw.seed_cmt,
            mask_cmt: raw.mask_cmt,
            commitments_x: raw.commitments_x,
            commitments_x_ids: raw.commitments_x_ids,
            commitments_y1_extended: raw.commitments_y1_extended,
            commitments_y1_extended_ids: raw.commitments_y1_extended_ids,
            commitments_y2: raw.commitments_y2,
            commitments_y2_ids: raw.commitments_y2_ids,
            commitments_output_keys: raw.commitments_output_keys,
            diff_commitments: raw.diff_commitments,
            diff_commitments_ids: raw.diff_commitments_ids,
            ..CommitmentsPackage::new(raw.s)?
        };
        package.commitments_x()?;
        package.commitments_y1_extended()?;
        package.commitments_y2()?;
        package.diff_commitments()?;
        Ok(package)
    }
}

impl CommitmentsPackage {
    pub fn new(s: usize) -> Result<Self> {
        if s == 0 {
            return Err(ConfigError::InvalidParameter(
                "security parameter must be positive".to_string(),
            )
            .into());
        }
        Ok(CommitmentsPackage {
            s,
            seed_cmt: None,
            mask_cmt: None,
            commitments_x: Vec::new(),
            commitments_x_ids: Vec::new(),
            commitments_y1_extended: Vec::new(),
            commitments_y1_extended_ids: Vec::new(),
            commitments_y2: Vec::new(),
            commitments_y2_ids: Vec::new(),
            commitments_output_keys: None,
            diff_commitments: Vec::new(),
            diff_commitments_ids: Vec::new(),
        })
    }

    pub fn security_parameter(&self) -> usize {
        self.s
    }

    pub fn set_seed_cmt(&mut self, commitment: CommitmentMsg) {
        self.seed_cmt = Some(commitment);
    }

    pub fn seed_cmt(&self) -> Result<CommitmentMsg> {
        self.seed_cmt
            .ok_or_else(|| ConfigError::MissingComponent("seed commitment").into())
    }

    pub fn set_mask_cmt(&mut self, commitment: CommitmentMsg) {
        self.mask_cmt = Some(commitment);
    }

    pub fn mask_cmt(&self) -> Result<CommitmentMsg> {
        self.mask_cmt
            .ok_or_else(|| ConfigError::MissingComponent("mask commitment").into())
    }

    /// Commitments on the garbler's input keys. Only the commitments travel.
    pub fn set_commitments_x(&mut self, bundle: &CommitmentBundle) {
        self.commitments_x = bundle.commitments().to_vec();
        self.commitments_x_ids = bundle.commitment_ids().to_vec();
    }

    pub fn commitments_x(&self) -> Result<CommitmentBundle> {
        CommitmentBundle::new(self.commitments_x.clone(), self.commitments_x_ids.clone())
    }

    pub fn set_commitments_y1_extended(&mut self, bundle: &CommitmentBundle) {
        self.commitments_y1_extended = bundle.commitments().to_vec();
        self.commitments_y1_extended_ids = bundle.commitment_ids().to_vec();
    }

    pub fn commitments_y1_extended(&self) -> Result<CommitmentBundle> {
        CommitmentBundle::new(
            self.commitments_y1_extended.clone(),
            self.commitments_y1_extended_ids.clone(),
        )
    }

    pub fn set_commitments_y2(&mut self, bundle: &CommitmentBundle) {
        self.commitments_y2 = bundle.commitments().to_vec();
        self.commitments_y2_ids = bundle.commitment_ids().to_vec();
    }

    pub fn commitments_y2(&self) -> Result<CommitmentBundle> {
        CommitmentBundle::new(self.commitments_y2.clone(), self.commitments_y2_ids.clone())
    }

    /// The output-key commitment always carries id 0.
    pub fn set_commitments_output_keys(&mut self, commitment: CommitmentMsg) {
        self.commitments_output_keys = Some(CommitmentMsg { id: 0, ..commitment });
    }

    pub fn commitments_output_keys(&self) -> Result<CommitmentMsg> {
        self.commitments_output_keys
            .ok_or_else(|| ConfigError::MissingComponent("output keys commitment").into())
    }

    /// Flattens a `size x 2s` matrix row-major with stride `2s * COMMITMENT_SIZE`.
    pub fn set_diff_commitments(&mut self, matrix: &[Vec<CommitmentMsg>]) -> Result<()> {
        let row_len = 2 * self.s;
        if let Some(row) = matrix.iter().find(|row| row.len() != row_len) {
            return Err(ConfigError::BufferLength {
                what: "diff commitment row",
                expected: row_len,
                actual: row.len(),
            }
            .into());
        }

        let mut commitments = Vec::with_capacity(matrix.len() * row_len * COMMITMENT_SIZE);
        let mut ids = Vec::with_capacity(matrix.len() * row_len);
        for cmt in matrix.iter().flatten() {
            commitments.extend_from_slice(&cmt.commitment);
            ids.push(cmt.id);
        }
        self.diff_commitments = commitments;
        self.diff_commitments_ids = ids;
        Ok(())
    }

    pub fn diff_commitments(&self) -> Result<Vec<Vec<CommitmentMsg>>> {
        let row_len = 2 * self.s;
        let stride = row_len * COMMITMENT_SIZE;
        if self.diff_commitments.len() % stride != 0 {
            return Err(ConfigError::BufferLength {
                what: "diff commitments",
                expected: (self.diff_commitments.len() / stride + 1) * stride,
                actual: self.diff_commitments.len(),
            }
            .into());
        }
        let size = self.diff_commitments.len() / stride;
        if self.diff_commitments_ids.len() != size * row_len {
            return Err(ConfigError::BufferLength {
                what: "diff commitment ids",
                expected: size * row_len,
                actual: self.diff_commitments_ids.len(),
            }
            .into());
        }

        self.diff_commitments
            .chunks_exact(stride)
            .zip(self.diff_commitments_ids.chunks_exact(row_len))
            .map(|(row, ids)| {
                row.chunks_exact(COMMITMENT_SIZE)
                    .zip(ids)
                    .map(|(bytes, id)| CommitmentMsg::from_slice(*id, bytes))
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}
