use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, Key as AesKey, KeyInit, Nonce};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuralError};

/// Size of a wire key in bytes (one AES block).
pub const KEY_SIZE: usize = 16;

/// A wire key. The low bit of the last byte is the key's signal bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub [u8; KEY_SIZE]);

impl Key {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; KEY_SIZE];
        rng.fill(&mut key);
        Key(key)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| StructuralError::InvalidLength {
            what: "wire key",
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Key(key))
    }

    pub fn signal_bit(&self) -> u8 {
        self.0[KEY_SIZE - 1] & 1
    }

    fn with_signal_bit(mut self, bit: u8) -> Self {
        self.0[KEY_SIZE - 1] = (self.0[KEY_SIZE - 1] & !1) | (bit & 1);
        self
    }

    // Every garbled row is encrypted under a freshly derived key, so the fixed
    // nonce is never reused with the same AES key.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let cipher = Aes128Gcm::new(AesKey::<Aes128Gcm>::from_slice(&self.0));
        let nonce = Nonce::from_slice(&[0u8; 12]);
        cipher
            .encrypt(nonce, data)
            .expect("aes-gcm encryption of an in-memory buffer cannot fail")
    }

    pub fn decrypt(&self, data: &[u8]) -> Option<Vec<u8>> {
        let cipher = Aes128Gcm::new(AesKey::<Aes128Gcm>::from_slice(&self.0));
        let nonce = Nonce::from_slice(&[0u8; 12]);
        cipher.decrypt(nonce, data).ok()
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The two keys of a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireKeys {
    pub zero: Key,
    pub one: Key,
}

impl WireKeys {
    /// Samples a key pair whose signal bits differ, so the keys are distinct.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let zero = Key::random(rng);
        let one = Key::random(rng).with_signal_bit(zero.signal_bit() ^ 1);
        WireKeys { zero, one }
    }

    pub fn select(&self, bit: u8) -> &Key {
        if bit == 0 {
            &self.zero
        } else {
            &self.one
        }
    }

    /// Returns the key whose signal bit equals `sigma`.
    pub fn by_signal(&self, sigma: u8) -> &Key {
        if self.zero.signal_bit() == sigma {
            &self.zero
        } else {
            &self.one
        }
    }

    /// Signal bit of the zero key.
    pub fn signal_bit(&self) -> u8 {
        self.zero.signal_bit()
    }
}

/// Concatenates keys into one flat buffer.
pub fn pack_keys<'a>(keys: impl IntoIterator<Item = &'a Key>) -> Vec<u8> {
    keys.into_iter().flat_map(|key| key.0).collect()
}

/// Splits a flat buffer into `expected` keys.
pub fn unpack_keys(buffer: &[u8], expected: usize, what: &'static str) -> Result<Vec<Key>> {
    if buffer.len() != expected * KEY_SIZE {
        return Err(StructuralError::InvalidLength {
            what,
            expected: expected * KEY_SIZE,
            actual: buffer.len(),
        }
        .into());
    }
    buffer.chunks_exact(KEY_SIZE).map(Key::from_slice).collect()
}
