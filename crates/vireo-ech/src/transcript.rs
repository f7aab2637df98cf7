//! Handshake transcript hashing and the TLS 1.3 style key schedule used to
//! derive the ECH acceptance confirmation.

use sha2::{Digest, Sha256, Sha384};

use crate::hpke::{self, HpkeError, KdfId};
use crate::wire::{put_u16, put_vec8, WireError};

/// Length of the acceptance confirmation signal
pub const ACCEPT_CONFIRMATION_SIZE: usize = 8;

/// A running transcript of framed handshake messages
#[derive(Debug, Clone)]
pub struct HandshakeContext {
    kdf: KdfId,
    transcript: Vec<u8>,
}

impl HandshakeContext {
    /// Start an empty transcript hashed with the given KDF's hash
    pub fn new(kdf: KdfId) -> Self {
        HandshakeContext { kdf, transcript: Vec::new() }
    }

    /// Append an already framed handshake message
    pub fn append_message(&mut self, msg: &[u8]) {
        self.transcript.extend_from_slice(msg);
    }

    /// Hash of the transcript so far
    pub fn hash(&self) -> Vec<u8> {
        match self.kdf {
            KdfId::HkdfSha256 => Sha256::digest(&self.transcript).to_vec(),
            KdfId::HkdfSha384 => Sha384::digest(&self.transcript).to_vec(),
        }
    }
}

fn hkdf_expand_label(
    kdf: KdfId,
    secret: &[u8],
    label: &str,
    context: &[u8],
    len: usize,
) -> Result<Vec<u8>, HpkeError> {
    let mut hkdf_label = Vec::with_capacity(4 + 6 + label.len() + context.len());
    put_u16(&mut hkdf_label, len as u16);
    let mut full_label = Vec::with_capacity(6 + label.len());
    full_label.extend_from_slice(b"tls13 ");
    full_label.extend_from_slice(label.as_bytes());
    // labels and contexts here are short by construction
    put_vec8(&mut hkdf_label, &full_label).map_err(|_: WireError| HpkeError::Expand)?;
    put_vec8(&mut hkdf_label, context).map_err(|_: WireError| HpkeError::Expand)?;
    hpke::hkdf_expand(kdf, secret, &hkdf_label, len)
}

/// The slice of the TLS 1.3 key schedule needed for ECH: an early secret
/// extracted from the inner hello's random, expanded with the acceptance
/// confirmation labels.
pub struct KeyScheduler {
    kdf: KdfId,
    early_secret: Vec<u8>,
}

impl KeyScheduler {
    /// Extract the early secret from `ClientHelloInner.random`
    pub fn new_from_random(kdf: KdfId, client_random: &[u8; 32]) -> Self {
        let early_secret = hpke::hkdf_extract(kdf, b"", client_random);
        KeyScheduler { kdf, early_secret }
    }

    /// Derive a hash-length secret for the given label and transcript hash
    pub fn derive_secret(&self, label: &str, transcript_hash: &[u8]) -> Result<Vec<u8>, HpkeError> {
        hkdf_expand_label(
            self.kdf,
            &self.early_secret,
            label,
            transcript_hash,
            self.kdf.hash_len(),
        )
    }
}
