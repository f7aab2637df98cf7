//! HPKE (RFC 9180) base mode, scoped to what ECH negotiates:
//! DHKEM(X25519, HKDF-SHA256), HKDF-SHA256/384, and AES-GCM AEADs.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::{Sha256, Sha384};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

/// HPKE error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HpkeError {
    /// KEM id not supported by this build
    #[error("unsupported kem id {0:#06x}")]
    UnsupportedKem(u16),
    /// KDF id not supported by this build
    #[error("unsupported kdf id {0:#06x}")]
    UnsupportedKdf(u16),
    /// AEAD id not supported by this build
    #[error("unsupported aead id {0:#06x}")]
    UnsupportedAead(u16),
    /// Public key or encapsulated key has the wrong size
    #[error("invalid public key length {0}")]
    InvalidPublicKey(usize),
    /// HKDF expand failed (requested length too large)
    #[error("hkdf expand failed")]
    Expand,
    /// AEAD open failed: wrong key, nonce, or tampered ciphertext/AAD
    #[error("aead open failed")]
    OpenFailed,
    /// AEAD seal failed
    #[error("aead seal failed")]
    SealFailed,
}

/// Key-encapsulation mechanism identifier (RFC 9180 registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KemId {
    /// DHKEM(X25519, HKDF-SHA256)
    X25519HkdfSha256,
}

impl KemId {
    /// Registry code point
    pub fn to_u16(self) -> u16 {
        match self {
            KemId::X25519HkdfSha256 => 0x0020,
        }
    }

    /// Parse a registry code point
    pub fn from_u16(v: u16) -> Result<Self, HpkeError> {
        match v {
            0x0020 => Ok(KemId::X25519HkdfSha256),
            other => Err(HpkeError::UnsupportedKem(other)),
        }
    }
}

/// Key-derivation function identifier (RFC 9180 registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KdfId {
    /// HKDF-SHA256
    HkdfSha256,
    /// HKDF-SHA384
    HkdfSha384,
}

impl KdfId {
    /// Registry code point
    pub fn to_u16(self) -> u16 {
        match self {
            KdfId::HkdfSha256 => 0x0001,
            KdfId::HkdfSha384 => 0x0002,
        }
    }

    /// Parse a registry code point
    pub fn from_u16(v: u16) -> Result<Self, HpkeError> {
        match v {
            0x0001 => Ok(KdfId::HkdfSha256),
            0x0002 => Ok(KdfId::HkdfSha384),
            other => Err(HpkeError::UnsupportedKdf(other)),
        }
    }

    /// Output length of the underlying hash
    pub fn hash_len(self) -> usize {
        match self {
            KdfId::HkdfSha256 => 32,
            KdfId::HkdfSha384 => 48,
        }
    }
}

/// AEAD identifier (RFC 9180 registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadId {
    /// AES-128-GCM
    Aes128Gcm,
    /// AES-256-GCM
    Aes256Gcm,
}

impl AeadId {
    /// Registry code point
    pub fn to_u16(self) -> u16 {
        match self {
            AeadId::Aes128Gcm => 0x0001,
            AeadId::Aes256Gcm => 0x0002,
        }
    }

    /// Parse a registry code point
    pub fn from_u16(v: u16) -> Result<Self, HpkeError> {
        match v {
            0x0001 => Ok(AeadId::Aes128Gcm),
            0x0002 => Ok(AeadId::Aes256Gcm),
            other => Err(HpkeError::UnsupportedAead(other)),
        }
    }

    /// AEAD key length
    pub fn key_len(self) -> usize {
        match self {
            AeadId::Aes128Gcm => 16,
            AeadId::Aes256Gcm => 32,
        }
    }

    /// Ciphertext expansion (the authentication tag)
    pub fn cipher_overhead(self) -> usize {
        16
    }
}

/// The KDF whose hash underlies the given AEAD's TLS cipher suite.
///
/// Negotiation requires an ECH cipher suite's KDF to match this.
pub fn kdf_for_aead(aead: AeadId) -> KdfId {
    match aead {
        AeadId::Aes128Gcm => KdfId::HkdfSha256,
        AeadId::Aes256Gcm => KdfId::HkdfSha384,
    }
}

/// HPKE suite id: `"HPKE" || kem || kdf || aead`
pub fn suite_id(kem: KemId, kdf: KdfId, aead: AeadId) -> [u8; 10] {
    let mut id = [0u8; 10];
    id[..4].copy_from_slice(b"HPKE");
    id[4..6].copy_from_slice(&kem.to_u16().to_be_bytes());
    id[6..8].copy_from_slice(&kdf.to_u16().to_be_bytes());
    id[8..10].copy_from_slice(&aead.to_u16().to_be_bytes());
    id
}

fn kem_suite_id(kem: KemId) -> [u8; 5] {
    let mut id = [0u8; 5];
    id[..3].copy_from_slice(b"KEM");
    id[3..5].copy_from_slice(&kem.to_u16().to_be_bytes());
    id
}

pub(crate) fn hkdf_extract(kdf: KdfId, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    match kdf {
        KdfId::HkdfSha256 => Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec(),
        KdfId::HkdfSha384 => Hkdf::<Sha384>::extract(Some(salt), ikm).0.to_vec(),
    }
}

pub(crate) fn hkdf_expand(
    kdf: KdfId,
    prk: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Vec<u8>, HpkeError> {
    let mut okm = vec![0u8; len];
    match kdf {
        KdfId::HkdfSha256 => Hkdf::<Sha256>::from_prk(prk)
            .map_err(|_| HpkeError::Expand)?
            .expand(info, &mut okm)
            .map_err(|_| HpkeError::Expand)?,
        KdfId::HkdfSha384 => Hkdf::<Sha384>::from_prk(prk)
            .map_err(|_| HpkeError::Expand)?
            .expand(info, &mut okm)
            .map_err(|_| HpkeError::Expand)?,
    }
    Ok(okm)
}

fn labeled_extract(kdf: KdfId, sid: &[u8], salt: &[u8], label: &[u8], ikm: &[u8]) -> Vec<u8> {
    let mut labeled_ikm = Vec::with_capacity(7 + sid.len() + label.len() + ikm.len());
    labeled_ikm.extend_from_slice(b"HPKE-v1");
    labeled_ikm.extend_from_slice(sid);
    labeled_ikm.extend_from_slice(label);
    labeled_ikm.extend_from_slice(ikm);
    hkdf_extract(kdf, salt, &labeled_ikm)
}

fn labeled_expand(
    kdf: KdfId,
    sid: &[u8],
    prk: &[u8],
    label: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Vec<u8>, HpkeError> {
    let mut labeled_info = Vec::with_capacity(9 + sid.len() + label.len() + info.len());
    labeled_info.extend_from_slice(&(len as u16).to_be_bytes());
    labeled_info.extend_from_slice(b"HPKE-v1");
    labeled_info.extend_from_slice(sid);
    labeled_info.extend_from_slice(label);
    labeled_info.extend_from_slice(info);
    hkdf_expand(kdf, prk, &labeled_info, len)
}

// DHKEM(X25519): the KEM's own KDF is always HKDF-SHA256.
fn kem_extract_and_expand(kem: KemId, dh: &[u8], kem_context: &[u8]) -> Result<Vec<u8>, HpkeError> {
    let sid = kem_suite_id(kem);
    let eae_prk = labeled_extract(KdfId::HkdfSha256, &sid, b"", b"eae_prk", dh);
    labeled_expand(KdfId::HkdfSha256, &sid, &eae_prk, b"shared_secret", kem_context, 32)
}

fn x25519_public(bytes: &[u8]) -> Result<PublicKey, HpkeError> {
    let arr: [u8; 32] =
        bytes.try_into().map_err(|_| HpkeError::InvalidPublicKey(bytes.len()))?;
    Ok(PublicKey::from(arr))
}

/// Encapsulate to `pk_r`, returning the shared secret and the encapsulated
/// key `enc`
fn encap(
    kem: KemId,
    pk_r: &[u8],
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(Vec<u8>, Vec<u8>), HpkeError> {
    let pk_r = x25519_public(pk_r)?;
    let eph = EphemeralSecret::random_from_rng(&mut *rng);
    let enc = PublicKey::from(&eph);
    let dh = eph.diffie_hellman(&pk_r);

    let mut kem_context = Vec::with_capacity(64);
    kem_context.extend_from_slice(enc.as_bytes());
    kem_context.extend_from_slice(pk_r.as_bytes());
    let shared = kem_extract_and_expand(kem, dh.as_bytes(), &kem_context)?;
    Ok((shared, enc.as_bytes().to_vec()))
}

/// Decapsulate `enc` with the receiver secret key
fn decap(kem: KemId, enc: &[u8], sk_r: &[u8; 32]) -> Result<Vec<u8>, HpkeError> {
    let pk_e = x25519_public(enc)?;
    let sk = StaticSecret::from(*sk_r);
    let pk_r = PublicKey::from(&sk);
    let dh = sk.diffie_hellman(&pk_e);

    let mut kem_context = Vec::with_capacity(64);
    kem_context.extend_from_slice(enc);
    kem_context.extend_from_slice(pk_r.as_bytes());
    kem_extract_and_expand(kem, dh.as_bytes(), &kem_context)
}

const MODE_BASE: u8 = 0x00;
const NONCE_LEN: usize = 12;

/// An established HPKE encryption context
pub struct HpkeContext {
    aead: AeadId,
    key: Vec<u8>,
    base_nonce: [u8; NONCE_LEN],
    seq: u64,
}

impl HpkeContext {
    fn nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = self.base_nonce;
        let seq_bytes = self.seq.to_be_bytes();
        for (n, s) in nonce[NONCE_LEN - 8..].iter_mut().zip(seq_bytes) {
            *n ^= s;
        }
        nonce
    }

    /// Encrypt `plaintext` bound to `aad`, advancing the sequence number
    pub fn seal(&mut self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, HpkeError> {
        let nonce = self.nonce();
        let payload = Payload { msg: plaintext, aad };
        let ct = match self.aead {
            AeadId::Aes128Gcm => Aes128Gcm::new_from_slice(&self.key)
                .map_err(|_| HpkeError::SealFailed)?
                .encrypt(Nonce::from_slice(&nonce), payload)
                .map_err(|_| HpkeError::SealFailed)?,
            AeadId::Aes256Gcm => Aes256Gcm::new_from_slice(&self.key)
                .map_err(|_| HpkeError::SealFailed)?
                .encrypt(Nonce::from_slice(&nonce), payload)
                .map_err(|_| HpkeError::SealFailed)?,
        };
        self.seq += 1;
        Ok(ct)
    }

    /// Decrypt `ciphertext` bound to `aad`, advancing the sequence number
    pub fn open(&mut self, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, HpkeError> {
        let nonce = self.nonce();
        let payload = Payload { msg: ciphertext, aad };
        let pt = match self.aead {
            AeadId::Aes128Gcm => Aes128Gcm::new_from_slice(&self.key)
                .map_err(|_| HpkeError::OpenFailed)?
                .decrypt(Nonce::from_slice(&nonce), payload)
                .map_err(|_| HpkeError::OpenFailed)?,
            AeadId::Aes256Gcm => Aes256Gcm::new_from_slice(&self.key)
                .map_err(|_| HpkeError::OpenFailed)?
                .decrypt(Nonce::from_slice(&nonce), payload)
                .map_err(|_| HpkeError::OpenFailed)?,
        };
        self.seq += 1;
        Ok(pt)
    }
}

fn key_schedule(
    kem: KemId,
    kdf: KdfId,
    aead: AeadId,
    shared_secret: &[u8],
    info: &[u8],
    seq: u64,
) -> Result<HpkeContext, HpkeError> {
    let sid = suite_id(kem, kdf, aead);

    let psk_id_hash = labeled_extract(kdf, &sid, b"", b"psk_id_hash", b"");
    let info_hash = labeled_extract(kdf, &sid, b"", b"info_hash", info);
    let mut ksc = vec![MODE_BASE];
    ksc.extend_from_slice(&psk_id_hash);
    ksc.extend_from_slice(&info_hash);

    let secret = labeled_extract(kdf, &sid, shared_secret, b"secret", b"");
    let key = labeled_expand(kdf, &sid, &secret, b"key", &ksc, aead.key_len())?;
    let base_nonce_vec = labeled_expand(kdf, &sid, &secret, b"base_nonce", &ksc, NONCE_LEN)?;
    let mut base_nonce = [0u8; NONCE_LEN];
    base_nonce.copy_from_slice(&base_nonce_vec);

    Ok(HpkeContext { aead, key, base_nonce, seq })
}

/// Sender-side setup output: the encapsulated key plus the ready context
pub struct SetupResult {
    /// Encapsulated ephemeral key, sent to the receiver
    pub enc: Vec<u8>,
    /// Sealing context
    pub context: HpkeContext,
}

/// Sender setup: encapsulate to `pk_r` and derive a sealing context
pub fn setup_with_encap(
    kem: KemId,
    kdf: KdfId,
    aead: AeadId,
    pk_r: &[u8],
    info: &[u8],
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<SetupResult, HpkeError> {
    let (shared_secret, enc) = encap(kem, pk_r, rng)?;
    let context = key_schedule(kem, kdf, aead, &shared_secret, info, 0)?;
    Ok(SetupResult { enc, context })
}

/// Receiver setup: decapsulate `enc` and derive an opening context starting
/// at sequence number `seq`
pub fn setup_with_decap(
    kem: KemId,
    kdf: KdfId,
    aead: AeadId,
    sk_r: &[u8; 32],
    enc: &[u8],
    info: &[u8],
    seq: u64,
) -> Result<HpkeContext, HpkeError> {
    let shared_secret = decap(kem, enc, sk_r)?;
    key_schedule(kem, kdf, aead, &shared_secret, info, seq)
}

/// Derive the X25519 public key for a receiver secret key
pub fn x25519_public_key(sk: &[u8; 32]) -> [u8; 32] {
    *PublicKey::from(&StaticSecret::from(*sk)).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const KEM: KemId = KemId::X25519HkdfSha256;

    fn receiver_keypair() -> ([u8; 32], [u8; 32]) {
        let sk = [0x42u8; 32];
        (sk, x25519_public_key(&sk))
    }

    #[test]
    fn test_seal_open_round_trip() {
        let (sk, pk) = receiver_keypair();
        let info = b"test info";
        let mut setup =
            setup_with_encap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &pk, info, &mut OsRng)
                .unwrap();
        let ct = setup.context.seal(b"aad", b"hello hpke").unwrap();
        assert_eq!(ct.len(), 10 + AeadId::Aes128Gcm.cipher_overhead());

        let mut rx =
            setup_with_decap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &sk, &setup.enc, info, 0)
                .unwrap();
        assert_eq!(rx.open(b"aad", &ct).unwrap(), b"hello hpke");
    }

    #[test]
    fn test_open_fails_on_wrong_aad() {
        let (sk, pk) = receiver_keypair();
        let mut setup =
            setup_with_encap(KEM, KdfId::HkdfSha384, AeadId::Aes256Gcm, &pk, b"i", &mut OsRng)
                .unwrap();
        let ct = setup.context.seal(b"aad", b"msg").unwrap();
        let mut rx =
            setup_with_decap(KEM, KdfId::HkdfSha384, AeadId::Aes256Gcm, &sk, &setup.enc, b"i", 0)
                .unwrap();
        assert_eq!(rx.open(b"other aad", &ct), Err(HpkeError::OpenFailed));
    }

    #[test]
    fn test_open_fails_on_wrong_info() {
        let (sk, pk) = receiver_keypair();
        let mut setup =
            setup_with_encap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &pk, b"info a", &mut OsRng)
                .unwrap();
        let ct = setup.context.seal(b"", b"msg").unwrap();
        let mut rx = setup_with_decap(
            KEM,
            KdfId::HkdfSha256,
            AeadId::Aes128Gcm,
            &sk,
            &setup.enc,
            b"info b",
            0,
        )
        .unwrap();
        assert!(rx.open(b"", &ct).is_err());
    }

    #[test]
    fn test_sequence_numbers_must_align() {
        let (sk, pk) = receiver_keypair();
        let mut setup =
            setup_with_encap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &pk, b"", &mut OsRng)
                .unwrap();
        let ct0 = setup.context.seal(b"", b"zero").unwrap();
        let ct1 = setup.context.seal(b"", b"one").unwrap();

        // A context resumed at seq 1 opens the second seal only.
        let mut rx =
            setup_with_decap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &sk, &setup.enc, b"", 1)
                .unwrap();
        assert!(rx.open(b"", &ct0).is_err());
        let mut rx =
            setup_with_decap(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm, &sk, &setup.enc, b"", 1)
                .unwrap();
        assert_eq!(rx.open(b"", &ct1).unwrap(), b"one");
    }

    #[test]
    fn test_registry_round_trips() {
        assert_eq!(KemId::from_u16(0x0020), Ok(KemId::X25519HkdfSha256));
        assert_eq!(KdfId::from_u16(0x0002), Ok(KdfId::HkdfSha384));
        assert_eq!(AeadId::from_u16(0x0001), Ok(AeadId::Aes128Gcm));
        assert!(KemId::from_u16(0x0010).is_err());
        assert!(AeadId::from_u16(0x0003).is_err());
    }

    #[test]
    fn test_suite_id_layout() {
        let sid = suite_id(KEM, KdfId::HkdfSha256, AeadId::Aes128Gcm);
        assert_eq!(&sid[..4], b"HPKE");
        assert_eq!(&sid[4..], &[0x00, 0x20, 0x00, 0x01]);
    }

    #[test]
    fn test_invalid_public_key_length() {
        let err = setup_with_encap(
            KEM,
            KdfId::HkdfSha256,
            AeadId::Aes128Gcm,
            &[0u8; 31],
            b"",
            &mut OsRng,
        )
        .err()
        .unwrap();
        assert_eq!(err, HpkeError::InvalidPublicKey(31));
    }
}
