//! `ECHConfig` structures and their TLS presentation-language encoding
//! (draft-ietf-tls-esni-15).

use crate::hpke::{AeadId, KdfId};
use crate::msg::{put_extensions, read_extensions, Extension};
use crate::wire::{self, Cursor, WireError};

/// ECH wire version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchVersion {
    /// draft-ietf-tls-esni-15
    Draft15,
}

impl EchVersion {
    /// Wire code point
    pub fn to_u16(self) -> u16 {
        match self {
            EchVersion::Draft15 => 0xfe0d,
        }
    }

    /// Parse a wire code point
    pub fn from_u16(v: u16) -> Result<Self, WireError> {
        match v {
            0xfe0d => Ok(EchVersion::Draft15),
            other => Err(WireError::UnknownEchVersion(other)),
        }
    }
}

/// A KDF/AEAD pairing offered by an `ECHConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpkeSymmetricCipherSuite {
    /// KDF code point
    pub kdf_id: u16,
    /// AEAD code point
    pub aead_id: u16,
}

impl HpkeSymmetricCipherSuite {
    /// Typed KDF id, if supported
    pub fn kdf(&self) -> Option<KdfId> {
        KdfId::from_u16(self.kdf_id).ok()
    }

    /// Typed AEAD id, if supported
    pub fn aead(&self) -> Option<AeadId> {
        AeadId::from_u16(self.aead_id).ok()
    }
}

/// `HpkeKeyConfig` from the ECH draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpkeKeyConfig {
    /// One-byte identifier the client echoes so the server can find the key
    pub config_id: u8,
    /// KEM code point
    pub kem_id: u16,
    /// KEM public key bytes
    pub public_key: Vec<u8>,
    /// Offered symmetric suites, in server preference order
    pub cipher_suites: Vec<HpkeSymmetricCipherSuite>,
}

/// `ECHConfigContents` from the ECH draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchConfigContent {
    /// Key configuration
    pub key_config: HpkeKeyConfig,
    /// Padding target for encrypted SNI values
    pub maximum_name_length: u8,
    /// Name presented in the outer ClientHello SNI
    pub public_name: Vec<u8>,
    /// Config extensions; a type with the high bit set is mandatory
    pub extensions: Vec<Extension>,
}

/// A complete versioned `ECHConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchConfig {
    /// Wire version
    pub version: EchVersion,
    /// Config body
    pub content: EchConfigContent,
}

impl EchConfig {
    /// Serialize as it appears inside an `ECHConfigList`
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let kc = &self.content.key_config;
        let mut body = Vec::new();
        body.push(kc.config_id);
        wire::put_u16(&mut body, kc.kem_id);
        wire::put_vec16(&mut body, &kc.public_key)?;
        let mut suites = Vec::with_capacity(kc.cipher_suites.len() * 4);
        for suite in &kc.cipher_suites {
            wire::put_u16(&mut suites, suite.kdf_id);
            wire::put_u16(&mut suites, suite.aead_id);
        }
        wire::put_vec16(&mut body, &suites)?;
        body.push(self.content.maximum_name_length);
        wire::put_vec8(&mut body, &self.content.public_name)?;
        put_extensions(&mut body, &self.content.extensions)?;

        let mut out = Vec::with_capacity(4 + body.len());
        wire::put_u16(&mut out, self.version.to_u16());
        wire::put_vec16(&mut out, &body)?;
        Ok(out)
    }

    /// Parse one `ECHConfig` from the cursor
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, WireError> {
        let version = EchVersion::from_u16(cur.read_u16()?)?;
        let body = cur.read_vec16()?;
        let mut body = Cursor::new(body);

        let config_id = body.read_u8()?;
        let kem_id = body.read_u16()?;
        let public_key = body.read_vec16()?.to_vec();
        let suites_raw = body.read_vec16()?;
        if suites_raw.len() % 4 != 0 {
            return Err(WireError::BadLength { len: suites_raw.len() });
        }
        let mut suites_cur = Cursor::new(suites_raw);
        let mut cipher_suites = Vec::with_capacity(suites_raw.len() / 4);
        while !suites_cur.is_at_end() {
            cipher_suites.push(HpkeSymmetricCipherSuite {
                kdf_id: suites_cur.read_u16()?,
                aead_id: suites_cur.read_u16()?,
            });
        }
        let maximum_name_length = body.read_u8()?;
        let public_name = body.read_vec8()?.to_vec();
        let extensions = read_extensions(&mut body)?;
        if !body.is_at_end() {
            return Err(WireError::TrailingBytes);
        }

        Ok(EchConfig {
            version,
            content: EchConfigContent {
                key_config: HpkeKeyConfig { config_id, kem_id, public_key, cipher_suites },
                maximum_name_length,
                public_name,
                extensions,
            },
        })
    }
}

/// Parse an `ECHConfigList` (vec16 of configs)
pub fn decode_config_list(data: &[u8]) -> Result<Vec<EchConfig>, WireError> {
    let mut cur = Cursor::new(data);
    let body = cur.read_vec16()?;
    if !cur.is_at_end() {
        return Err(WireError::TrailingBytes);
    }
    let mut inner = Cursor::new(body);
    let mut configs = Vec::new();
    while !inner.is_at_end() {
        configs.push(EchConfig::decode(&mut inner)?);
    }
    Ok(configs)
}

/// A config the client has accepted, with the suite it will use
#[derive(Debug, Clone)]
pub struct NegotiatedEchConfig {
    /// The accepted config
    pub config: EchConfig,
    /// Echoed config id
    pub config_id: u8,
    /// Padding target from the config
    pub max_len: u8,
    /// The selected KDF/AEAD pair
    pub cipher_suite: HpkeSymmetricCipherSuite,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_config() -> EchConfig {
        EchConfig {
            version: EchVersion::Draft15,
            content: EchConfigContent {
                key_config: HpkeKeyConfig {
                    config_id: 7,
                    kem_id: 0x0020,
                    public_key: vec![0xaa; 32],
                    cipher_suites: vec![HpkeSymmetricCipherSuite {
                        kdf_id: 0x0001,
                        aead_id: 0x0001,
                    }],
                },
                maximum_name_length: 100,
                public_name: b"public.example.com".to_vec(),
                extensions: vec![],
            },
        }
    }

    #[test]
    fn test_config_encode_decode_round_trip() {
        let config = sample_config();
        let bytes = config.encode().unwrap();
        let mut cur = Cursor::new(&bytes);
        let decoded = EchConfig::decode(&mut cur).unwrap();
        assert!(cur.is_at_end());
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_config_encode_header() {
        let bytes = sample_config().encode().unwrap();
        // version fe0d, then a u16 length covering the rest
        assert_eq!(&bytes[..2], &[0xfe, 0x0d]);
        let len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        assert_eq!(len, bytes.len() - 4);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = sample_config().encode().unwrap();
        bytes[0] = 0xfe;
        bytes[1] = 0x0a;
        let mut cur = Cursor::new(&bytes);
        assert!(matches!(
            EchConfig::decode(&mut cur),
            Err(WireError::UnknownEchVersion(0xfe0a))
        ));
    }

    #[test]
    fn test_config_list_round_trip() {
        let config = sample_config();
        let encoded = config.encode().unwrap();
        let mut list = Vec::new();
        wire::put_vec16(&mut list, &[encoded.clone(), encoded].concat()).unwrap();
        let configs = decode_config_list(&list).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0], configs[1]);
    }

    #[test]
    fn test_ragged_cipher_suites_rejected() {
        let mut bytes = sample_config().encode().unwrap();
        // layout: ver(2) len(2) config_id(1) kem(2) pklen(2) pk(32) suiteslen(2)
        let suites_len_at = 2 + 2 + 1 + 2 + 2 + 32;
        bytes[suites_len_at + 1] = 3;
        let mut cur = Cursor::new(&bytes);
        assert!(EchConfig::decode(&mut cur).is_err());
    }
}
