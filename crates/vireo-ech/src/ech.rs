//! The draft-15 Encrypted-Client-Hello flow: config negotiation, inner-hello
//! encryption and decryption, and the acceptance confirmation signal.

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::config::{EchConfig, HpkeSymmetricCipherSuite, NegotiatedEchConfig};
use crate::error::{EchError, OuterExtensionsError};
use crate::hpke::{self, AeadId, HpkeContext, HpkeError, KdfId, KemId};
use crate::msg::{
    encode_handshake, find_extension, ClientHello, Extension, ExtensionType, HandshakeType,
    HelloRetryRequest, OuterExtensions, ServerHello, ServerNameList,
};
use crate::transcript::{HandshakeContext, KeyScheduler, ACCEPT_CONFIRMATION_SIZE};
use crate::wire::{self, Cursor, WireError};

const ECH_CLIENT_HELLO_OUTER: u8 = 0;

/// The `encrypted_client_hello` extension carried by the outer ClientHello
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterEchClientHello {
    /// Negotiated KDF/AEAD pair
    pub cipher_suite: HpkeSymmetricCipherSuite,
    /// Config id being used
    pub config_id: u8,
    /// HPKE encapsulated key; empty on an HRR retry
    pub enc: Vec<u8>,
    /// Sealed inner ClientHello
    pub payload: Vec<u8>,
}

impl OuterEchClientHello {
    /// Encode as an extension
    pub fn to_extension(&self) -> Result<Extension, WireError> {
        let mut body = Vec::new();
        body.push(ECH_CLIENT_HELLO_OUTER);
        wire::put_u16(&mut body, self.cipher_suite.kdf_id);
        wire::put_u16(&mut body, self.cipher_suite.aead_id);
        body.push(self.config_id);
        wire::put_vec16(&mut body, &self.enc)?;
        wire::put_vec16(&mut body, &self.payload)?;
        Ok(Extension { extension_type: ExtensionType::ENCRYPTED_CLIENT_HELLO, data: body })
    }

    /// Decode from an extension body
    pub fn decode(data: &[u8]) -> Result<Self, EchError> {
        let mut c = Cursor::new(data);
        if c.read_u8()? != ECH_CLIENT_HELLO_OUTER {
            return Err(EchError::UnexpectedEchPayload);
        }
        let kdf_id = c.read_u16()?;
        let aead_id = c.read_u16()?;
        let config_id = c.read_u8()?;
        let enc = c.read_vec16()?.to_vec();
        let payload = c.read_vec16()?.to_vec();
        if !c.is_at_end() {
            return Err(WireError::TrailingBytes.into());
        }
        Ok(OuterEchClientHello {
            cipher_suite: HpkeSymmetricCipherSuite { kdf_id, aead_id },
            config_id,
            enc,
            payload,
        })
    }
}

// ── Config negotiation ──────────────────────────────────────────────────

/// Whether `name` is a valid DNS public name: dot-separated LDH labels,
/// none empty, none starting or ending with a hyphen.
pub fn is_valid_public_name(name: &[u8]) -> bool {
    if name.is_empty() {
        return false;
    }
    name.split(|&b| b == b'.').all(|label| {
        !label.is_empty()
            && label.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
            && label[0] != b'-'
            && label[label.len() - 1] != b'-'
    })
}

fn has_mandatory_extension(config: &EchConfig) -> bool {
    config.content.extensions.iter().any(|e| e.extension_type.0 & 0x8000 != 0)
}

/// Pick the first acceptable config: no mandatory extension, valid public
/// name, supported KEM, and a cipher suite whose AEAD is supported and
/// whose KDF is the one backing that AEAD's hash.
pub fn negotiate_ech_config(
    configs: &[EchConfig],
    supported_kems: &[u16],
    supported_aeads: &[u16],
) -> Option<NegotiatedEchConfig> {
    for config in configs {
        if has_mandatory_extension(config) {
            continue;
        }
        if !is_valid_public_name(&config.content.public_name) {
            continue;
        }
        let kc = &config.content.key_config;
        if !supported_kems.contains(&kc.kem_id) {
            continue;
        }
        for suite in &kc.cipher_suites {
            if !supported_aeads.contains(&suite.aead_id) {
                continue;
            }
            let (Some(aead), Some(kdf)) = (suite.aead(), suite.kdf()) else {
                continue;
            };
            if kdf != hpke::kdf_for_aead(aead) {
                continue;
            }
            return Some(NegotiatedEchConfig {
                config: config.clone(),
                config_id: kc.config_id,
                max_len: config.content.maximum_name_length,
                cipher_suite: *suite,
            });
        }
    }
    None
}

// ── HPKE setup ──────────────────────────────────────────────────────────

/// `"tls ech" || 0x00 || ECHConfig`
pub fn make_hpke_context_info_param(config: &EchConfig) -> Result<Vec<u8>, WireError> {
    let encoded = config.encode()?;
    let mut info = Vec::with_capacity(8 + encoded.len());
    info.extend_from_slice(b"tls ech");
    info.push(0);
    info.extend_from_slice(&encoded);
    Ok(info)
}

fn suite_algorithms(
    config: &EchConfig,
    suite: HpkeSymmetricCipherSuite,
) -> Result<(KemId, KdfId, AeadId), HpkeError> {
    Ok((
        KemId::from_u16(config.content.key_config.kem_id)?,
        KdfId::from_u16(suite.kdf_id)?,
        AeadId::from_u16(suite.aead_id)?,
    ))
}

/// Client-side HPKE setup output
pub struct EchHpkeSetup {
    /// Encapsulated key to place in the ECH extension
    pub enc: Vec<u8>,
    /// Sealing context
    pub context: HpkeContext,
}

/// Client side: encapsulate to the config's public key
pub fn construct_hpke_setup_result(
    negotiated: &NegotiatedEchConfig,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<EchHpkeSetup, EchError> {
    let (kem, kdf, aead) = suite_algorithms(&negotiated.config, negotiated.cipher_suite)?;
    let info = make_hpke_context_info_param(&negotiated.config)?;
    let setup = hpke::setup_with_encap(
        kem,
        kdf,
        aead,
        &negotiated.config.content.key_config.public_key,
        &info,
        rng,
    )?;
    Ok(EchHpkeSetup { enc: setup.enc, context: setup.context })
}

/// Server side: decapsulate `enc`, starting the context at `seq` (non-zero
/// after an HRR retry reuses the context)
pub fn setup_decryption_context(
    config: &EchConfig,
    cipher_suite: HpkeSymmetricCipherSuite,
    private_key: &[u8; 32],
    enc: &[u8],
    seq: u64,
) -> Result<HpkeContext, EchError> {
    let (kem, kdf, aead) = suite_algorithms(config, cipher_suite)?;
    let info = make_hpke_context_info_param(config)?;
    Ok(hpke::setup_with_decap(kem, kdf, aead, private_key, enc, &info, seq)?)
}

// ── Inner-hello encryption ──────────────────────────────────────────────

/// Padding to add to an encoded inner hello of length `encoded_len`.
///
/// With an SNI present the hostname is padded up to `max_len`; without one a
/// flat `max_len + 9` is added. The total is then rounded up to a multiple
/// of 32, so `(encoded_len + padding - 1) % 32 == 31` for any nonzero total.
pub fn calculate_ech_padding(
    chlo: &ClientHello,
    encoded_len: usize,
    max_len: u8,
) -> Result<usize, WireError> {
    let max_len = max_len as usize;
    let mut padding = match find_extension(&chlo.extensions, ExtensionType::SERVER_NAME) {
        Some(ext) => {
            let sni = ServerNameList::decode(&ext.data)?;
            max_len.saturating_sub(sni.hostname.len())
        }
        None => max_len + 9,
    };
    let padded_len = encoded_len + padding;
    padding += (32 - padded_len % 32) % 32;
    Ok(padding)
}

/// Rewrite extensions named in `outer_types` into a single
/// `ech_outer_extensions` reference list, placed where the first match was.
/// References are deduplicated and keep inner-hello order. A hello with no
/// matching extension is left untouched.
pub fn generate_and_replace_outer_extensions(
    inner: &mut ClientHello,
    outer_types: &[ExtensionType],
) -> Result<(), WireError> {
    let mut refs: Vec<ExtensionType> = Vec::new();
    for ext in &inner.extensions {
        if outer_types.contains(&ext.extension_type) && !refs.contains(&ext.extension_type) {
            refs.push(ext.extension_type);
        }
    }
    if refs.is_empty() {
        return Ok(());
    }
    let reference_ext = OuterExtensions { types: refs.clone() }.to_extension()?;

    let mut replaced = false;
    let mut kept = Vec::with_capacity(inner.extensions.len());
    for ext in inner.extensions.drain(..) {
        if refs.contains(&ext.extension_type) {
            if !replaced {
                kept.push(reference_ext.clone());
                replaced = true;
            }
        } else {
            kept.push(ext);
        }
    }
    inner.extensions = kept;
    Ok(())
}

fn encrypt_client_hello_shared(
    inner: &ClientHello,
    outer: &ClientHello,
    negotiated: &NegotiatedEchConfig,
    context: &mut HpkeContext,
    enc: Vec<u8>,
    outer_types: &[ExtensionType],
    grease_psk: Option<&Extension>,
) -> Result<OuterEchClientHello, EchError> {
    let aead = AeadId::from_u16(negotiated.cipher_suite.aead_id)?;

    // Session id is restored from the outer hello on decryption.
    let mut inner_copy = inner.clone();
    inner_copy.legacy_session_id.clear();
    generate_and_replace_outer_extensions(&mut inner_copy, outer_types)?;

    let mut encoded_inner = inner_copy.encode()?;
    let padding = calculate_ech_padding(inner, encoded_inner.len(), negotiated.max_len)?;
    encoded_inner.resize(encoded_inner.len() + padding, 0);

    let mut ech = OuterEchClientHello {
        cipher_suite: negotiated.cipher_suite,
        config_id: negotiated.config_id,
        enc,
        payload: vec![0; encoded_inner.len() + aead.cipher_overhead()],
    };

    let mut outer_for_aad = outer.clone();
    outer_for_aad.extensions.push(ech.to_extension()?);
    if let Some(psk) = grease_psk {
        outer_for_aad.extensions.push(psk.clone());
    }
    let aad = outer_for_aad.encode()?;

    ech.payload = context.seal(&aad, &encoded_inner)?;
    Ok(ech)
}

/// Seal the inner hello for a first flight
pub fn encrypt_client_hello(
    inner: &ClientHello,
    outer: &ClientHello,
    negotiated: &NegotiatedEchConfig,
    context: &mut HpkeContext,
    enc: Vec<u8>,
    outer_types: &[ExtensionType],
    grease_psk: Option<&Extension>,
) -> Result<OuterEchClientHello, EchError> {
    encrypt_client_hello_shared(inner, outer, negotiated, context, enc, outer_types, grease_psk)
}

/// Seal the inner hello for the retry after an HRR; `enc` is empty because
/// the server already holds the context
pub fn encrypt_client_hello_hrr(
    inner: &ClientHello,
    outer: &ClientHello,
    negotiated: &NegotiatedEchConfig,
    context: &mut HpkeContext,
    outer_types: &[ExtensionType],
    grease_psk: Option<&Extension>,
) -> Result<OuterEchClientHello, EchError> {
    encrypt_client_hello_shared(
        inner,
        outer,
        negotiated,
        context,
        Vec::new(),
        outer_types,
        grease_psk,
    )
}

// ── Decryption ──────────────────────────────────────────────────────────

/// Expand an `ech_outer_extensions` reference list against the outer hello's
/// extensions. Referents are resolved by a single forward scan, so the
/// references must appear in the outer hello in order. One seen-set covers
/// every type the expanded hello would carry, so a literal extension and a
/// reference to the same type is as much a duplicate as two references.
pub fn substitute_outer_extensions(
    inner: &mut ClientHello,
    outer_exts: &[Extension],
) -> Result<(), EchError> {
    let mut seen: Vec<ExtensionType> = Vec::with_capacity(inner.extensions.len());
    let mut expanded: Vec<Extension> = Vec::with_capacity(inner.extensions.len());
    let mut outer_iter = outer_exts.iter();
    for ext in &inner.extensions {
        let ty = ext.extension_type;
        if seen.contains(&ty) {
            if ty == ExtensionType::ECH_OUTER_EXTENSIONS {
                return Err(OuterExtensionsError::DuplicateOuterExtensions.into());
            }
            return Err(OuterExtensionsError::DuplicateExtension(ty.0).into());
        }
        seen.push(ty);
        if ty != ExtensionType::ECH_OUTER_EXTENSIONS {
            expanded.push(ext.clone());
            continue;
        }
        let refs = OuterExtensions::decode(&ext.data)?;
        for ref_ty in refs.types {
            if ref_ty == ExtensionType::ENCRYPTED_CLIENT_HELLO {
                return Err(OuterExtensionsError::SelfReference.into());
            }
            if seen.contains(&ref_ty) {
                return Err(OuterExtensionsError::DuplicateExtension(ref_ty.0).into());
            }
            seen.push(ref_ty);
            let referent = outer_iter
                .by_ref()
                .find(|e| e.extension_type == ref_ty)
                .ok_or(OuterExtensionsError::MissingReferent(ref_ty.0))?;
            expanded.push(referent.clone());
        }
    }
    inner.extensions = expanded;
    Ok(())
}

/// Open the sealed inner hello carried by `ech` and reconstruct it fully:
/// padding checked, session id restored, outer-extension references expanded
pub fn decrypt_ech_with_context(
    outer: &ClientHello,
    ech: &OuterEchClientHello,
    context: &mut HpkeContext,
) -> Result<ClientHello, EchError> {
    let zeroed = OuterEchClientHello {
        cipher_suite: ech.cipher_suite,
        config_id: ech.config_id,
        enc: ech.enc.clone(),
        payload: vec![0; ech.payload.len()],
    };
    let mut outer_for_aad = outer.clone();
    let slot = outer_for_aad
        .extensions
        .iter_mut()
        .find(|e| e.extension_type == ExtensionType::ENCRYPTED_CLIENT_HELLO)
        .ok_or(EchError::MissingEchExtension)?;
    *slot = zeroed.to_extension()?;
    let aad = outer_for_aad.encode()?;

    let padded_inner = context.open(&aad, &ech.payload)?;
    let mut cursor = Cursor::new(&padded_inner);
    let mut inner = ClientHello::decode(&mut cursor)?;
    cursor.skip_while(|b| b == 0);
    if !cursor.is_at_end() {
        return Err(EchError::NonZeroPadding);
    }

    inner.legacy_session_id = outer.legacy_session_id.clone();
    substitute_outer_extensions(&mut inner, &outer.extensions)?;
    Ok(inner)
}

// ── Acceptance confirmation ─────────────────────────────────────────────

/// ServerHello with the confirmation bytes zeroed
pub fn make_dummy_server_hello(shlo: &ServerHello) -> ServerHello {
    let mut dummy = shlo.clone();
    for b in &mut dummy.random[32 - ACCEPT_CONFIRMATION_SIZE..] {
        *b = 0;
    }
    dummy
}

/// HelloRetryRequest with the ECH extension content replaced by zeroes
pub fn make_dummy_hrr(hrr: &HelloRetryRequest) -> Result<HelloRetryRequest, EchError> {
    let mut dummy = hrr.clone();
    let ext = dummy
        .extensions
        .iter_mut()
        .find(|e| e.extension_type == ExtensionType::ENCRYPTED_CLIENT_HELLO)
        .ok_or(EchError::MissingEchExtension)?;
    ext.data = vec![0; ACCEPT_CONFIRMATION_SIZE];
    Ok(dummy)
}

/// Derive the 8-byte confirmation for a transcript extended by the framed
/// dummy message
pub fn calculate_accept_confirmation(
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
    label: &str,
    framed_dummy: &[u8],
) -> Result<[u8; ACCEPT_CONFIRMATION_SIZE], EchError> {
    let mut context = context.clone();
    context.append_message(framed_dummy);
    let secret = scheduler.derive_secret(label, &context.hash())?;
    if secret.len() < ACCEPT_CONFIRMATION_SIZE {
        return Err(EchError::AcceptSecretTooSmall(secret.len()));
    }
    let mut confirmation = [0u8; ACCEPT_CONFIRMATION_SIZE];
    confirmation.copy_from_slice(&secret[..ACCEPT_CONFIRMATION_SIZE]);
    Ok(confirmation)
}

const SERVER_HELLO_LABEL: &str = "ech accept confirmation";
const HRR_LABEL: &str = "hrr ech accept confirmation";

fn server_hello_confirmation(
    shlo: &ServerHello,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<[u8; ACCEPT_CONFIRMATION_SIZE], EchError> {
    let dummy = make_dummy_server_hello(shlo);
    let framed = encode_handshake(HandshakeType::ServerHello, &dummy.encode()?)?;
    calculate_accept_confirmation(scheduler, context, SERVER_HELLO_LABEL, &framed)
}

fn hrr_confirmation(
    hrr: &HelloRetryRequest,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<[u8; ACCEPT_CONFIRMATION_SIZE], EchError> {
    let dummy = make_dummy_hrr(hrr)?;
    let framed = encode_handshake(HandshakeType::ServerHello, &dummy.encode()?)?;
    calculate_accept_confirmation(scheduler, context, HRR_LABEL, &framed)
}

/// Whether the last 8 bytes of `ServerHello.random` carry the confirmation
pub fn check_ech_accepted(
    shlo: &ServerHello,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<bool, EchError> {
    let confirmation = server_hello_confirmation(shlo, scheduler, context)?;
    let carried = &shlo.random[32 - ACCEPT_CONFIRMATION_SIZE..];
    Ok(bool::from(confirmation.ct_eq(carried)))
}

/// Whether the HRR's ECH extension carries the confirmation; an HRR without
/// the extension never accepted
pub fn check_ech_accepted_hrr(
    hrr: &HelloRetryRequest,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<bool, EchError> {
    let Some(ext) = find_extension(&hrr.extensions, ExtensionType::ENCRYPTED_CLIENT_HELLO) else {
        return Ok(false);
    };
    if ext.data.len() != ACCEPT_CONFIRMATION_SIZE {
        return Ok(false);
    }
    let carried = ext.data.clone();
    let confirmation = hrr_confirmation(hrr, scheduler, context)?;
    Ok(bool::from(confirmation.ct_eq(&carried)))
}

/// Server side: write the confirmation into the last 8 bytes of the random
pub fn set_accept_confirmation(
    shlo: &mut ServerHello,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<(), EchError> {
    let confirmation = server_hello_confirmation(shlo, scheduler, context)?;
    shlo.random[32 - ACCEPT_CONFIRMATION_SIZE..].copy_from_slice(&confirmation);
    Ok(())
}

/// Server side: write the confirmation into the HRR's ECH extension,
/// appending the extension when absent
pub fn set_accept_confirmation_hrr(
    hrr: &mut HelloRetryRequest,
    scheduler: &KeyScheduler,
    context: &HandshakeContext,
) -> Result<(), EchError> {
    if find_extension(&hrr.extensions, ExtensionType::ENCRYPTED_CLIENT_HELLO).is_none() {
        hrr.extensions.push(Extension {
            extension_type: ExtensionType::ENCRYPTED_CLIENT_HELLO,
            data: vec![0; ACCEPT_CONFIRMATION_SIZE],
        });
    }
    let confirmation = hrr_confirmation(hrr, scheduler, context)?;
    let ext = hrr
        .extensions
        .iter_mut()
        .find(|e| e.extension_type == ExtensionType::ENCRYPTED_CLIENT_HELLO)
        .ok_or(EchError::MissingEchExtension)?;
    ext.data = confirmation.to_vec();
    Ok(())
}
