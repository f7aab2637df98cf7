//! Handshake messages and extensions the ECH flow touches.

use crate::wire::{put_u16, put_u24, put_u32, put_vec16, put_vec8, Cursor, WireError};

/// TLS extension type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    /// `server_name`
    pub const SERVER_NAME: ExtensionType = ExtensionType(0);
    /// `supported_groups`
    pub const SUPPORTED_GROUPS: ExtensionType = ExtensionType(10);
    /// `key_share`
    pub const KEY_SHARE: ExtensionType = ExtensionType(51);
    /// `supported_versions`
    pub const SUPPORTED_VERSIONS: ExtensionType = ExtensionType(43);
    /// `pre_shared_key`
    pub const PRE_SHARED_KEY: ExtensionType = ExtensionType(41);
    /// `encrypted_client_hello`
    pub const ENCRYPTED_CLIENT_HELLO: ExtensionType = ExtensionType(0xfe0d);
    /// `ech_outer_extensions`
    pub const ECH_OUTER_EXTENSIONS: ExtensionType = ExtensionType(0xfd00);
}

/// A raw extension: type code plus opaque body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Extension type code
    pub extension_type: ExtensionType,
    /// Encoded extension body
    pub data: Vec<u8>,
}

/// First extension with the given type, if present
pub fn find_extension(exts: &[Extension], ty: ExtensionType) -> Option<&Extension> {
    exts.iter().find(|e| e.extension_type == ty)
}

/// Write an extension list (vec16 of type/body pairs)
pub fn put_extensions(out: &mut Vec<u8>, exts: &[Extension]) -> Result<(), WireError> {
    let mut body = Vec::new();
    for ext in exts {
        put_u16(&mut body, ext.extension_type.0);
        put_vec16(&mut body, &ext.data)?;
    }
    put_vec16(out, &body)
}

/// Read an extension list (vec16 of type/body pairs)
pub fn read_extensions(c: &mut Cursor<'_>) -> Result<Vec<Extension>, WireError> {
    let block = c.read_vec16()?;
    let mut inner = Cursor::new(block);
    let mut exts = Vec::new();
    while !inner.is_at_end() {
        let ty = inner.read_u16()?;
        let data = inner.read_vec16()?.to_vec();
        exts.push(Extension { extension_type: ExtensionType(ty), data });
    }
    Ok(exts)
}

/// TLS 1.3 ClientHello
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// `legacy_version`, always 0x0303
    pub legacy_version: u16,
    /// 32 random bytes
    pub random: [u8; 32],
    /// `legacy_session_id`
    pub legacy_session_id: Vec<u8>,
    /// Offered cipher suites
    pub cipher_suites: Vec<u16>,
    /// `legacy_compression_methods`
    pub legacy_compression_methods: Vec<u8>,
    /// Extensions in offer order
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    /// Encode the ClientHello body (no handshake header)
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        put_u16(&mut out, self.legacy_version);
        out.extend_from_slice(&self.random);
        put_vec8(&mut out, &self.legacy_session_id)?;
        let mut suites = Vec::new();
        for s in &self.cipher_suites {
            put_u16(&mut suites, *s);
        }
        put_vec16(&mut out, &suites)?;
        put_vec8(&mut out, &self.legacy_compression_methods)?;
        put_extensions(&mut out, &self.extensions)?;
        Ok(out)
    }

    /// Decode a ClientHello body from `c`, leaving trailing bytes in place
    pub fn decode(c: &mut Cursor<'_>) -> Result<Self, WireError> {
        let legacy_version = c.read_u16()?;
        let mut random = [0u8; 32];
        random.copy_from_slice(c.read_bytes(32)?);
        let legacy_session_id = c.read_vec8()?.to_vec();

        let suites_block = c.read_vec16()?;
        let mut suites_cursor = Cursor::new(suites_block);
        let mut cipher_suites = Vec::new();
        while !suites_cursor.is_at_end() {
            cipher_suites.push(suites_cursor.read_u16()?);
        }

        let legacy_compression_methods = c.read_vec8()?.to_vec();
        let extensions = read_extensions(c)?;
        Ok(ClientHello {
            legacy_version,
            random,
            legacy_session_id,
            cipher_suites,
            legacy_compression_methods,
            extensions,
        })
    }
}

/// TLS 1.3 ServerHello
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// `legacy_version`, always 0x0303
    pub legacy_version: u16,
    /// 32 random bytes; the last 8 carry the ECH acceptance signal
    pub random: [u8; 32],
    /// Echo of the client's session id
    pub legacy_session_id_echo: Vec<u8>,
    /// Selected cipher suite
    pub cipher_suite: u16,
    /// `legacy_compression_method`
    pub legacy_compression_method: u8,
    /// Extensions
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    /// Encode the ServerHello body (no handshake header)
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        put_u16(&mut out, self.legacy_version);
        out.extend_from_slice(&self.random);
        put_vec8(&mut out, &self.legacy_session_id_echo)?;
        put_u16(&mut out, self.cipher_suite);
        out.push(self.legacy_compression_method);
        put_extensions(&mut out, &self.extensions)?;
        Ok(out)
    }
}

/// TLS 1.3 HelloRetryRequest.
///
/// On the wire an HRR is a ServerHello with a well-known random; it is kept
/// as its own type because the ECH acceptance signal lives in an extension
/// here rather than in the random.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRetryRequest {
    /// `legacy_version`, always 0x0303
    pub legacy_version: u16,
    /// Echo of the client's session id
    pub legacy_session_id_echo: Vec<u8>,
    /// Selected cipher suite
    pub cipher_suite: u16,
    /// `legacy_compression_method`
    pub legacy_compression_method: u8,
    /// Extensions; ECH acceptance lives in `encrypted_client_hello`
    pub extensions: Vec<Extension>,
}

impl HelloRetryRequest {
    /// The fixed HRR random value from RFC 8446 §4.1.3
    pub const RANDOM: [u8; 32] = [
        0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8,
        0x91, 0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8,
        0x33, 0x9c,
    ];

    /// Encode the HelloRetryRequest body (no handshake header)
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        put_u16(&mut out, self.legacy_version);
        out.extend_from_slice(&Self::RANDOM);
        put_vec8(&mut out, &self.legacy_session_id_echo)?;
        put_u16(&mut out, self.cipher_suite);
        out.push(self.legacy_compression_method);
        put_extensions(&mut out, &self.extensions)?;
        Ok(out)
    }
}

/// Handshake message type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeType {
    /// client_hello(1)
    ClientHello = 1,
    /// server_hello(2)
    ServerHello = 2,
}

/// Frame an encoded message body as a handshake message (type + u24 length)
pub fn encode_handshake(ty: HandshakeType, body: &[u8]) -> Result<Vec<u8>, WireError> {
    if body.len() >= 1 << 24 {
        return Err(WireError::ValueTooLong { len: body.len(), bits: 24 });
    }
    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(ty as u8);
    put_u24(&mut out, body.len() as u32);
    out.extend_from_slice(body);
    Ok(out)
}

// ── Typed extensions ────────────────────────────────────────────────────

/// `server_name` extension: a single-entry host name list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNameList {
    /// DNS host name
    pub hostname: Vec<u8>,
}

impl ServerNameList {
    /// Encode as an extension
    pub fn to_extension(&self) -> Result<Extension, WireError> {
        let mut entry = Vec::new();
        entry.push(0); // name_type host_name(0)
        put_vec16(&mut entry, &self.hostname)?;
        let mut body = Vec::new();
        put_vec16(&mut body, &entry)?;
        Ok(Extension { extension_type: ExtensionType::SERVER_NAME, data: body })
    }

    /// Decode from an extension body
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut c = Cursor::new(data);
        let list = c.read_vec16()?;
        let mut lc = Cursor::new(list);
        let _name_type = lc.read_u8()?;
        let hostname = lc.read_vec16()?.to_vec();
        Ok(ServerNameList { hostname })
    }
}

/// One offered PSK identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskIdentity {
    /// Opaque identity
    pub psk_identity: Vec<u8>,
    /// Obfuscated ticket age
    pub obfuscated_ticket_age: u32,
}

/// One PSK binder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskBinder {
    /// Binder HMAC bytes
    pub binder: Vec<u8>,
}

/// `pre_shared_key` extension as offered by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPresharedKey {
    /// Offered identities
    pub identities: Vec<PskIdentity>,
    /// Binders, one per identity
    pub binders: Vec<PskBinder>,
}

impl ClientPresharedKey {
    /// Encode as an extension
    pub fn to_extension(&self) -> Result<Extension, WireError> {
        let mut ids = Vec::new();
        for id in &self.identities {
            put_vec16(&mut ids, &id.psk_identity)?;
            put_u32(&mut ids, id.obfuscated_ticket_age);
        }
        let mut body = Vec::new();
        put_vec16(&mut body, &ids)?;

        let mut binders = Vec::new();
        for b in &self.binders {
            put_vec8(&mut binders, &b.binder)?;
        }
        put_vec16(&mut body, &binders)?;
        Ok(Extension { extension_type: ExtensionType::PRE_SHARED_KEY, data: body })
    }

    /// Decode from an extension body
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut c = Cursor::new(data);

        let ids_block = c.read_vec16()?;
        let mut ic = Cursor::new(ids_block);
        let mut identities = Vec::new();
        while !ic.is_at_end() {
            let psk_identity = ic.read_vec16()?.to_vec();
            let obfuscated_ticket_age = ic.read_u32()?;
            identities.push(PskIdentity { psk_identity, obfuscated_ticket_age });
        }

        let binders_block = c.read_vec16()?;
        let mut bc = Cursor::new(binders_block);
        let mut binders = Vec::new();
        while !bc.is_at_end() {
            binders.push(PskBinder { binder: bc.read_vec8()?.to_vec() });
        }
        Ok(ClientPresharedKey { identities, binders })
    }
}

/// `ech_outer_extensions`: ordered references into the outer hello
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OuterExtensions {
    /// Referenced extension types, in inner-hello order
    pub types: Vec<ExtensionType>,
}

impl OuterExtensions {
    /// Encode as an extension
    pub fn to_extension(&self) -> Result<Extension, WireError> {
        let mut list = Vec::new();
        for t in &self.types {
            put_u16(&mut list, t.0);
        }
        let mut body = Vec::new();
        put_vec8(&mut body, &list)?;
        Ok(Extension { extension_type: ExtensionType::ECH_OUTER_EXTENSIONS, data: body })
    }

    /// Decode from an extension body
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut c = Cursor::new(data);
        let list = c.read_vec8()?;
        if list.len() % 2 != 0 || !c.is_at_end() {
            return Err(WireError::TrailingBytes);
        }
        let mut lc = Cursor::new(list);
        let mut types = Vec::new();
        while !lc.is_at_end() {
            types.push(ExtensionType(lc.read_u16()?));
        }
        Ok(OuterExtensions { types })
    }
}
