//! End-to-end ECH flows against a real X25519 keypair: encrypt/decrypt
//! round trips, HRR retries, and acceptance confirmation.

use rand::rngs::OsRng;
use vireo_ech::hpke::x25519_public_key;
use vireo_ech::msg::{
    encode_handshake, ClientPresharedKey, HandshakeType, PskBinder, PskIdentity, ServerNameList,
};
use vireo_ech::{
    check_ech_accepted, check_ech_accepted_hrr, construct_hpke_setup_result,
    decrypt_ech_with_context, encrypt_client_hello, encrypt_client_hello_hrr,
    generate_grease_psk, negotiate_ech_config, set_accept_confirmation,
    set_accept_confirmation_hrr, setup_decryption_context, ClientHello, EchConfig,
    EchConfigContent, EchVersion, Extension, ExtensionType, HandshakeContext, HelloRetryRequest,
    HpkeKeyConfig, HpkeSymmetricCipherSuite, KdfId, KeyScheduler, NegotiatedEchConfig,
    ServerHello, ACCEPT_CONFIRMATION_SIZE,
};

const SERVER_KEY: [u8; 32] = [7u8; 32];
const KEMS: &[u16] = &[0x0020];
const AEADS: &[u16] = &[0x0001, 0x0002];

fn served_config() -> EchConfig {
    EchConfig {
        version: EchVersion::Draft15,
        content: EchConfigContent {
            key_config: HpkeKeyConfig {
                config_id: 42,
                kem_id: 0x0020,
                public_key: x25519_public_key(&SERVER_KEY).to_vec(),
                cipher_suites: vec![HpkeSymmetricCipherSuite { kdf_id: 0x0001, aead_id: 0x0001 }],
            },
            maximum_name_length: 64,
            public_name: b"public.example.com".to_vec(),
            extensions: vec![],
        },
    }
}

fn negotiated() -> NegotiatedEchConfig {
    negotiate_ech_config(&[served_config()], KEMS, AEADS).expect("config should be acceptable")
}

fn ext(ty: ExtensionType, data: &[u8]) -> Extension {
    Extension { extension_type: ty, data: data.to_vec() }
}

fn inner_hello() -> ClientHello {
    ClientHello {
        legacy_version: 0x0303,
        random: [0x11; 32],
        legacy_session_id: vec![1, 2, 3, 4],
        cipher_suites: vec![0x1301, 0x1302],
        legacy_compression_methods: vec![0],
        extensions: vec![
            ServerNameList { hostname: b"secret.example".to_vec() }.to_extension().unwrap(),
            ext(ExtensionType::KEY_SHARE, b"client key share"),
            ext(ExtensionType::SUPPORTED_GROUPS, b"groups"),
        ],
    }
}

fn outer_hello() -> ClientHello {
    ClientHello {
        legacy_version: 0x0303,
        random: [0x22; 32],
        legacy_session_id: vec![1, 2, 3, 4],
        cipher_suites: vec![0x1301, 0x1302],
        legacy_compression_methods: vec![0],
        extensions: vec![
            ServerNameList { hostname: b"public.example.com".to_vec() }.to_extension().unwrap(),
            ext(ExtensionType::KEY_SHARE, b"client key share"),
            ext(ExtensionType::SUPPORTED_GROUPS, b"groups"),
        ],
    }
}

const COMPRESSED: &[ExtensionType] =
    &[ExtensionType::KEY_SHARE, ExtensionType::SUPPORTED_GROUPS];

#[test]
fn test_encrypt_decrypt_round_trip() {
    let negotiated = negotiated();
    let inner = inner_hello();
    let outer = outer_hello();

    let mut setup = construct_hpke_setup_result(&negotiated, &mut OsRng).unwrap();
    let ech = encrypt_client_hello(
        &inner,
        &outer,
        &negotiated,
        &mut setup.context,
        setup.enc.clone(),
        COMPRESSED,
        None,
    )
    .unwrap();
    assert_eq!(ech.config_id, 42);
    assert_eq!(ech.enc, setup.enc);

    // padded plaintext length sits on the 32-byte boundary rule
    let padded_len = ech.payload.len() - 16;
    assert_eq!((padded_len - 1) % 32, 31);

    let mut outer_wire = outer.clone();
    outer_wire.extensions.push(ech.to_extension().unwrap());

    let mut server_ctx =
        setup_decryption_context(&negotiated.config, ech.cipher_suite, &SERVER_KEY, &ech.enc, 0)
            .unwrap();
    let decrypted = decrypt_ech_with_context(&outer_wire, &ech, &mut server_ctx).unwrap();
    assert_eq!(decrypted, inner);
}

#[test]
fn test_round_trip_with_grease_psk() {
    let negotiated = negotiated();
    let mut inner = inner_hello();
    let psk = ClientPresharedKey {
        identities: vec![PskIdentity { psk_identity: vec![9u8; 20], obfuscated_ticket_age: 77 }],
        binders: vec![PskBinder { binder: vec![8u8; 32] }],
    };
    inner.extensions.push(psk.to_extension().unwrap());
    let outer = outer_hello();

    let grease = generate_grease_psk(&inner, &mut OsRng).unwrap().unwrap();
    let grease_ext = grease.to_extension().unwrap();

    let mut setup = construct_hpke_setup_result(&negotiated, &mut OsRng).unwrap();
    let ech = encrypt_client_hello(
        &inner,
        &outer,
        &negotiated,
        &mut setup.context,
        setup.enc.clone(),
        COMPRESSED,
        Some(&grease_ext),
    )
    .unwrap();

    // The wire-form outer hello carries the ECH extension and the grease
    // PSK in the same order the AAD was built with.
    let mut outer_wire = outer.clone();
    outer_wire.extensions.push(ech.to_extension().unwrap());
    outer_wire.extensions.push(grease_ext);

    let mut server_ctx =
        setup_decryption_context(&negotiated.config, ech.cipher_suite, &SERVER_KEY, &ech.enc, 0)
            .unwrap();
    let decrypted = decrypt_ech_with_context(&outer_wire, &ech, &mut server_ctx).unwrap();
    assert_eq!(decrypted, inner);
}

#[test]
fn test_hrr_retry_reuses_context() {
    let negotiated = negotiated();
    let inner = inner_hello();
    let outer = outer_hello();

    let mut setup = construct_hpke_setup_result(&negotiated, &mut OsRng).unwrap();
    let first = encrypt_client_hello(
        &inner,
        &outer,
        &negotiated,
        &mut setup.context,
        setup.enc.clone(),
        COMPRESSED,
        None,
    )
    .unwrap();

    // Retry after an HRR: same context, empty enc.
    let mut retry_inner = inner.clone();
    retry_inner.extensions[1] = ext(ExtensionType::KEY_SHARE, b"corrected key share");
    let mut retry_outer = outer.clone();
    retry_outer.extensions[1] = ext(ExtensionType::KEY_SHARE, b"corrected key share");
    let second = encrypt_client_hello_hrr(
        &retry_inner,
        &retry_outer,
        &negotiated,
        &mut setup.context,
        COMPRESSED,
        None,
    )
    .unwrap();
    assert!(second.enc.is_empty());

    let mut retry_wire = retry_outer.clone();
    retry_wire.extensions.push(second.to_extension().unwrap());

    // The server keeps the context from the first flight, advanced by one.
    let mut server_ctx =
        setup_decryption_context(&negotiated.config, first.cipher_suite, &SERVER_KEY, &first.enc, 1)
            .unwrap();
    let decrypted = decrypt_ech_with_context(&retry_wire, &second, &mut server_ctx).unwrap();
    assert_eq!(decrypted, retry_inner);
}

#[test]
fn test_tampered_payload_fails_to_open() {
    let negotiated = negotiated();
    let inner = inner_hello();
    let outer = outer_hello();

    let mut setup = construct_hpke_setup_result(&negotiated, &mut OsRng).unwrap();
    let mut ech = encrypt_client_hello(
        &inner,
        &outer,
        &negotiated,
        &mut setup.context,
        setup.enc.clone(),
        COMPRESSED,
        None,
    )
    .unwrap();
    ech.payload[0] ^= 1;

    let mut outer_wire = outer.clone();
    outer_wire.extensions.push(ech.to_extension().unwrap());
    let mut server_ctx =
        setup_decryption_context(&negotiated.config, ech.cipher_suite, &SERVER_KEY, &ech.enc, 0)
            .unwrap();
    assert!(decrypt_ech_with_context(&outer_wire, &ech, &mut server_ctx).is_err());
}

fn transcript_with_client_hello(inner: &ClientHello) -> HandshakeContext {
    let mut ctx = HandshakeContext::new(KdfId::HkdfSha256);
    let framed =
        encode_handshake(HandshakeType::ClientHello, &inner.encode().unwrap()).unwrap();
    ctx.append_message(&framed);
    ctx
}

#[test]
fn test_accept_confirmation_server_hello() {
    let inner = inner_hello();
    let scheduler = KeyScheduler::new_from_random(KdfId::HkdfSha256, &inner.random);
    let transcript = transcript_with_client_hello(&inner);

    let mut shlo = ServerHello {
        legacy_version: 0x0303,
        random: [0x33; 32],
        legacy_session_id_echo: inner.legacy_session_id.clone(),
        cipher_suite: 0x1301,
        legacy_compression_method: 0,
        extensions: vec![ext(ExtensionType::SUPPORTED_VERSIONS, &[3, 4])],
    };
    set_accept_confirmation(&mut shlo, &scheduler, &transcript).unwrap();
    assert!(check_ech_accepted(&shlo, &scheduler, &transcript).unwrap());

    for i in 32 - ACCEPT_CONFIRMATION_SIZE..32 {
        let mut flipped = shlo.clone();
        flipped.random[i] ^= 1;
        assert!(!check_ech_accepted(&flipped, &scheduler, &transcript).unwrap(), "byte {i}");
    }

    // A different transcript rejects too.
    let other = transcript_with_client_hello(&outer_hello());
    assert!(!check_ech_accepted(&shlo, &scheduler, &other).unwrap());
}

#[test]
fn test_accept_confirmation_hrr() {
    let inner = inner_hello();
    let scheduler = KeyScheduler::new_from_random(KdfId::HkdfSha256, &inner.random);
    let transcript = transcript_with_client_hello(&inner);

    let mut hrr = HelloRetryRequest {
        legacy_version: 0x0303,
        legacy_session_id_echo: inner.legacy_session_id.clone(),
        cipher_suite: 0x1301,
        legacy_compression_method: 0,
        extensions: vec![ext(ExtensionType::KEY_SHARE, &[0, 23])],
    };

    // Without the ECH extension the HRR never signals acceptance.
    assert!(!check_ech_accepted_hrr(&hrr, &scheduler, &transcript).unwrap());

    set_accept_confirmation_hrr(&mut hrr, &scheduler, &transcript).unwrap();
    assert!(check_ech_accepted_hrr(&hrr, &scheduler, &transcript).unwrap());

    let ech_at = hrr
        .extensions
        .iter()
        .position(|e| e.extension_type == ExtensionType::ENCRYPTED_CLIENT_HELLO)
        .unwrap();
    for i in 0..ACCEPT_CONFIRMATION_SIZE {
        let mut flipped = hrr.clone();
        flipped.extensions[ech_at].data[i] ^= 1;
        assert!(!check_ech_accepted_hrr(&flipped, &scheduler, &transcript).unwrap(), "byte {i}");
    }
}

#[test]
fn test_negotiation_none_when_no_config_qualifies() {
    let mut bad_name = served_config();
    bad_name.content.public_name = b"x..y".to_vec();
    let mut mandatory = served_config();
    mandatory
        .content
        .extensions
        .push(ext(ExtensionType(0x8000), b""));
    let mut wrong_kdf = served_config();
    wrong_kdf.content.key_config.cipher_suites =
        vec![HpkeSymmetricCipherSuite { kdf_id: 0x0002, aead_id: 0x0001 }];

    assert!(negotiate_ech_config(&[bad_name, mandatory, wrong_kdf], KEMS, AEADS).is_none());
    assert!(negotiate_ech_config(&[served_config()], KEMS, AEADS).is_some());
}

#[test]
fn test_decrypted_hello_has_expanded_extensions() {
    let negotiated = negotiated();
    let inner = inner_hello();
    let outer = outer_hello();

    let mut setup = construct_hpke_setup_result(&negotiated, &mut OsRng).unwrap();
    let ech_ext = encrypt_client_hello(
        &inner,
        &outer,
        &negotiated,
        &mut setup.context,
        setup.enc.clone(),
        COMPRESSED,
        None,
    )
    .unwrap();

    let mut outer_wire = outer.clone();
    outer_wire.extensions.push(ech_ext.to_extension().unwrap());
    let mut server_ctx = setup_decryption_context(
        &negotiated.config,
        ech_ext.cipher_suite,
        &SERVER_KEY,
        &ech_ext.enc,
        0,
    )
    .unwrap();
    let decrypted = decrypt_ech_with_context(&outer_wire, &ech_ext, &mut server_ctx).unwrap();

    // No reference list survives expansion, and the referenced extensions
    // are back in their inner positions.
    assert!(decrypted
        .extensions
        .iter()
        .all(|e| e.extension_type != ExtensionType::ECH_OUTER_EXTENSIONS));
    assert_eq!(decrypted.extensions, inner.extensions);
    assert_eq!(decrypted.legacy_session_id, inner.legacy_session_id);
}
