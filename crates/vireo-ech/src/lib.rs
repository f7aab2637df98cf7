//! TLS 1.3 Encrypted Client Hello, draft-ietf-tls-esni-15
//!
//! The full client and server ECH flow, self-contained:
//! - **Negotiation**: pick the first acceptable `ECHConfig` from a served
//!   list (`ech::negotiate_ech_config`)
//! - **Encryption**: seal a padded inner ClientHello into the
//!   `encrypted_client_hello` extension of the outer one, with
//!   `ech_outer_extensions` compression and GREASE PSK cover traffic
//! - **Decryption**: open the payload, validate padding, restore the
//!   session id, and expand outer-extension references
//! - **Acceptance**: derive and verify the 8-byte confirmation carried in
//!   `ServerHello.random` or the HRR's ECH extension
//!
//! HPKE (RFC 9180, base mode) and the minimal slice of the TLS 1.3 key
//! schedule live in the `hpke` and `transcript` modules.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// `ECHConfig` structures and parsing
pub mod config;

/// Negotiation, encryption, decryption, acceptance confirmation
pub mod ech;

/// Error types
pub mod error;

/// GREASE PSK synthesis
pub mod grease;

/// HPKE base mode
pub mod hpke;

/// Handshake messages and extensions
pub mod msg;

/// Transcript hashing and the early-secret scheduler
pub mod transcript;

/// TLS presentation-language codec
pub mod wire;

pub use config::{
    decode_config_list, EchConfig, EchConfigContent, EchVersion, HpkeKeyConfig,
    HpkeSymmetricCipherSuite, NegotiatedEchConfig,
};
pub use ech::{
    calculate_ech_padding, check_ech_accepted, check_ech_accepted_hrr, construct_hpke_setup_result,
    decrypt_ech_with_context, encrypt_client_hello, encrypt_client_hello_hrr, is_valid_public_name,
    make_hpke_context_info_param, negotiate_ech_config, set_accept_confirmation,
    set_accept_confirmation_hrr, setup_decryption_context, substitute_outer_extensions,
    EchHpkeSetup, OuterEchClientHello,
};
pub use error::{EchError, OuterExtensionsError};
pub use grease::{generate_grease_psk, generate_grease_psk_for_hrr};
pub use hpke::{AeadId, HpkeContext, HpkeError, KdfId, KemId};
pub use msg::{ClientHello, Extension, ExtensionType, HelloRetryRequest, ServerHello};
pub use transcript::{HandshakeContext, KeyScheduler, ACCEPT_CONFIRMATION_SIZE};
