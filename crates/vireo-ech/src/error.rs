//! Error types for the ECH flow.

use crate::hpke::HpkeError;
use crate::wire::WireError;

/// Failures while resolving `ech_outer_extensions` references
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OuterExtensionsError {
    /// The inner hello carried more than one `ech_outer_extensions`
    #[error("duplicate ech_outer_extensions in inner hello")]
    DuplicateOuterExtensions,
    /// The reference list names `encrypted_client_hello` itself
    #[error("ech_outer_extensions references encrypted_client_hello")]
    SelfReference,
    /// A referenced type is absent from the outer hello, or appears out of
    /// order relative to earlier references
    #[error("referenced outer extension {0:#06x} not found in order")]
    MissingReferent(u16),
    /// The expanded inner hello would carry the same type twice, through any
    /// mix of literal extensions and references
    #[error("duplicate extension {0:#06x} in inner hello")]
    DuplicateExtension(u16),
}

/// Any failure in ECH negotiation, encryption, or decryption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EchError {
    /// Malformed wire data
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),
    /// HPKE failure
    #[error("hpke error: {0}")]
    Hpke(#[from] HpkeError),
    /// Bad `ech_outer_extensions` usage in a decrypted inner hello
    #[error("outer extensions error: {0}")]
    OuterExtensions(#[from] OuterExtensionsError),
    /// Decrypted inner hello carried non-zero padding
    #[error("non-zero padding after inner client hello")]
    NonZeroPadding,
    /// Derived secret is too short to carry the confirmation signal
    #[error("accept confirmation secret too small: {0} bytes")]
    AcceptSecretTooSmall(usize),
    /// A ServerHello or HRR that should carry ECH state does not
    #[error("missing encrypted_client_hello extension")]
    MissingEchExtension,
    /// The ECH extension payload is not the expected variant
    #[error("unexpected encrypted_client_hello payload")]
    UnexpectedEchPayload,
}
