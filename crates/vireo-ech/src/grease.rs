//! GREASE pre-shared-key synthesis for the outer ClientHello.
//!
//! When the inner hello offers a PSK, the outer hello must carry one of the
//! same shape so the encrypted offer is not distinguishable by its absence.

use rand::{CryptoRng, RngCore};

use crate::error::EchError;
use crate::msg::{
    find_extension, ClientHello, ClientPresharedKey, ExtensionType, PskBinder, PskIdentity,
};

fn random_bytes(rng: &mut (impl RngCore + CryptoRng), len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

/// A randomized PSK extension matching the shape of the inner hello's offer,
/// or `None` when the inner hello offers no PSK
pub fn generate_grease_psk(
    inner: &ClientHello,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Option<ClientPresharedKey>, EchError> {
    let Some(ext) = find_extension(&inner.extensions, ExtensionType::PRE_SHARED_KEY) else {
        return Ok(None);
    };
    let psk = ClientPresharedKey::decode(&ext.data)?;

    let identities = psk
        .identities
        .iter()
        .map(|id| PskIdentity {
            psk_identity: random_bytes(rng, id.psk_identity.len()),
            obfuscated_ticket_age: rng.next_u32(),
        })
        .collect();
    let binders = psk
        .binders
        .iter()
        .map(|b| PskBinder { binder: random_bytes(rng, b.binder.len()) })
        .collect();
    Ok(Some(ClientPresharedKey { identities, binders }))
}

/// The grease PSK for the retry after an HRR: identities are kept so the
/// retry looks like a continuation, binders are re-randomized
pub fn generate_grease_psk_for_hrr(
    previous: &ClientPresharedKey,
    rng: &mut (impl RngCore + CryptoRng),
) -> ClientPresharedKey {
    let binders = previous
        .binders
        .iter()
        .map(|b| PskBinder { binder: random_bytes(rng, b.binder.len()) })
        .collect();
    ClientPresharedKey { identities: previous.identities.clone(), binders }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn hello_with_psk() -> ClientHello {
        let psk = ClientPresharedKey {
            identities: vec![PskIdentity {
                psk_identity: vec![1u8; 24],
                obfuscated_ticket_age: 1234,
            }],
            binders: vec![PskBinder { binder: vec![2u8; 32] }],
        };
        ClientHello {
            legacy_version: 0x0303,
            random: [0u8; 32],
            legacy_session_id: vec![],
            cipher_suites: vec![0x1301],
            legacy_compression_methods: vec![0],
            extensions: vec![psk.to_extension().unwrap()],
        }
    }

    #[test]
    fn test_no_psk_means_no_grease() {
        let mut chlo = hello_with_psk();
        chlo.extensions.clear();
        assert!(generate_grease_psk(&chlo, &mut OsRng).unwrap().is_none());
    }

    #[test]
    fn test_grease_matches_shape_but_not_content() {
        let chlo = hello_with_psk();
        let grease = generate_grease_psk(&chlo, &mut OsRng).unwrap().unwrap();
        assert_eq!(grease.identities.len(), 1);
        assert_eq!(grease.identities[0].psk_identity.len(), 24);
        assert_eq!(grease.binders.len(), 1);
        assert_eq!(grease.binders[0].binder.len(), 32);
        assert_ne!(grease.identities[0].psk_identity, vec![1u8; 24]);
        assert_ne!(grease.binders[0].binder, vec![2u8; 32]);
    }

    #[test]
    fn test_hrr_grease_keeps_identities() {
        let chlo = hello_with_psk();
        let first = generate_grease_psk(&chlo, &mut OsRng).unwrap().unwrap();
        let retry = generate_grease_psk_for_hrr(&first, &mut OsRng);
        assert_eq!(retry.identities, first.identities);
        assert_eq!(retry.binders[0].binder.len(), first.binders[0].binder.len());
        assert_ne!(retry.binders[0].binder, first.binders[0].binder);
    }
}
