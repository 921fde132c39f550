use vcanchor_crypto::Attestation;

use crate::error::IssuanceError;

/// Checks that a requester controls the external address named in a claim.
///
/// The attestation message must be the subject identifier verbatim, signed
/// with the external account's key. Every failure is an
/// [`IssuanceError::Authentication`]; nothing is retried.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestAuthenticator;

impl RequestAuthenticator {
    pub fn new() -> Self {
        Self
    }

    pub fn authenticate(
        &self,
        subject_identifier: &str,
        external_address: &str,
        attestation: &Attestation,
    ) -> Result<(), IssuanceError> {
        if attestation.message != subject_identifier {
            tracing::warn!(
                subject = subject_identifier,
                "attestation message does not match subject identifier"
            );
            return Err(IssuanceError::Authentication(
                "attestation message does not match subject identifier".into(),
            ));
        }

        attestation.verify(external_address).map_err(|e| {
            tracing::warn!(
                subject = subject_identifier,
                address = external_address,
                error = %e,
                "attestation rejected"
            );
            IssuanceError::Authentication(e.to_string())
        })?;

        tracing::debug!(
            subject = subject_identifier,
            address = external_address,
            "requester authenticated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::{LocalWallet, Signer};

    const SUBJECT: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

    async fn signed(wallet: &LocalWallet, message: &str) -> (String, Attestation) {
        let sig = wallet.sign_message(message).await.unwrap();
        let address = format!("{:?}", wallet.address());
        (address, Attestation::new(message, format!("0x{}", hex::encode(sig.to_vec()))))
    }

    #[tokio::test]
    async fn test_authenticate_valid() {
        let wallet = LocalWallet::from_bytes(&[3u8; 32]).unwrap();
        let (address, att) = signed(&wallet, SUBJECT).await;
        assert!(RequestAuthenticator::new()
            .authenticate(SUBJECT, &address, &att)
            .is_ok());
    }

    #[tokio::test]
    async fn test_message_must_be_subject() {
        let wallet = LocalWallet::from_bytes(&[3u8; 32]).unwrap();
        let (address, att) = signed(&wallet, "something else").await;
        assert!(matches!(
            RequestAuthenticator::new().authenticate(SUBJECT, &address, &att),
            Err(IssuanceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_address_mismatch_fails_closed() {
        let signer = LocalWallet::from_bytes(&[3u8; 32]).unwrap();
        let other = LocalWallet::from_bytes(&[4u8; 32]).unwrap();
        let (_, att) = signed(&signer, SUBJECT).await;
        let other_address = format!("{:?}", other.address());
        assert!(matches!(
            RequestAuthenticator::new().authenticate(SUBJECT, &other_address, &att),
            Err(IssuanceError::Authentication(_))
        ));
    }

    #[test]
    fn test_malformed_signature_fails_closed() {
        let att = Attestation::new(SUBJECT, "0xnothex");
        assert!(matches!(
            RequestAuthenticator::new().authenticate(
                SUBJECT,
                "0x079E275E78783FD1864401ca0F933b3414c65243",
                &att
            ),
            Err(IssuanceError::Authentication(_))
        ));
    }
}
