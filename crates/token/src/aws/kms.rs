//! [`KmsEncryptionService`]: [`EncryptionService`] backed by AWS KMS.

use aws_config::BehaviorVersion;
use aws_sdk_kms::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_kms::operation::decrypt::DecryptError;
use aws_sdk_kms::primitives::Blob;

use crate::crypto::{EncryptionError, EncryptionService, KeyId};

/// Encryption context key bound to every token ciphertext.
pub const CONTEXT_KEY: &str = "purpose";

/// Encryption context value bound to every token ciphertext.
pub const CONTEXT_VALUE: &str = "pagination-token";

/// Error code KMS returns for a request that fails input validation.
const VALIDATION_EXCEPTION: &str = "ValidationException";

/// KMS client wrapper implementing [`EncryptionService`].
///
/// KMS `Encrypt` accepts at most 4 KiB of plaintext. Start keys from index
/// queries carry both table and index attributes and can exceed it, so
/// [`crate::codec::EncryptedCodec`] refuses larger envelopes before they get
/// here.
#[derive(Clone, Debug)]
pub struct KmsEncryptionService {
    client: aws_sdk_kms::Client,
}

impl KmsEncryptionService {
    /// Wrap an already configured KMS client.
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS configuration chain
    /// (environment, profile, instance role).
    ///
    /// `endpoint_url` overrides the KMS endpoint, e.g. to target a local
    /// KMS emulator.
    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let mut builder = aws_sdk_kms::config::Builder::from(&config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }

        Self::new(aws_sdk_kms::Client::from_conf(builder.build()))
    }
}

impl EncryptionService for KmsEncryptionService {
    async fn encrypt(&self, key_id: &KeyId, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let resp = self
            .client
            .encrypt()
            .key_id(key_id.as_str())
            .plaintext(Blob::new(plaintext))
            .encryption_context(CONTEXT_KEY, CONTEXT_VALUE)
            .send()
            .await
            .map_err(|e| EncryptionError::Service(DisplayErrorContext(&e).to_string()))?;

        let ciphertext = resp.ciphertext_blob().ok_or_else(|| {
            EncryptionError::Service("KMS encrypt response contained no ciphertext".into())
        })?;
        Ok(ciphertext.as_ref().to_vec())
    }

    async fn decrypt(&self, key_id: &KeyId, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let resp = self
            .client
            .decrypt()
            .key_id(key_id.as_str())
            .ciphertext_blob(Blob::new(ciphertext))
            .encryption_context(CONTEXT_KEY, CONTEXT_VALUE)
            .send()
            .await
            .map_err(classify_decrypt_error)?;

        let plaintext = resp.plaintext().ok_or_else(|| {
            EncryptionError::Service("KMS decrypt response contained no plaintext".into())
        })?;
        Ok(plaintext.as_ref().to_vec())
    }
}

/// Map KMS decrypt failures onto the service boundary.
///
/// Ciphertext that is corrupt, was sealed under a different key, or carries a
/// different encryption context is the caller's fault. So is a blob KMS
/// refuses to read at all, which it reports as the unmodelled
/// `ValidationException`. Everything else (throttling, disabled keys,
/// network) is the service's.
fn classify_decrypt_error(err: SdkError<DecryptError>) -> EncryptionError {
    match err.as_service_error() {
        Some(e)
            if e.is_invalid_ciphertext_exception()
                || e.is_incorrect_key_exception()
                || e.is_invalid_key_usage_exception()
                || e.code() == Some(VALIDATION_EXCEPTION) =>
        {
            EncryptionError::Rejected(e.to_string())
        }
        _ => EncryptionError::Service(DisplayErrorContext(&err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_kms::error::ErrorMetadata;
    use aws_sdk_kms::types::error::{
        IncorrectKeyException, InvalidCiphertextException, KmsInternalException,
    };
    use aws_smithy_runtime_api::http::{Response, StatusCode};
    use aws_smithy_types::body::SdkBody;

    use super::*;

    fn service_error(err: DecryptError) -> SdkError<DecryptError> {
        let raw = Response::new(StatusCode::try_from(400).unwrap(), SdkBody::empty());
        SdkError::service_error(err, raw)
    }

    #[test]
    fn invalid_ciphertext_is_rejected() {
        let err = service_error(DecryptError::InvalidCiphertextException(
            InvalidCiphertextException::builder().message("bad blob").build(),
        ));
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Rejected(_)));
    }

    #[test]
    fn incorrect_key_is_rejected() {
        let err = service_error(DecryptError::IncorrectKeyException(
            IncorrectKeyException::builder().message("wrong key").build(),
        ));
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Rejected(_)));
    }

    #[test]
    fn oversized_blob_validation_is_rejected() {
        let err = service_error(DecryptError::generic(
            ErrorMetadata::builder()
                .code("ValidationException")
                .message(
                    "1 validation error detected: Value at 'ciphertextBlob' failed to satisfy \
                     constraint: Member must have length less than or equal to 6144",
                )
                .build(),
        ));
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Rejected(_)));
    }

    #[test]
    fn other_unmodelled_errors_pass_through() {
        let err = service_error(DecryptError::generic(
            ErrorMetadata::builder().code("ThrottlingException").message("slow down").build(),
        ));
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Service(_)));
    }

    #[test]
    fn internal_failure_passes_through() {
        let err = service_error(DecryptError::KmsInternalException(
            KmsInternalException::builder().message("boom").build(),
        ));
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Service(_)));
    }

    #[test]
    fn timeouts_pass_through() {
        let err: SdkError<DecryptError> = SdkError::timeout_error("deadline exceeded");
        assert!(matches!(classify_decrypt_error(err), EncryptionError::Service(_)));
    }
}
