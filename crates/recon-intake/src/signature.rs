use hmac::{Hmac, Mac};
use recon_types::{ConnectionId, ReconError, ReconResult};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies an HMAC-SHA256 webhook signature, expressed as the lowercase
/// hex digest a PSP sends in a signature header. Comparison goes through
/// `Mac::verify_slice`, which is constant-time over the digest bytes.
pub fn verify_hmac_sha256(
    connection: ConnectionId,
    secret: &[u8],
    payload: &[u8],
    provided_hex: &str,
) -> ReconResult<()> {
    let provided = hex::decode(provided_hex).map_err(|_| ReconError::BadSignature { connection })?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| ReconError::BadSignature { connection })?;
    mac.update(payload);
    mac.verify_slice(&provided)
        .map_err(|_| ReconError::BadSignature { connection })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let secret = b"whsec_test";
        let payload = b"{\"id\":\"evt_1\"}";
        let signature = sign(secret, payload);
        assert!(verify_hmac_sha256(ConnectionId::new(), secret, payload, &signature).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let secret = b"whsec_test";
        let signature = sign(secret, b"{\"id\":\"evt_1\"}");
        let err = verify_hmac_sha256(ConnectionId::new(), secret, b"{\"id\":\"evt_2\"}", &signature)
            .unwrap_err();
        assert!(matches!(err, ReconError::BadSignature { .. }));
    }

    #[test]
    fn rejects_malformed_hex() {
        let err = verify_hmac_sha256(ConnectionId::new(), b"secret", b"payload", "not-hex")
            .unwrap_err();
        assert!(matches!(err, ReconError::BadSignature { .. }));
    }
}
