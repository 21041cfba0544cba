use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `data` under `secret`. Tribute signs the raw webhook body with the
/// shop's API key and sends the digest in the `trbt-signature` header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded HMAC-SHA256 signature over `data`. The digest comparison is constant
/// time via [`Mac::verify_slice`].
pub fn verify_hmac_hex(secret: &str, data: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_round_trip() {
        let sig = calculate_hmac("api-key", b"{\"name\":\"shopOrderSuccess\"}");
        assert!(verify_hmac_hex("api-key", b"{\"name\":\"shopOrderSuccess\"}", &sig));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let sig = calculate_hmac("api-key", b"{\"amount\":100}");
        assert!(!verify_hmac_hex("api-key", b"{\"amount\":999}", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let sig = calculate_hmac("api-key", b"payload");
        assert!(!verify_hmac_hex("other-key", b"payload", &sig));
    }

    #[test]
    fn garbage_signature_fails_verification() {
        assert!(!verify_hmac_hex("api-key", b"payload", "not-hex-at-all"));
    }
}
