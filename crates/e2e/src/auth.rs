//! Merchant Basic authentication

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::config::MerchantCredentials;

/// `Authorization` header value for the merchant
pub fn basic_auth_header(credentials: &MerchantCredentials) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", credentials.id, credentials.key));
    format!("Basic {}", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let creds = MerchantCredentials::new("Aladdin", "open sesame");
        assert_eq!(basic_auth_header(&creds), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_key_with_symbols_round_trips() {
        let creds = MerchantCredentials::new("4327306933PP", "k}8n:Gw23");
        let header = basic_auth_header(&creds);
        let decoded = STANDARD
            .decode(header.strip_prefix("Basic ").unwrap())
            .unwrap();
        assert_eq!(decoded, b"4327306933PP:k}8n:Gw23");
    }
}
