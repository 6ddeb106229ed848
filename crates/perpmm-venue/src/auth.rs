//! HIP-820 challenge/signature authentication.
//!
//! Flow: request a challenge, sign the challenge message wrapped in the
//! ledger's signed-message envelope with the account's Ed25519 key, then
//! verify the signature to receive a bearer token. The signature travels
//! as a hand-framed protobuf `SignatureMap`, base64-encoded.

use async_trait::async_trait;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::api::{AuthApi, AuthToken};
use crate::dto;
use crate::error::{VenueError, VenueResult};

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Signed-message envelope prefix mandated by the ledger.
const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Hedera Signed Message:\n";

/// Wrap a challenge message in the signed-message envelope:
/// `prefix || decimal byte length || '\n' || message`.
fn build_hip820(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 24 + message.len());
    out.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    out.extend_from_slice(message.len().to_string().as_bytes());
    out.push(b'\n');
    out.extend_from_slice(message);
    out
}

/// Protobuf varint encoding.
fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while value > 0x7f {
        out.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Frame a `SignatureMap` with one Ed25519 `SignaturePair`:
/// field 1 `pubKeyPrefix` (length-delimited), field 3 `ed25519`.
fn build_signature_map(public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut pair = Vec::new();
    pair.push(0x0a); // field 1, wire type 2
    pair.extend_from_slice(&encode_varint(public_key.len() as u64));
    pair.extend_from_slice(public_key);
    pair.push(0x1a); // field 3, wire type 2
    pair.extend_from_slice(&encode_varint(signature.len() as u64));
    pair.extend_from_slice(signature);

    let mut map = Vec::new();
    map.push(0x0a); // repeated sigPair, field 1
    map.extend_from_slice(&encode_varint(pair.len() as u64));
    map.extend_from_slice(&pair);
    map
}

/// Authenticating client for the venue's challenge/verify endpoints.
pub struct AuthClient {
    client: Client,
    base_url: String,
    account_id: String,
    ledger_id: String,
    signing_key: SigningKey,
}

impl AuthClient {
    /// Create an auth client from a DER-encoded Ed25519 private key in hex.
    ///
    /// The raw 32-byte seed is the tail of the DER blob; intermediate key
    /// material is zeroized. Only `key_type = "ed25519"` is supported.
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        ledger_id: impl Into<String>,
        key_type: &str,
        private_key_der_hex: &str,
    ) -> VenueResult<Self> {
        if !key_type.eq_ignore_ascii_case("ed25519") {
            return Err(VenueError::AuthConfig(format!(
                "unsupported key_type {key_type:?}; only ed25519 is supported"
            )));
        }

        let mut der = hex::decode(private_key_der_hex.trim())
            .map_err(|e| VenueError::AuthConfig(format!("private_key_hex is not hex: {e}")))?;
        if der.len() < 32 {
            der.zeroize();
            return Err(VenueError::AuthConfig(
                "private_key_hex too short for an ed25519 seed".into(),
            ));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&der[der.len() - 32..]);
        der.zeroize();

        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();

        let client = Client::builder()
            .timeout(AUTH_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            ledger_id: ledger_id.into(),
            signing_key,
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &impl serde::Serialize,
    ) -> VenueResult<T> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VenueError::classify_http(status.as_u16(), &text));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VenueError::Transport(format!("failed to parse auth response: {e}")))
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn authenticate(&self) -> VenueResult<AuthToken> {
        let challenge_url = format!("{}/api/v1/auth/challenge", self.base_url);
        let challenge: dto::ChallengeResponse = self
            .post_json(
                &challenge_url,
                &dto::ChallengeRequest {
                    account_id: &self.account_id,
                    ledger_id: &self.ledger_id,
                    method: "message",
                },
            )
            .await?;

        debug!(challenge_id = %challenge.challenge_id, "Received auth challenge");

        let envelope = build_hip820(challenge.message.as_bytes());
        let signature = self.signing_key.sign(&envelope);
        let signature_map = build_signature_map(
            self.signing_key.verifying_key().as_bytes(),
            &signature.to_bytes(),
        );

        let verify_url = format!("{}/api/v1/auth/verify", self.base_url);
        let verified: dto::VerifyResponse = self
            .post_json(
                &verify_url,
                &dto::VerifyRequest {
                    challenge_id: &challenge.challenge_id,
                    account_id: &self.account_id,
                    message_signed_plain_text: &challenge.message,
                    signature_map_base64: base64::engine::general_purpose::STANDARD
                        .encode(&signature_map),
                    sig_type: "ed25519",
                },
            )
            .await?;

        info!(
            account_id = %self.account_id,
            ttl_seconds = verified.expires_in_seconds,
            "Authenticated"
        );

        Ok(AuthToken {
            access_token: verified.access_token,
            expires_in_seconds: verified.expires_in_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hip820_envelope() {
        let wrapped = build_hip820(b"hello");
        assert_eq!(
            wrapped,
            b"\x19Hedera Signed Message:\n5\nhello".to_vec()
        );
    }

    #[test]
    fn test_varint_encoding() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(1), vec![0x01]);
        assert_eq!(encode_varint(127), vec![0x7f]);
        assert_eq!(encode_varint(128), vec![0x80, 0x01]);
        assert_eq!(encode_varint(300), vec![0xac, 0x02]);
    }

    #[test]
    fn test_signature_map_framing() {
        let pubkey = [0xaa; 32];
        let sig = [0xbb; 64];
        let map = build_signature_map(&pubkey, &sig);

        // Outer: field 1, length = 2 + 32 + 2 + 64 = 100.
        assert_eq!(map[0], 0x0a);
        assert_eq!(map[1], 100);
        // Inner pair: pubKeyPrefix then ed25519 signature.
        assert_eq!(map[2], 0x0a);
        assert_eq!(map[3], 32);
        assert_eq!(&map[4..36], &pubkey[..]);
        assert_eq!(map[36], 0x1a);
        assert_eq!(map[37], 64);
        assert_eq!(&map[38..102], &sig[..]);
    }

    #[test]
    fn test_rejects_unsupported_key_type() {
        let result = AuthClient::new(
            "https://venue.example",
            "0.0.1",
            "testnet",
            "ecdsa_secp256k1",
            "00",
        );
        assert!(matches!(result, Err(VenueError::AuthConfig(_))));
    }

    #[test]
    fn test_rejects_short_key() {
        let result = AuthClient::new("https://venue.example", "0.0.1", "testnet", "ed25519", "aabb");
        assert!(matches!(result, Err(VenueError::AuthConfig(_))));
    }

    #[test]
    fn test_accepts_der_wrapped_seed() {
        // 302e...0420 DER prefix followed by the 32-byte seed.
        let der_hex = format!("302e020100300506032b657004220420{}", "11".repeat(32));
        let client =
            AuthClient::new("https://venue.example", "0.0.1", "testnet", "ed25519", &der_hex);
        assert!(client.is_ok());
    }
}
