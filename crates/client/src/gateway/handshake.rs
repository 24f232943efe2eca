//! Device identity and the signed `connect` request.
//!
//! Every connection attempt proves possession of a freshly generated Ed25519
//! key by signing a pipe-delimited claim. When the gateway pushed a
//! challenge nonce the claim is the `v2` form and ends with that nonce, which
//! binds the signature to this one connection.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Map;
use sha2::{Digest, Sha256};

pub const PROTOCOL_VERSION: u32 = 3;
pub const CLIENT_ID: &str = "cli";
pub const CLIENT_MODE: &str = "cli";
pub const ROLE: &str = "operator";
pub const SCOPES: [&str; 3] = ["operator.read", "operator.write", "operator.admin"];
pub const LOCALE: &str = "en-US";

/// An ephemeral signing identity, generated per connection attempt.
pub struct DeviceIdentity {
    signing_key: SigningKey,
    id: String,
}

impl core::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl DeviceIdentity {
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let id = hex::encode(Sha256::digest(signing_key.verifying_key().as_bytes()));

        Self { signing_key, id }
    }

    /// Hex SHA-256 of the raw public key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw public key, base64url without padding.
    #[must_use]
    pub fn public_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Signature over `payload`, base64url without padding.
    #[must_use]
    pub fn sign(&self, payload: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.signing_key.sign(payload.as_bytes()).to_bytes())
    }
}

/// The exact string a device signs.
///
/// `v1|id|client|mode|role|scopes|signedAt|token`, or with a nonce
/// `v2|id|client|mode|role|scopes|signedAt|token|nonce`. A missing token is
/// the empty string.
#[must_use]
pub fn canonical_payload(
    device_id: &str,
    signed_at: i64,
    token: Option<&str>,
    nonce: Option<&str>,
) -> String {
    let scopes = SCOPES.join(",");
    let token = token.unwrap_or_default();

    match nonce {
        Some(nonce) => format!(
            "v2|{device_id}|{CLIENT_ID}|{CLIENT_MODE}|{ROLE}|{scopes}|{signed_at}|{token}|{nonce}"
        ),
        None => format!(
            "v1|{device_id}|{CLIENT_ID}|{CLIENT_MODE}|{ROLE}|{scopes}|{signed_at}|{token}"
        ),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: &'static str,
    pub scopes: [&'static str; 3],
    pub caps: Vec<String>,
    pub commands: Vec<String>,
    pub permissions: Map<String, serde_json::Value>,
    pub locale: &'static str,
    pub user_agent: String,
    pub device: DeviceProof,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub id: &'static str,
    pub version: &'static str,
    pub platform: &'static str,
    pub mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProof {
    pub id: String,
    pub public_key: String,
    pub signature: String,
    pub signed_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Auth {
    pub token: String,
}

impl ConnectParams {
    /// Builds and signs the `connect` parameters for `identity`.
    #[must_use]
    pub fn signed(
        identity: &DeviceIdentity,
        token: Option<&str>,
        nonce: Option<&str>,
        signed_at: i64,
        user_agent: &str,
    ) -> Self {
        let token = token.filter(|token| !token.is_empty());
        let payload = canonical_payload(identity.id(), signed_at, token, nonce);

        Self {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client: ClientInfo {
                id: CLIENT_ID,
                version: env!("CARGO_PKG_VERSION"),
                platform: std::env::consts::OS,
                mode: CLIENT_MODE,
            },
            role: ROLE,
            scopes: SCOPES,
            caps: Vec::new(),
            commands: Vec::new(),
            permissions: Map::new(),
            locale: LOCALE,
            user_agent: user_agent.to_owned(),
            device: DeviceProof {
                id: identity.id().to_owned(),
                public_key: identity.public_key(),
                signature: identity.sign(&payload),
                signed_at,
                nonce: nonce.map(str::to_owned),
            },
            auth: token.map(|token| Auth {
                token: token.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_canonical_payload_forms() {
        assert_eq!(
            canonical_payload("dev", 1_700_000_000_000, None, None),
            "v1|dev|cli|cli|operator|operator.read,operator.write,operator.admin|1700000000000|"
        );
        assert_eq!(
            canonical_payload("dev", 42, Some("secret"), Some("n0nce")),
            "v2|dev|cli|cli|operator|operator.read,operator.write,operator.admin|42|secret|n0nce"
        );
    }

    #[test]
    fn test_every_identity_is_fresh() {
        let first = DeviceIdentity::generate();
        let second = DeviceIdentity::generate();

        assert_ne!(first.id(), second.id());
        assert_ne!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_identity_id_is_hash_of_public_key() -> eyre::Result<()> {
        let identity = DeviceIdentity::generate();

        let public_key = URL_SAFE_NO_PAD.decode(identity.public_key())?;

        assert_eq!(public_key.len(), 32);
        assert_eq!(identity.id(), hex::encode(Sha256::digest(&public_key)));
        assert!(!identity.public_key().contains('='));

        Ok(())
    }

    #[test]
    fn test_signature_verifies_against_canonical_payload() -> eyre::Result<()> {
        let identity = DeviceIdentity::generate();
        let params = ConnectParams::signed(&identity, Some("tok"), Some("abc"), 7, "ua");

        let key: [u8; 32] = URL_SAFE_NO_PAD
            .decode(&params.device.public_key)?
            .try_into()
            .map_err(|_| eyre::eyre!("public key is not 32 bytes"))?;
        let signature: [u8; 64] = URL_SAFE_NO_PAD
            .decode(&params.device.signature)?
            .try_into()
            .map_err(|_| eyre::eyre!("signature is not 64 bytes"))?;

        let payload = canonical_payload(identity.id(), 7, Some("tok"), Some("abc"));

        VerifyingKey::from_bytes(&key)?
            .verify(payload.as_bytes(), &Signature::from_bytes(&signature))?;

        Ok(())
    }

    #[test]
    fn test_connect_params_wire_shape() -> eyre::Result<()> {
        let identity = DeviceIdentity::generate();

        let without_token = serde_json::to_value(ConnectParams::signed(&identity, Some(""), None, 1, "ua"))?;

        assert_eq!(without_token["minProtocol"], json!(3));
        assert_eq!(without_token["maxProtocol"], json!(3));
        assert_eq!(without_token["role"], json!("operator"));
        assert_eq!(without_token["client"]["mode"], json!("cli"));
        assert_eq!(without_token["permissions"], json!({}));
        assert_eq!(without_token["device"]["signedAt"], json!(1));
        assert!(without_token.get("auth").is_none());
        assert!(without_token["device"].get("nonce").is_none());

        let with_token =
            serde_json::to_value(ConnectParams::signed(&identity, Some("tok"), Some("n"), 1, "ua"))?;

        assert_eq!(with_token["auth"], json!({ "token": "tok" }));
        assert_eq!(with_token["device"]["nonce"], json!("n"));

        Ok(())
    }
}
