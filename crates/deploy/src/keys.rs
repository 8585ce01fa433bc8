//! Burner keypairs and Sui address derivation.
//!
//! Every deployment attempt owns a freshly generated ed25519 keypair. The
//! private key material is exposed to the caller exactly once, as hex; it
//! is never persisted anywhere else.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use rand::TryRngCore;

/// Sui signature scheme flag for ed25519.
pub const ED25519_FLAG: u8 = 0x00;

type Blake2b256 = Blake2b<U32>;

/// Compute a 32-byte blake2b-256 digest.
pub(crate) fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// An ed25519 keypair with its derived Sui address.
///
/// Used both for per-deployment burner identities and for the optional
/// pre-funded master identity.
#[derive(Clone)]
pub struct SuiKeypair {
    signing_key: SigningKey,
    address: String,
}

impl std::fmt::Debug for SuiKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("SuiKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SuiKeypair {
    /// Generate a fresh keypair from the OS entropy source.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut seed)
            .context("Entropy source failure while generating keypair")?;
        Ok(Self::from_seed(seed))
    }

    /// Build a keypair from a 32-byte ed25519 seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Parse key material from its caller-facing encodings.
    ///
    /// Accepts a hex seed (with or without `0x` prefix) or the base64
    /// flag-prefixed export format used by Sui keystores.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let hex_str = encoded.strip_prefix("0x").unwrap_or(encoded);

        if hex_str.len() == 64 && hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(hex_str).context("Failed to decode hex key material")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("Hex key material is not 32 bytes"))?;
            return Ok(Self::from_seed(seed));
        }

        let bytes = BASE64
            .decode(encoded)
            .context("Key material is neither a hex seed nor base64")?;
        match bytes.as_slice() {
            [ED25519_FLAG, seed @ ..] if seed.len() == 32 => {
                let mut buf = [0u8; 32];
                buf.copy_from_slice(seed);
                Ok(Self::from_seed(buf))
            }
            [flag, ..] if bytes.len() == 33 => {
                anyhow::bail!("Unsupported signature scheme flag: {:#04x}", flag)
            }
            _ => anyhow::bail!("Base64 key material must be 33 bytes (flag + seed)"),
        }
    }

    /// The derived Sui address, `0x`-prefixed.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The 32-byte ed25519 seed as hex. The only copy handed out.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The 32-byte ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Derive a Sui address: blake2b-256 over the scheme flag and public key.
fn derive_address(public_key: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(33);
    data.push(ED25519_FLAG);
    data.extend_from_slice(public_key);
    format!("0x{}", hex::encode(blake2b256(&data)))
}
