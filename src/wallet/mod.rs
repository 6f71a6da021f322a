use log::{debug, info, warn};
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WalletError;
use crate::transaction::{Transaction, model::sighash};

/// Generate a new secp256k1 keypair and return (priv_hex, pub_hex_compressed).
/// The compressed public key hex doubles as the participant identifier.
pub fn generate_keypair_hex() -> (String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    (hex::encode(sk.secret_bytes()), hex::encode(pk.serialize()))
}

/// Sign the canonical {sender, recipient, amount} payload with a hex private key.
/// Returns the hex DER signature.
pub fn sign_transaction(
    private_key_hex: &str,
    sender: &str,
    recipient: &str,
    amount: u64,
) -> Result<String, WalletError> {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(&hex::decode(private_key_hex)?)?;
    let msg = Message::from_digest_slice(&sighash(sender, recipient, amount))?;
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(hex::encode(sig.serialize_der().to_vec()))
}

/// Verify a signature (hex DER) against the given pubkey (hex, compressed) and message hash.
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, WalletError> {
    let secp = Secp256k1::verification_only();
    let sig = Signature::from_der(&hex::decode(sig_hex)?)?;
    let pk = PublicKey::from_slice(&hex::decode(pubkey_hex)?)?;
    let msg = Message::from_digest_slice(&msg32)?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Check a transaction's signature against its sender.
///
/// Rewards are always valid. Any malformed key or signature counts as invalid.
pub fn verify_transaction(tx: &Transaction) -> bool {
    if tx.is_reward() {
        return true;
    }
    match verify_signature_hex(&tx.sender, &tx.signature, tx.sighash()) {
        Ok(valid) => valid,
        Err(err) => {
            debug!("signature check failed for sender {}: {}", tx.sender, err);
            false
        }
    }
}

/// Key pair of the local participant, stored as `wallet-<node_id>.txt`.
#[derive(Debug, Clone)]
pub struct Wallet {
    path: PathBuf,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl Wallet {
    pub fn new(data_dir: &Path, node_id: &str) -> Self {
        Self {
            path: data_dir.join(format!("wallet-{node_id}.txt")),
            public_key: None,
            private_key: None,
        }
    }

    pub fn create_keys(&mut self) {
        let (private_key, public_key) = generate_keypair_hex();
        self.private_key = Some(private_key);
        self.public_key = Some(public_key);
    }

    /// Write public key then private key, one per line.
    pub fn save_keys(&self) -> Result<(), WalletError> {
        let (Some(public_key), Some(private_key)) = (&self.public_key, &self.private_key) else {
            return Err(WalletError::NoKeys);
        };
        fs::write(&self.path, format!("{public_key}\n{private_key}"))?;
        info!("wallet saved to {}", self.path.display());
        Ok(())
    }

    pub fn load_keys(&mut self) -> Result<(), WalletError> {
        let content = fs::read_to_string(&self.path).inspect_err(|err| {
            warn!("loading wallet {} failed: {}", self.path.display(), err);
        })?;
        let mut lines = content.lines().map(str::trim);
        let (Some(public_key), Some(private_key)) = (lines.next(), lines.next()) else {
            return Err(WalletError::Malformed);
        };
        // Reject files whose keys do not parse.
        PublicKey::from_slice(&hex::decode(public_key)?)?;
        SecretKey::from_slice(&hex::decode(private_key)?)?;
        self.public_key = Some(public_key.to_string());
        self.private_key = Some(private_key.to_string());
        Ok(())
    }

    /// Sign a transfer from this wallet's public key to `recipient`.
    pub fn sign_transaction(&self, recipient: &str, amount: u64) -> Result<String, WalletError> {
        let (Some(public_key), Some(private_key)) = (&self.public_key, &self.private_key) else {
            return Err(WalletError::NoKeys);
        };
        sign_transaction(private_key, public_key, recipient, amount)
    }
}
