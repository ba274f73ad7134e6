//! Event id hashing, Schnorr signing, and secret-key parsing.

use bech32::FromBase32;
use secp256k1::{schnorr::Signature, Keypair, Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::error::ConversionError;
use crate::event::Event;

/// Recompute the Nostr event hash from its fields.
pub fn event_hash(ev: &Event) -> Result<[u8; 32], ConversionError> {
    let arr = serde_json::json!([0, ev.pubkey, ev.created_at, ev.kind, ev.tags, ev.content]);
    let data =
        serde_json::to_vec(&arr).map_err(|e| ConversionError::ConversionFailed(e.to_string()))?;
    let hash = Sha256::digest(&data);
    Ok(hash.into())
}

/// Parse a secret key given as 64 hex characters or a bech32 `nsec` string,
/// returning the hex form.
pub fn parse_secret_key(input: &str) -> Result<String, ConversionError> {
    let bytes = if input.starts_with("nsec1") {
        let (hrp, data, _variant) = bech32::decode(input)
            .map_err(|e| ConversionError::InvalidInput(format!("bad nsec key: {e}")))?;
        if hrp != "nsec" {
            return Err(ConversionError::InvalidInput(format!(
                "bad nsec key: unexpected prefix {hrp}"
            )));
        }
        Vec::<u8>::from_base32(&data)
            .map_err(|e| ConversionError::InvalidInput(format!("bad nsec key: {e}")))?
    } else {
        hex::decode(input)
            .map_err(|e| ConversionError::InvalidInput(format!("bad hex key: {e}")))?
    };
    if bytes.len() != 32 {
        return Err(ConversionError::InvalidInput(format!(
            "secret key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    secp256k1::SecretKey::from_slice(&bytes)
        .map_err(|e| ConversionError::InvalidInput(format!("bad secret key: {e}")))?;
    Ok(hex::encode(bytes))
}

/// X-only public key (hex) derived from a hex secret key.
pub fn derive_pubkey(secret_hex: &str) -> Result<String, ConversionError> {
    let keypair = keypair_from_hex(secret_hex)?;
    Ok(hex::encode(keypair.x_only_public_key().0.serialize()))
}

/// Sign an event: overwrite `pubkey` with the key's x-only public key, set
/// `id` to the event hash and `sig` to a Schnorr signature over it.
pub fn sign_event(ev: &Event, secret_hex: &str) -> Result<Event, ConversionError> {
    let secp = Secp256k1::new();
    let keypair = keypair_from_hex(secret_hex)?;
    let mut signed = ev.clone();
    signed.pubkey = hex::encode(keypair.x_only_public_key().0.serialize());
    let hash = event_hash(&signed)?;
    signed.id = Some(hex::encode(hash));
    let msg = Message::from_digest_slice(&hash)
        .map_err(|e| ConversionError::ConversionFailed(e.to_string()))?;
    let sig = secp.sign_schnorr_no_aux_rand(&msg, &keypair);
    signed.sig = Some(hex::encode(sig.as_ref()));
    Ok(signed)
}

/// Verify an event's id and Schnorr signature, returning the verified id.
pub fn verify_event(ev: &Event) -> Result<String, ConversionError> {
    let id = ev
        .id
        .as_ref()
        .ok_or_else(|| ConversionError::ValidationFailed("event has no id".into()))?;
    let sig_hex = ev
        .sig
        .as_ref()
        .ok_or_else(|| ConversionError::ValidationFailed("event has no signature".into()))?;
    let hash = event_hash(ev)?;
    let calc_id = hex::encode(hash);
    if &calc_id != id {
        return Err(ConversionError::ValidationFailed(format!(
            "id mismatch: event says {id}, hash is {calc_id}"
        )));
    }
    let sig_bytes = hex::decode(sig_hex)
        .map_err(|e| ConversionError::ValidationFailed(format!("bad signature hex: {e}")))?;
    let sig = Signature::from_slice(&sig_bytes)
        .map_err(|e| ConversionError::ValidationFailed(format!("bad signature: {e}")))?;
    let pk_bytes = hex::decode(&ev.pubkey)
        .map_err(|e| ConversionError::ValidationFailed(format!("bad pubkey hex: {e}")))?;
    let pk = XOnlyPublicKey::from_slice(&pk_bytes)
        .map_err(|e| ConversionError::ValidationFailed(format!("bad pubkey: {e}")))?;
    let msg = Message::from_digest_slice(&hash)
        .map_err(|e| ConversionError::ConversionFailed(e.to_string()))?;
    let secp = Secp256k1::verification_only();
    secp.verify_schnorr(&sig, &msg, &pk)
        .map_err(|e| ConversionError::ValidationFailed(format!("signature check failed: {e}")))?;
    Ok(calc_id)
}

fn keypair_from_hex(secret_hex: &str) -> Result<Keypair, ConversionError> {
    let secp = Secp256k1::new();
    let bytes = hex::decode(secret_hex)
        .map_err(|e| ConversionError::InvalidInput(format!("bad hex key: {e}")))?;
    Keypair::from_seckey_slice(&secp, &bytes)
        .map_err(|e| ConversionError::InvalidInput(format!("bad secret key: {e}")))
}
