//! Portable text form of a [`TransferEnvelope`]: `0x`-prefixed lowercase hex of its UTF-8 JSON.
//!
//! Decoding checks shape only. Whether the carried hash and signature are right is answered by
//! [`verify_envelope`].

use alloy_primitives::{Address, B256};
use cosign_types::{
    MetaTransaction, SafeTransactionParams, Signature, SignatureKind, TransferEnvelope,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    eip712::transaction_hash,
    errors::{EnvelopeError, HashMismatchError, ProtocolError},
    signatures::verify_ecdsa,
};

const REQUIRED_FIELDS: [&str; 2] = ["transactions", "account"];

pub fn encode_envelope(envelope: &TransferEnvelope) -> Result<String, EnvelopeError> {
    let json =
        serde_json::to_vec(envelope).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
    Ok(format!("0x{}", hex::encode(json)))
}

/// Parse portable text. The `0x` prefix is optional on input. Nothing is returned unless the
/// whole envelope parses.
pub fn decode_envelope(text: &str) -> Result<TransferEnvelope, EnvelopeError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let raw = hex::decode(body).map_err(|e| EnvelopeError::InvalidHex(e.to_string()))?;
    let json = String::from_utf8(raw).map_err(|_| EnvelopeError::InvalidUtf8)?;
    let value: Value =
        serde_json::from_str(&json).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or_else(|| EnvelopeError::InvalidField {
        field: "envelope".to_string(),
        reason: "expected a JSON object".to_string(),
    })?;
    for field in REQUIRED_FIELDS {
        if object.get(field).map_or(true, Value::is_null) {
            return Err(EnvelopeError::MissingField(field));
        }
    }

    check_field::<Vec<MetaTransaction>>(object, "transactions")?;
    check_field::<Address>(object, "account")?;
    check_field::<SafeTransactionParams>(object, "safeTransaction")?;
    check_field::<B256>(object, "safeTransactionHash")?;
    check_field::<Signature>(object, "signature")?;

    let envelope: TransferEnvelope =
        serde_json::from_value(value).map_err(|e| EnvelopeError::InvalidField {
            field: "envelope".to_string(),
            reason: e.to_string(),
        })?;
    debug!(
        account = %envelope.account,
        transactions = envelope.transactions.len(),
        signed = envelope.signature.is_some(),
        "decoded envelope"
    );
    Ok(envelope)
}

fn check_field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), EnvelopeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(v) => serde_json::from_value::<T>(v.clone())
            .map(|_| ())
            .map_err(|e| EnvelopeError::InvalidField {
                field: field.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Recompute what the envelope claims.
///
/// When it carries a transaction and its hash, the hash is recomputed (chain-bound domain) and
/// must match. A carried ECDSA signature must then recover to its signer over that hash. Returns
/// the verified hash, if there was one to verify.
pub fn verify_envelope(envelope: &TransferEnvelope) -> Result<Option<B256>, ProtocolError> {
    let (Some(params), Some(claimed)) = (&envelope.safe_transaction, envelope.safe_transaction_hash)
    else {
        if envelope.signature.is_some() {
            return Err(EnvelopeError::MissingField("safeTransactionHash").into());
        }
        return Ok(None);
    };
    let chain_id = envelope.chain_id.ok_or(EnvelopeError::MissingField("chainId"))?;

    let local = transaction_hash(params, envelope.account, chain_id);
    if local != claimed {
        return Err(HashMismatchError {
            local,
            remote: claimed,
        }
        .into());
    }

    if let Some(sig) = &envelope.signature {
        if matches!(sig.kind, SignatureKind::Ecdsa | SignatureKind::EthSign) {
            verify_ecdsa(local, sig)?;
        }
    }
    info!(hash = %local, account = %envelope.account, "envelope verified");
    Ok(Some(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalKeySigner;
    use alloy_primitives::{Bytes, U256};

    fn sample() -> TransferEnvelope {
        TransferEnvelope::new(
            Address::repeat_byte(0x11),
            Some(1),
            vec![
                MetaTransaction::call(Address::repeat_byte(0x22), U256::from(1u64) << 200, Bytes::new()),
                MetaTransaction::call(Address::repeat_byte(0x33), U256::ZERO, vec![0xa9, 0x05, 0x9c, 0xbb]),
            ],
        )
    }

    fn hex_of(json: &str) -> String {
        format!("0x{}", hex::encode(json))
    }

    #[test]
    fn big_values_survive_the_round_trip() {
        let envelope = sample();
        let text = encode_envelope(&envelope).unwrap();
        assert!(text.starts_with("0x"));
        let back = decode_envelope(&text).unwrap();
        assert_eq!(back, envelope);
        assert_eq!(back.transactions[0].value, U256::from(1u64) << 200);

        let json = String::from_utf8(hex::decode(&text[2..]).unwrap()).unwrap();
        assert!(json.contains("\"1606938044258990275541962092341162602522202993782792835301376\""));
    }

    #[test]
    fn accepts_unprefixed_text() {
        let text = encode_envelope(&sample()).unwrap();
        assert_eq!(decode_envelope(&text[2..]).unwrap(), sample());
    }

    #[test]
    fn reports_missing_and_invalid_fields() {
        assert_eq!(
            decode_envelope(&hex_of(r#"{"account":"0x1111111111111111111111111111111111111111"}"#)),
            Err(EnvelopeError::MissingField("transactions"))
        );
        assert_eq!(
            decode_envelope(&hex_of(r#"{"transactions":[]}"#)),
            Err(EnvelopeError::MissingField("account"))
        );
        assert!(matches!(
            decode_envelope(&hex_of(r#"{"transactions":[],"account":"0x12"}"#)),
            Err(EnvelopeError::InvalidField { field, .. }) if field == "account"
        ));
        assert!(matches!(
            decode_envelope(&hex_of(
                r#"{"transactions":[{"to":"0x1111111111111111111111111111111111111111","value":1}],"account":"0x1111111111111111111111111111111111111111"}"#
            )),
            Err(EnvelopeError::InvalidField { field, .. }) if field == "transactions"
        ));
    }

    #[test]
    fn signature_kind_must_match_its_payload() {
        let signer = Address::repeat_byte(0x44);
        let mut envelope = sample();
        envelope.signature = Some(Signature::approved_hash(signer));
        let text = encode_envelope(&envelope).unwrap();
        assert_eq!(decode_envelope(&text).unwrap(), envelope);

        let json = String::from_utf8(hex::decode(&text[2..]).unwrap()).unwrap();
        assert!(json.contains(r#""kind":"approvedHash""#));
        let relabelled = json.replace(r#""kind":"approvedHash""#, r#""kind":"ethSign""#);
        assert!(matches!(
            decode_envelope(&hex_of(&relabelled)),
            Err(EnvelopeError::InvalidField { field, .. }) if field == "signature"
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_envelope("0xzz"), Err(EnvelopeError::InvalidHex(_))));
        assert_eq!(decode_envelope("0xff"), Err(EnvelopeError::InvalidUtf8));
        assert!(matches!(decode_envelope(&hex_of("{")), Err(EnvelopeError::InvalidJson(_))));
        assert!(matches!(decode_envelope(&hex_of("[]")), Err(EnvelopeError::InvalidField { .. })));
    }

    #[test]
    fn verify_recomputes_hash_and_signature() {
        let signer = LocalKeySigner::from_bytes(&[0x31; 32]).unwrap();
        let mut envelope = sample();
        let params = SafeTransactionParams::from_meta(envelope.transactions[1].clone(), U256::from(4u64));
        let hash = transaction_hash(&params, envelope.account, 1);
        envelope.safe_transaction = Some(params);
        envelope.safe_transaction_hash = Some(hash);
        envelope.signature = Some(signer.sign_hash(hash).unwrap());
        assert_eq!(verify_envelope(&envelope).unwrap(), Some(hash));

        let mut wrong_signer = envelope.clone();
        if let Some(sig) = wrong_signer.signature.as_mut() {
            sig.signer = Address::repeat_byte(0x99);
        }
        assert!(matches!(
            verify_envelope(&wrong_signer),
            Err(ProtocolError::Signature(_))
        ));

        let mut tampered = envelope.clone();
        tampered.chain_id = Some(5);
        assert!(matches!(
            verify_envelope(&tampered),
            Err(ProtocolError::HashMismatch(HashMismatchError { remote, .. })) if remote == hash
        ));

        assert_eq!(verify_envelope(&sample()).unwrap(), None);
    }
}
