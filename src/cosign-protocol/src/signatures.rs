//! The single signature blob the account's verifier accepts.
//!
//! Layout: `n` fixed 65-byte entries sorted ascending by signer, followed by the dynamic tail.
//! A contract signer's entry is `signer (32) ‖ offset (32) ‖ 0x00`, where `offset` is the byte
//! position of its `length (32) ‖ payload` tail counted from the start of the blob.

use alloy_primitives::{Address, Bytes, B256};
use cosign_types::{Signature, SignatureKind, APPROVED_HASH_MARKER, ETH_SIGN_V_OFFSET, SIGNATURE_LEN};

use crate::{
    errors::{EncodingError, SignatureError},
    utils::{
        bytes::{pad_address, read_address, read_len, read_vec, word_usize},
        crypto::{ecrecover_address, eth_sign_digest},
    },
};

const CONTRACT_SIGNATURE_V: u8 = 0;

/// Concatenate signatures in verifier order.
///
/// Input order is irrelevant; output is sorted by signer address. Byte order of an address is
/// the same as case-insensitive order of its hex form.
pub fn aggregate(signatures: &[Signature]) -> Result<Bytes, EncodingError> {
    let mut sorted: Vec<&Signature> = signatures.iter().collect();
    sorted.sort_by(|a, b| a.signer.cmp(&b.signer));

    let mut static_part = Vec::with_capacity(sorted.len() * SIGNATURE_LEN);
    let mut dynamic_part = Vec::new();
    let mut offset = sorted.len() * SIGNATURE_LEN;

    for sig in sorted {
        if sig.dynamic() {
            static_part.extend_from_slice(&pad_address(sig.signer));
            static_part.extend_from_slice(&word_usize(offset));
            static_part.push(CONTRACT_SIGNATURE_V);

            let start = dynamic_part.len();
            dynamic_part.extend_from_slice(&word_usize(sig.data.len()));
            dynamic_part.extend_from_slice(&sig.data);
            offset += dynamic_part.len() - start;
        } else {
            if sig.data.len() != SIGNATURE_LEN {
                return Err(EncodingError::WrongWidth {
                    expected: SIGNATURE_LEN,
                    actual: sig.data.len(),
                });
            }
            static_part.extend_from_slice(&sig.data);
        }
    }

    static_part.extend_from_slice(&dynamic_part);
    Ok(static_part.into())
}

/// Recover the signer of a 65-byte ECDSA signature over `hash`.
///
/// `v ∈ {27, 28}` signs the identifier directly; `v ∈ {31, 32}` signed it through the
/// `eth_sign` prefix. Returns `None` for anything else or an invalid curve point.
pub fn recover_signer(hash: B256, data: &[u8]) -> Option<Address> {
    if data.len() != SIGNATURE_LEN {
        return None;
    }
    let v = data[SIGNATURE_LEN - 1];
    match v {
        27 | 28 => ecrecover_address(hash, &data[..64], v),
        31 | 32 => ecrecover_address(eth_sign_digest(hash), &data[..64], v - ETH_SIGN_V_OFFSET),
        _ => None,
    }
}

/// Check an ECDSA or eth_sign signature recovers to its claimed signer over `hash`.
pub fn verify_ecdsa(hash: B256, sig: &Signature) -> Result<(), SignatureError> {
    if sig.data.len() != SIGNATURE_LEN {
        return Err(SignatureError::Malformed {
            signer: sig.signer,
            source: EncodingError::WrongWidth {
                expected: SIGNATURE_LEN,
                actual: sig.data.len(),
            },
        });
    }
    let recovered = recover_signer(hash, &sig.data).ok_or(SignatureError::Unrecoverable(sig.signer))?;
    if recovered != sig.signer {
        return Err(SignatureError::SignerMismatch {
            claimed: sig.signer,
            recovered,
        });
    }
    Ok(())
}

/// Split an aggregated blob back into `count` signatures.
///
/// ECDSA signers are recovered against `hash`; every contract entry's offset must point exactly
/// at the next unread tail.
pub fn decode_signatures(hash: B256, blob: &[u8], count: usize) -> Result<Vec<Signature>, EncodingError> {
    let static_len = count
        .checked_mul(SIGNATURE_LEN)
        .ok_or(EncodingError::LengthOverflow(alloy_primitives::U256::from(count)))?;
    if blob.len() < static_len {
        return Err(EncodingError::Truncated {
            offset: 0,
            needed: static_len,
            available: blob.len(),
        });
    }

    let mut out = Vec::with_capacity(count);
    let mut expected_offset = static_len;

    for index in 0..count {
        let entry = &blob[index * SIGNATURE_LEN..(index + 1) * SIGNATURE_LEN];
        let v = entry[SIGNATURE_LEN - 1];
        match v {
            CONTRACT_SIGNATURE_V => {
                let mut i = 12;
                let signer = read_address(entry, &mut i)?;
                let found = read_len(entry, &mut i)?;
                if found != expected_offset {
                    return Err(EncodingError::OffsetMismatch {
                        signer,
                        expected: expected_offset,
                        found,
                    });
                }
                let mut cursor = found;
                let len = read_len(blob, &mut cursor)?;
                let payload = read_vec(blob, &mut cursor, len)?;
                expected_offset = cursor;
                out.push(Signature::contract(signer, payload));
            }
            APPROVED_HASH_MARKER => {
                let mut i = 12;
                let signer = read_address(entry, &mut i)?;
                out.push(Signature::approved_hash(signer));
            }
            _ => {
                let signer = recover_signer(hash, entry).ok_or(EncodingError::InvalidSignature { index, v })?;
                out.push(Signature::ecdsa(signer, entry.to_vec()));
            }
        }
    }

    if expected_offset != blob.len() {
        return Err(EncodingError::WrongWidth {
            expected: expected_offset,
            actual: blob.len(),
        });
    }
    Ok(out)
}

/// Whether a signature can be checked without reading the chain.
pub fn is_offline_verifiable(sig: &Signature) -> bool {
    matches!(sig.kind, SignatureKind::Ecdsa | SignatureKind::EthSign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::{public_key_address, sign_digest};
    use alloy_primitives::{keccak256, U256};
    use k256::ecdsa::SigningKey;

    fn static_sig(byte: u8) -> Signature {
        let mut data = vec![byte; SIGNATURE_LEN];
        data[64] = 27;
        Signature::ecdsa(Address::repeat_byte(byte), data)
    }

    fn word_at(blob: &[u8], at: usize) -> U256 {
        U256::from_be_slice(&blob[at..at + 32])
    }

    #[test]
    fn length_counts_tails() {
        let sigs = vec![
            static_sig(0x10),
            Signature::contract(Address::repeat_byte(0x20), vec![1, 2, 3]),
            static_sig(0x30),
            Signature::contract(Address::repeat_byte(0x40), vec![7u8; 40]),
        ];
        let blob = aggregate(&sigs).unwrap();
        assert_eq!(blob.len(), 65 * 4 + (3 + 40) + 32 * 2);
    }

    #[test]
    fn output_is_sorted_whatever_the_input_order() {
        let sigs = vec![
            static_sig(0xaa),
            Signature::contract(Address::repeat_byte(0x02), vec![5u8; 5]),
            static_sig(0x01),
            Signature::contract(Address::repeat_byte(0x03), vec![6u8; 2]),
        ];
        let expected = aggregate(&sigs).unwrap();

        let mut reversed = sigs.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed).unwrap(), expected);

        for shift in 1..sigs.len() {
            let mut rotated = sigs.clone();
            rotated.rotate_left(shift);
            assert_eq!(aggregate(&rotated).unwrap(), expected);
        }

        // 0x01.. first, 0xaa.. last.
        assert_eq!(&expected[..65], static_sig(0x01).data.as_ref());
        assert_eq!(&expected[195..260], static_sig(0xaa).data.as_ref());
    }

    #[test]
    fn dynamic_offsets_point_at_their_tails() {
        let sigs = vec![
            static_sig(0x01),
            Signature::contract(Address::repeat_byte(0x02), vec![5u8; 5]),
            Signature::contract(Address::repeat_byte(0x03), vec![6u8; 2]),
            static_sig(0xaa),
        ];
        let blob = aggregate(&sigs).unwrap();

        // entry 1: contract signer 0x02.., first tail at 4 * 65
        assert_eq!(&blob[65 + 12..65 + 32], Address::repeat_byte(0x02).as_slice());
        assert_eq!(word_at(&blob, 65 + 32), U256::from(260u64));
        assert_eq!(blob[129], 0);
        assert_eq!(word_at(&blob, 260), U256::from(5u64));
        assert_eq!(&blob[292..297], &[5u8; 5]);

        // entry 2: second tail follows the first (32 + 5 bytes later)
        assert_eq!(word_at(&blob, 130 + 32), U256::from(297u64));
        assert_eq!(word_at(&blob, 297), U256::from(2u64));
        assert_eq!(&blob[329..331], &[6u8; 2]);
        assert_eq!(blob.len(), 331);
    }

    #[test]
    fn static_entries_must_be_65_bytes() {
        let bad = Signature::ecdsa(Address::ZERO, vec![0u8; 64]);
        assert_eq!(
            aggregate(&[bad]),
            Err(EncodingError::WrongWidth {
                expected: 65,
                actual: 64
            })
        );
        assert_eq!(aggregate(&[]).unwrap().len(), 0);
    }

    #[test]
    fn recovers_typed_data_and_eth_sign() {
        let key = SigningKey::from_slice(&[0x44; 32]).unwrap();
        let owner = public_key_address(key.verifying_key());
        let hash = keccak256(b"safe-tx");

        let direct = sign_digest(&key, hash).unwrap();
        assert_eq!(recover_signer(hash, &direct), Some(owner));

        let mut prefixed = sign_digest(&key, eth_sign_digest(hash)).unwrap();
        prefixed[64] += ETH_SIGN_V_OFFSET;
        assert_eq!(recover_signer(hash, &prefixed), Some(owner));

        let sig = Signature::ecdsa(owner, prefixed.to_vec());
        assert_eq!(sig.kind, SignatureKind::EthSign);
        assert!(verify_ecdsa(hash, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_signer_or_hash() {
        let key = SigningKey::from_slice(&[0x45; 32]).unwrap();
        let owner = public_key_address(key.verifying_key());
        let hash = keccak256(b"one");
        let data = sign_digest(&key, hash).unwrap().to_vec();

        let impostor = Address::repeat_byte(0x99);
        assert_eq!(
            verify_ecdsa(hash, &Signature::ecdsa(impostor, data.clone())),
            Err(SignatureError::SignerMismatch {
                claimed: impostor,
                recovered: owner
            })
        );
        assert!(matches!(
            verify_ecdsa(keccak256(b"two"), &Signature::ecdsa(owner, data)),
            Err(SignatureError::SignerMismatch { .. })
        ));
        assert!(matches!(
            verify_ecdsa(hash, &Signature::ecdsa(owner, vec![0u8; 10])),
            Err(SignatureError::Malformed { .. })
        ));
    }

    #[test]
    fn decode_inverts_aggregate() {
        let key = SigningKey::from_slice(&[0x46; 32]).unwrap();
        let owner = public_key_address(key.verifying_key());
        let hash = keccak256(b"mixed");
        let sigs = vec![
            Signature::ecdsa(owner, sign_digest(&key, hash).unwrap().to_vec()),
            Signature::approved_hash(Address::repeat_byte(0x05)),
            Signature::contract(Address::repeat_byte(0x06), vec![0xab; 70]),
        ];
        let blob = aggregate(&sigs).unwrap();
        let mut decoded = decode_signatures(hash, &blob, 3).unwrap();
        let mut expected = sigs.clone();
        decoded.sort_by_key(|s| s.signer);
        expected.sort_by_key(|s| s.signer);
        assert_eq!(decoded, expected);
    }

    #[test]
    fn decode_detects_shifted_offset() {
        let sigs = vec![
            Signature::approved_hash(Address::repeat_byte(0x01)),
            Signature::contract(Address::repeat_byte(0x02), vec![1u8; 4]),
        ];
        let mut blob = aggregate(&sigs).unwrap().to_vec();
        // offset word of entry 1 lives at 65 + 32..65 + 64; bump its last byte
        blob[65 + 63] += 1;
        assert_eq!(
            decode_signatures(B256::ZERO, &blob, 2),
            Err(EncodingError::OffsetMismatch {
                signer: Address::repeat_byte(0x02),
                expected: 130,
                found: 131
            })
        );
    }

    #[test]
    fn decode_rejects_unknown_v() {
        let mut entry = vec![0x11u8; 65];
        entry[64] = 5;
        assert_eq!(
            decode_signatures(B256::ZERO, &entry, 1),
            Err(EncodingError::InvalidSignature { index: 0, v: 5 })
        );
    }
}
