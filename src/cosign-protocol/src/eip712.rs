//! Canonical transaction identifier (EIP-712 typed-data hash).
//!
//! Every co-signer derives the identifier independently and must agree on it bit for bit:
//! `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`, where the struct hash covers every
//! field of the transaction with `data` pre-hashed.

use alloy_primitives::{b256, keccak256, Address, B256};
use cosign_types::{DomainKind, SafeDomain, SafeTransactionParams};

use crate::{
    errors::EncodingError,
    utils::bytes::{pad_address, word_u64},
};

/// keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")
pub const DOMAIN_SEPARATOR_TYPEHASH: B256 =
    b256!("47e79534a245952e8b16893a336b85a3d9ea9fa8c573f3d803afb92a79469218");

/// keccak256("EIP712Domain(address verifyingContract)")
pub const LEGACY_DOMAIN_SEPARATOR_TYPEHASH: B256 =
    b256!("035aff83d86937d35b32e04f0ddc6ff469290eef2f1b692d8a815c89404d4749");

/// keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)")
pub const SAFE_TX_TYPEHASH: B256 =
    b256!("bb8310d486368db6bd6f849402fdd73ad53d316b5a4b2644ad6efe0f941286d8");

pub fn domain_type_hash(kind: DomainKind) -> B256 {
    match kind {
        DomainKind::ChainBound => DOMAIN_SEPARATOR_TYPEHASH,
        DomainKind::Legacy => LEGACY_DOMAIN_SEPARATOR_TYPEHASH,
    }
}

/// Domain separator for a verifying account.
///
/// The chain id only participates for the chain-bound domain; any type hash other than the two
/// known layouts is rejected.
pub fn domain_separator(
    domain_type_hash: B256,
    chain_id: u64,
    verifying_contract: Address,
) -> Result<B256, EncodingError> {
    let mut buf = Vec::with_capacity(32 * 3);
    buf.extend_from_slice(domain_type_hash.as_slice());
    if domain_type_hash == DOMAIN_SEPARATOR_TYPEHASH {
        buf.extend_from_slice(&word_u64(chain_id));
    } else if domain_type_hash != LEGACY_DOMAIN_SEPARATOR_TYPEHASH {
        return Err(EncodingError::UnsupportedDomain(domain_type_hash));
    }
    buf.extend_from_slice(&pad_address(verifying_contract));
    Ok(keccak256(buf))
}

pub fn safe_domain_separator(domain: &SafeDomain) -> B256 {
    let mut buf = Vec::with_capacity(32 * 3);
    buf.extend_from_slice(domain_type_hash(domain.kind).as_slice());
    if domain.kind == DomainKind::ChainBound {
        buf.extend_from_slice(&word_u64(domain.chain_id));
    }
    buf.extend_from_slice(&pad_address(domain.verifying_contract));
    keccak256(buf)
}

/// Struct hash of the transaction. Every field is one 32-byte word; `data` enters as its hash.
pub fn safe_tx_struct_hash(params: &SafeTransactionParams) -> B256 {
    let mut buf = Vec::with_capacity(32 * 11);
    buf.extend_from_slice(SAFE_TX_TYPEHASH.as_slice());
    buf.extend_from_slice(&pad_address(params.to));
    buf.extend_from_slice(&params.value.to_be_bytes::<32>());
    buf.extend_from_slice(keccak256(&params.data).as_slice());
    buf.extend_from_slice(&word_u64(u8::from(params.operation) as u64));
    buf.extend_from_slice(&params.safe_tx_gas.to_be_bytes::<32>());
    buf.extend_from_slice(&params.base_gas.to_be_bytes::<32>());
    buf.extend_from_slice(&params.gas_price.to_be_bytes::<32>());
    buf.extend_from_slice(&pad_address(params.gas_token));
    buf.extend_from_slice(&pad_address(params.refund_receiver));
    buf.extend_from_slice(&params.nonce.to_be_bytes::<32>());
    keccak256(buf)
}

/// The 66-byte pre-image `0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash`, as returned by the
/// account's own `encodeTransactionData` view.
pub fn encode_transaction_data(params: &SafeTransactionParams, domain: &SafeDomain) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(safe_domain_separator(domain).as_slice());
    buf.extend_from_slice(safe_tx_struct_hash(params).as_slice());
    buf
}

pub fn transaction_hash_in(params: &SafeTransactionParams, domain: &SafeDomain) -> B256 {
    keccak256(encode_transaction_data(params, domain))
}

/// Transaction identifier for an account using the chain-bound domain.
pub fn transaction_hash(params: &SafeTransactionParams, account: Address, chain_id: u64) -> B256 {
    transaction_hash_in(params, &SafeDomain::new(chain_id, account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, U256};
    use alloy_sol_types::{sol, Eip712Domain, SolStruct};
    use cosign_types::Operation;

    sol! {
        struct SafeTx {
            address to;
            uint256 value;
            bytes data;
            uint8 operation;
            uint256 safeTxGas;
            uint256 baseGas;
            uint256 gasPrice;
            address gasToken;
            address refundReceiver;
            uint256 nonce;
        }
    }

    fn account() -> Address {
        Address::repeat_byte(0x11)
    }

    fn simple_transfer() -> SafeTransactionParams {
        SafeTransactionParams {
            to: Address::repeat_byte(0x22),
            value: U256::from(10u64).pow(U256::from(18u64)),
            data: Bytes::new(),
            operation: Operation::Call,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: U256::ZERO,
        }
    }

    fn token_transfer_with_refund() -> SafeTransactionParams {
        let mut data = hex::decode("a9059cbb").unwrap();
        data.extend_from_slice(&pad_address(Address::repeat_byte(0x55)));
        data.extend_from_slice(&U256::from(1_000_000u64).to_be_bytes::<32>());
        SafeTransactionParams {
            to: Address::repeat_byte(0x22),
            value: U256::ZERO,
            data: data.into(),
            operation: Operation::DelegateCall,
            safe_tx_gas: U256::from(50_000u64),
            base_gas: U256::from(21_000u64),
            gas_price: U256::from(1_000_000_000u64),
            gas_token: Address::repeat_byte(0x33),
            refund_receiver: Address::repeat_byte(0x44),
            nonce: U256::from(7u64),
        }
    }

    #[test]
    fn type_hashes_match_their_preimages() {
        assert_eq!(
            keccak256("EIP712Domain(uint256 chainId,address verifyingContract)"),
            DOMAIN_SEPARATOR_TYPEHASH
        );
        assert_eq!(keccak256("EIP712Domain(address verifyingContract)"), LEGACY_DOMAIN_SEPARATOR_TYPEHASH);
        assert_eq!(
            keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)"),
            SAFE_TX_TYPEHASH
        );
    }

    #[test]
    fn fixed_vectors() {
        assert_eq!(
            domain_separator(DOMAIN_SEPARATOR_TYPEHASH, 1, account()).unwrap(),
            b256!("f0dcfe86ad4a409690a57dbaae9b1e14c5ea1750a48271a0a3a6037a8100624d")
        );
        assert_eq!(
            safe_tx_struct_hash(&simple_transfer()),
            b256!("c97239a7ac1a639441b6fc2a693c75fb40e697d0b369d1327472ccc4a8046255")
        );
        assert_eq!(
            transaction_hash(&simple_transfer(), account(), 1),
            b256!("8cd8fe6e0e307b5a96de2dedfdb14614a9e62c0cca1377a6ee2de554d15ba4ec")
        );
        assert_eq!(
            domain_separator(DOMAIN_SEPARATOR_TYPEHASH, 100, account()).unwrap(),
            b256!("a14ba9b5951d857dc7e7bf7fa9b3e88cd61300fd5d675b94127690b7d1c3c4c2")
        );
        assert_eq!(
            transaction_hash(&token_transfer_with_refund(), account(), 100),
            b256!("2dd222b53022f6dbba1a9ab89fc06102a7390db145698d5dbd090e80e553c340")
        );
    }

    #[test]
    fn legacy_domain_ignores_chain_id() {
        let legacy = SafeDomain {
            chain_id: 1,
            verifying_contract: account(),
            kind: DomainKind::Legacy,
        };
        assert_eq!(
            safe_domain_separator(&legacy),
            b256!("c6172c436a72ad7286cf5e21dcc39bf417e7f8a6404b5f0f1c25c6a30b44831c")
        );
        assert_eq!(
            transaction_hash_in(&simple_transfer(), &legacy),
            b256!("2f56681933ed90bbdd293ec9cf32dbdcbd98ab626bc31ec0e11144586b29dea6")
        );
        let other_chain = SafeDomain { chain_id: 5, ..legacy };
        assert_eq!(safe_domain_separator(&other_chain), safe_domain_separator(&legacy));
        assert_eq!(
            domain_separator(LEGACY_DOMAIN_SEPARATOR_TYPEHASH, 5, account()).unwrap(),
            safe_domain_separator(&legacy)
        );
    }

    #[test]
    fn unknown_domain_type_is_rejected() {
        let bogus = keccak256("EIP712Domain(string name)");
        assert_eq!(
            domain_separator(bogus, 1, account()),
            Err(EncodingError::UnsupportedDomain(bogus))
        );
    }

    #[test]
    fn agrees_with_sol_struct_hashing() {
        for (params, chain_id) in [(simple_transfer(), 1u64), (token_transfer_with_refund(), 100)] {
            let typed = SafeTx {
                to: params.to,
                value: params.value,
                data: params.data.clone(),
                operation: params.operation.into(),
                safeTxGas: params.safe_tx_gas,
                baseGas: params.base_gas,
                gasPrice: params.gas_price,
                gasToken: params.gas_token,
                refundReceiver: params.refund_receiver,
                nonce: params.nonce,
            };
            let domain = Eip712Domain::new(None, None, Some(U256::from(chain_id)), Some(account()), None);
            assert_eq!(typed.eip712_signing_hash(&domain), transaction_hash(&params, account(), chain_id));
        }
    }

    #[test]
    fn is_deterministic() {
        let params = token_transfer_with_refund();
        let first = transaction_hash(&params, account(), 100);
        for _ in 0..3 {
            assert_eq!(transaction_hash(&params.clone(), account(), 100), first);
        }
    }

    #[test]
    fn every_field_participates() {
        let base = token_transfer_with_refund();
        let reference = transaction_hash(&base, account(), 100);
        let mut variants = Vec::new();
        let mut p = base.clone();
        p.to = Address::repeat_byte(0x23);
        variants.push(p);
        let mut p = base.clone();
        p.value = U256::from(1u64);
        variants.push(p);
        let mut p = base.clone();
        p.data = Bytes::from(vec![0x00]);
        variants.push(p);
        let mut p = base.clone();
        p.operation = Operation::Call;
        variants.push(p);
        let mut p = base.clone();
        p.safe_tx_gas += U256::from(1u64);
        variants.push(p);
        let mut p = base.clone();
        p.base_gas += U256::from(1u64);
        variants.push(p);
        let mut p = base.clone();
        p.gas_price += U256::from(1u64);
        variants.push(p);
        let mut p = base.clone();
        p.gas_token = Address::ZERO;
        variants.push(p);
        let mut p = base.clone();
        p.refund_receiver = Address::ZERO;
        variants.push(p);
        let mut p = base.clone();
        p.nonce += U256::from(1u64);
        variants.push(p);

        for variant in &variants {
            assert_ne!(transaction_hash(variant, account(), 100), reference, "{variant:?}");
        }
        assert_ne!(transaction_hash(&base, Address::repeat_byte(0x12), 100), reference);
        assert_ne!(transaction_hash(&base, account(), 101), reference);
    }

    #[test]
    fn nonce_change_vector() {
        let mut params = simple_transfer();
        params.nonce = U256::from(1u64);
        assert_eq!(
            transaction_hash(&params, account(), 1),
            b256!("b2c2e06269f16a730d83543d3d0ac8e9ba7224fa5de422f086351c0d833fa62c")
        );
    }
}
