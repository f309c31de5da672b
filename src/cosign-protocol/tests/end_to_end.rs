use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use cosign_protocol::{
    aggregate, decode_envelope, decode_multisend, decode_signatures, encode_envelope,
    interfaces::{IERC20, IMultiSend},
    multisend::batch_transactions,
    recover_signer, transaction_hash, verify_envelope, LocalKeySigner, PendingTransaction,
};
use cosign_types::{
    ChainReader, MetaTransaction, Operation, ReadError, SafeDomain, SafeTransactionParams,
    TypedDataSigner,
};

const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
const MULTISEND: Address = address!("A238CBeb142c10Ef7Ad8442C6D1f9E89e07e7761");
const TOKEN: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

struct OfflineReader;

#[async_trait]
impl ChainReader for OfflineReader {}

fn batch() -> Vec<MetaTransaction> {
    let balance_query = IERC20::balanceOfCall { account: ACCOUNT }.abi_encode();
    vec![
        MetaTransaction::call(Address::repeat_byte(0x42), U256::from(10u64).pow(U256::from(18u64)), Bytes::new()),
        MetaTransaction::call(TOKEN, U256::ZERO, balance_query),
    ]
}

#[tokio::test]
async fn two_signers_two_subcalls() {
    let subcalls = batch();
    let meta = batch_transactions(&subcalls, MULTISEND).unwrap();
    assert_eq!(meta.operation, Operation::DelegateCall);
    assert_eq!(meta.to, MULTISEND);
    let packed = IMultiSend::multiSendCall::abi_decode(&meta.data, true).unwrap();
    assert_eq!(decode_multisend(&packed.transactions).unwrap(), subcalls);

    let params = SafeTransactionParams::from_meta(meta, U256::from(3u64));
    let domain = SafeDomain::new(1, ACCOUNT);
    let alice = LocalKeySigner::from_bytes(&[0xa1; 32]).unwrap();
    let bob = LocalKeySigner::from_bytes(&[0xb0; 32]).unwrap();
    let mut pending = PendingTransaction::new(params.clone(), domain, vec![alice.address(), bob.address()], 2);
    assert_eq!(pending.hash(), transaction_hash(&params, ACCOUNT, 1));

    // phase one: export, re-import on another device
    let exported = encode_envelope(&pending.to_envelope(subcalls.clone())).unwrap();
    let imported = decode_envelope(&exported).unwrap();
    assert_eq!(verify_envelope(&imported).unwrap(), Some(pending.hash()));
    let proposal = imported.safe_transaction.unwrap();

    // phase two: each signer signs independently and sends an artifact back
    let bob_sig = bob.sign_typed_data(&domain, &proposal).await.unwrap();
    let alice_sig = alice.sign_typed_data(&domain, &proposal).await.unwrap();
    for sig in [bob_sig, alice_sig] {
        let artifact = encode_envelope(&pending.to_signed_envelope(subcalls.clone(), sig)).unwrap();
        let back = decode_envelope(&artifact).unwrap();
        verify_envelope(&back).unwrap();
        pending
            .add_verified_signature(back.signature.unwrap(), &OfflineReader)
            .await
            .unwrap();
    }
    assert!(pending.is_executable());

    let blob = pending.aggregate().unwrap();
    assert_eq!(blob.len(), 130);
    let first = recover_signer(pending.hash(), &blob[..65]).unwrap();
    let second = recover_signer(pending.hash(), &blob[65..130]).unwrap();
    assert!(first < second);
    assert!(first.to_string().to_lowercase() < second.to_string().to_lowercase());
    let mut owners = vec![alice.address(), bob.address()];
    owners.sort();
    assert_eq!(vec![first, second], owners);

    let signatures: Vec<_> = pending.signatures().cloned().collect();
    assert_eq!(aggregate(&signatures).unwrap(), blob);
    assert_eq!(decode_signatures(pending.hash(), &blob, 2).unwrap(), signatures);
}

#[tokio::test]
async fn offline_reader_cannot_vouch_for_approvals() {
    let owner = Address::repeat_byte(0x01);
    let params = SafeTransactionParams::from_meta(batch().remove(0), U256::ZERO);
    let mut pending = PendingTransaction::new(params, SafeDomain::new(1, ACCOUNT), vec![owner], 1);
    let err = pending
        .add_verified_signature(cosign_types::Signature::approved_hash(owner), &OfflineReader)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cosign_protocol::SignatureError::Unverifiable {
            source: ReadError::NotImplemented,
            ..
        }
    ));
    assert!(!pending.is_executable());
}
