//! Two-phase, out-of-band signature collection.
//!
//! Phase one binds the exact transaction, account and chain to one identifier and exports it.
//! Phase two accepts signature artifacts in any order, from any channel, and re-verifies each
//! against that identifier before counting it.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use cosign_types::{
    ChainReader, MetaTransaction, ReadError, SafeDomain, SafeTransactionParams, Signature,
    SignatureKind, TransferEnvelope,
};
use tracing::{debug, info, warn};

use crate::{
    eip712::{encode_transaction_data, transaction_hash_in},
    errors::{EncodingError, SignatureError},
    interfaces::{IERC1271Legacy, IERC1271, ERC1271_MAGIC_VALUE, LEGACY_ERC1271_MAGIC_VALUE},
    signatures::{aggregate, verify_ecdsa},
};

#[derive(Clone, Debug)]
pub struct PendingTransaction {
    params: SafeTransactionParams,
    domain: SafeDomain,
    hash: B256,
    owners: Vec<Address>,
    threshold: usize,
    signatures: BTreeMap<Address, Signature>,
}

impl PendingTransaction {
    pub fn new(
        params: SafeTransactionParams,
        domain: SafeDomain,
        owners: Vec<Address>,
        threshold: usize,
    ) -> Self {
        let hash = transaction_hash_in(&params, &domain);
        debug!(%hash, account = %domain.verifying_contract, "bound pending transaction");
        Self {
            params,
            domain,
            hash,
            owners,
            threshold,
            signatures: BTreeMap::new(),
        }
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn params(&self) -> &SafeTransactionParams {
        &self.params
    }

    pub fn domain(&self) -> &SafeDomain {
        &self.domain
    }

    pub fn account(&self) -> Address {
        self.domain.verifying_contract
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Accepted signatures in verifier order.
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.values()
    }

    pub fn collected(&self) -> usize {
        self.signatures.len()
    }

    /// Owners that still have not signed.
    pub fn missing_signers(&self) -> Vec<Address> {
        self.owners
            .iter()
            .filter(|o| !self.signatures.contains_key(*o))
            .copied()
            .collect()
    }

    pub fn is_executable(&self) -> bool {
        self.threshold > 0 && self.signatures.len() >= self.threshold
    }

    /// Export the unsigned artifact; `transactions` is the batch as the proposer composed it.
    pub fn to_envelope(&self, transactions: Vec<MetaTransaction>) -> TransferEnvelope {
        let mut envelope =
            TransferEnvelope::new(self.account(), Some(self.domain.chain_id), transactions);
        envelope.safe_transaction = Some(self.params.clone());
        envelope.safe_transaction_hash = Some(self.hash);
        envelope
    }

    /// Export an artifact carrying one signer's signature.
    pub fn to_signed_envelope(
        &self,
        transactions: Vec<MetaTransaction>,
        signature: Signature,
    ) -> TransferEnvelope {
        let mut envelope = self.to_envelope(transactions);
        envelope.signature = Some(signature);
        envelope
    }

    /// Accept a signature that can be checked offline (typed-data ECDSA or eth_sign).
    ///
    /// Approved-hash and contract signatures need the chain; they answer `Unverifiable` here and
    /// must go through [`Self::add_verified_signature`].
    pub fn add_signature(&mut self, sig: Signature) -> Result<(), SignatureError> {
        self.admit(&sig)?;
        match sig.kind {
            SignatureKind::Ecdsa | SignatureKind::EthSign => {
                if let Err(err) = verify_ecdsa(self.hash, &sig) {
                    warn!(signer = %sig.signer, %err, "rejected signature");
                    return Err(err);
                }
            }
            SignatureKind::ApprovedHash | SignatureKind::Contract => {
                return Err(SignatureError::Unverifiable {
                    signer: sig.signer,
                    source: ReadError::NotImplemented,
                });
            }
        }
        self.accept(sig);
        Ok(())
    }

    /// Accept any kind of signature, consulting the chain for approvals and contract signers.
    pub async fn add_verified_signature(
        &mut self,
        sig: Signature,
        reader: &dyn ChainReader,
    ) -> Result<(), SignatureError> {
        match sig.kind {
            SignatureKind::Ecdsa | SignatureKind::EthSign => return self.add_signature(sig),
            SignatureKind::ApprovedHash => {
                self.admit(&sig)?;
                let approved = reader
                    .read_approval_status(self.account(), sig.signer, self.hash)
                    .await
                    .map_err(|source| SignatureError::Unverifiable {
                        signer: sig.signer,
                        source,
                    })?;
                if !approved {
                    warn!(signer = %sig.signer, hash = %self.hash, "hash not approved on-chain");
                    return Err(SignatureError::NotApproved(sig.signer));
                }
            }
            SignatureKind::Contract => {
                self.admit(&sig)?;
                let preimage = encode_transaction_data(&self.params, &self.domain);
                check_contract_signature(reader, sig.signer, self.hash, preimage, sig.data.clone())
                    .await?;
            }
        }
        self.accept(sig);
        Ok(())
    }

    /// The verifier-ordered blob of everything accepted so far.
    pub fn aggregate(&self) -> Result<Bytes, EncodingError> {
        let sigs: Vec<Signature> = self.signatures.values().cloned().collect();
        aggregate(&sigs)
    }

    fn admit(&self, sig: &Signature) -> Result<(), SignatureError> {
        if !self.owners.contains(&sig.signer) {
            warn!(signer = %sig.signer, "signature from non-owner");
            return Err(SignatureError::NotOwner(sig.signer));
        }
        if self.signatures.contains_key(&sig.signer) {
            return Err(SignatureError::Duplicate(sig.signer));
        }
        Ok(())
    }

    fn accept(&mut self, sig: Signature) {
        info!(
            signer = %sig.signer,
            kind = ?sig.kind,
            collected = self.signatures.len() + 1,
            threshold = self.threshold,
            "accepted signature"
        );
        self.signatures.insert(sig.signer, sig);
    }
}

/// ERC-1271: `isValidSignature(bytes32,bytes)` must answer its magic value. Signers that only
/// implement the older `isValidSignature(bytes,bytes)` are asked about the transaction pre-image
/// instead.
async fn check_contract_signature(
    reader: &dyn ChainReader,
    signer: Address,
    hash: B256,
    preimage: Vec<u8>,
    payload: Bytes,
) -> Result<(), SignatureError> {
    let current = IERC1271::isValidSignatureCall {
        hash,
        signature: payload.clone(),
    };
    let first = query_magic(reader, signer, current.abi_encode()).await;
    if matches!(first, Ok(magic) if magic == ERC1271_MAGIC_VALUE) {
        return Ok(());
    }

    let legacy = IERC1271Legacy::isValidSignatureCall {
        data: preimage.into(),
        signature: payload,
    };
    let second = query_magic(reader, signer, legacy.abi_encode()).await;
    match (first, second) {
        (_, Ok(magic)) if magic == LEGACY_ERC1271_MAGIC_VALUE => {
            debug!(%signer, "contract signer accepted via legacy interface");
            Ok(())
        }
        (Err(source), Err(_)) => Err(SignatureError::Unverifiable { signer, source }),
        _ => {
            warn!(%signer, "contract signer rejected signature");
            Err(SignatureError::ContractRejected(signer))
        }
    }
}

/// Both interface versions return a single `bytes4`.
async fn query_magic(
    reader: &dyn ChainReader,
    signer: Address,
    call: Vec<u8>,
) -> Result<[u8; 4], ReadError> {
    let ret = reader.call_view(signer, call.into()).await?;
    IERC1271::isValidSignatureCall::abi_decode_returns(&ret, true)
        .map(|decoded| decoded.magicValue.0)
        .map_err(|_| ReadError::MalformedReturn)
}
