//! Counterfactual account addresses.
//!
//! The factory deploys with CREATE2, salting with the initializer so that an address commits to
//! the account's owners and threshold:
//!
//! - `saltHash = keccak256(keccak256(initializer) ‖ saltNonce)`
//! - `initCode = deploymentCode ‖ implementation (left-padded to 32 bytes)`
//! - `address  = last20(keccak256(0xff ‖ factory ‖ saltHash ‖ keccak256(initCode)))`
//!
//! There is no partial success here: a byte-order or padding slip yields an address nobody will
//! ever deploy to.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use cosign_types::MetaTransaction;

use crate::{
    interfaces::{IProxyFactory, ISafe},
    utils::bytes::pad_address,
};

/// `GnosisSafeProxyFactory.proxyCreationCode()` of the v1.3.0 deployment. Deploys a proxy whose
/// constructor takes the singleton address.
pub const PROXY_CREATION_CODE_V1_3_0: &[u8] = &alloy_primitives::hex!(
    // constructor
    "608060405234801561001057600080fd5b506040516101e63803806101e68339818101604052602081101561"
    "003357600080fd5b8101908080519060200190929190505050600073ffffffffffffffffffffffffffffffff"
    "ffffffff168173ffffffffffffffffffffffffffffffffffffffff1614156100ca576040517f08c379a00000"
    "0000000000000000000000000000000000000000000000000000815260040180806020018281038252602281"
    "52602001806101c46022913960400191505060405180910390fd5b806000806101000a81548173ffffffffff"
    "ffffffffffffffffffffffffffffff021916908373ffffffffffffffffffffffffffffffffffffffff160217"
    "9055505060ab806101196000396000f3fe"
    // runtime
    "608060405273ffffffffffffffffffffffffffffffffffffffff600054167fa619486e000000000000000000"
    "0000000000000000000000000000000000000060003514156050578060005260206000f35b36600080376000"
    "80366000845af43d6000803e60008114156070573d6000fd5b3d6000f3fea2646970667358221220d1429297"
    "349653a4918076d650332de1a1068c5f3e07c5c82360c277770b955264736f6c63430007060033"
    // "Invalid singleton address provided"
    "496e76616c69642073696e676c65746f6e20616464726573732070726f7669646564"
);

/// EIP-1014 address derivation.
pub fn create2_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
    buf.push(0xff);
    buf.extend_from_slice(deployer.as_slice());
    buf.extend_from_slice(salt.as_slice());
    buf.extend_from_slice(init_code_hash.as_slice());
    let hash = keccak256(buf);
    Address::from_slice(&hash[12..])
}

/// `keccak256(keccak256(initializer) ‖ saltNonce)`.
pub fn salt_hash(initializer: &[u8], salt_nonce: U256) -> B256 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(keccak256(initializer).as_slice());
    buf.extend_from_slice(&salt_nonce.to_be_bytes::<32>());
    keccak256(buf)
}

/// `deploymentCode ‖ implementation` as a 32-byte constructor argument.
pub fn proxy_init_code(deployment_code: &[u8], implementation: Address) -> Vec<u8> {
    let mut init_code = Vec::with_capacity(deployment_code.len() + 32);
    init_code.extend_from_slice(deployment_code);
    init_code.extend_from_slice(&pad_address(implementation));
    init_code
}

pub fn predict_address(
    factory: Address,
    implementation: Address,
    initializer: &[u8],
    salt_nonce: U256,
    deployment_code: &[u8],
) -> Address {
    let salt = salt_hash(initializer, salt_nonce);
    let init_code_hash = keccak256(proxy_init_code(deployment_code, implementation));
    create2_address(factory, salt, init_code_hash)
}

/// Owners, threshold and optional hooks an account is initialised with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSetup {
    pub owners: Vec<Address>,
    pub threshold: u64,
    /// Optional delegate call made during setup (module installation).
    pub to: Address,
    pub data: Bytes,
    pub fallback_handler: Address,
    pub payment_token: Address,
    pub payment: U256,
    pub payment_receiver: Address,
}

impl AccountSetup {
    pub fn new(owners: Vec<Address>, threshold: u64, fallback_handler: Address) -> Self {
        Self {
            owners,
            threshold,
            to: Address::ZERO,
            data: Bytes::new(),
            fallback_handler,
            payment_token: Address::ZERO,
            payment: U256::ZERO,
            payment_receiver: Address::ZERO,
        }
    }
}

/// ABI-encoded `setup(...)` call used as the proxy initializer.
pub fn setup_initializer(setup: &AccountSetup) -> Bytes {
    ISafe::setupCall {
        _owners: setup.owners.clone(),
        _threshold: U256::from(setup.threshold),
        to: setup.to,
        data: setup.data.clone(),
        fallbackHandler: setup.fallback_handler,
        paymentToken: setup.payment_token,
        payment: setup.payment,
        paymentReceiver: setup.payment_receiver,
    }
    .abi_encode()
    .into()
}

/// The factory call that deploys the account [`predict_address`] describes.
pub fn deployment_transaction(
    factory: Address,
    implementation: Address,
    initializer: Bytes,
    salt_nonce: U256,
) -> MetaTransaction {
    let call = IProxyFactory::createProxyWithNonceCall {
        _singleton: implementation,
        initializer,
        saltNonce: salt_nonce,
    };
    MetaTransaction::call(factory, U256::ZERO, call.abi_encode())
}
