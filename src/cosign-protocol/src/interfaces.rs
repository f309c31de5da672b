//! Solidity ABI surface of the account, its batch entry point and its deployment factory.
//!
//! Only the calls the protocol core encodes or decodes are declared here.

use alloy_sol_types::sol;

sol! {
    interface ISafe {
        function setup(
            address[] calldata _owners,
            uint256 _threshold,
            address to,
            bytes calldata data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        ) external;

        function execTransaction(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes memory signatures
        ) external payable returns (bool success);

        function approveHash(bytes32 hashToApprove) external;

        function nonce() external view returns (uint256);

        function getTransactionHash(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            uint256 _nonce
        ) external view returns (bytes32);
    }

    /// Packed encoding: operation (1) | to (20) | value (32) | data length (32) | data
    interface IMultiSend {
        function multiSend(bytes memory transactions) external payable;
    }

    interface IProxyFactory {
        function createProxyWithNonce(address _singleton, bytes memory initializer, uint256 saltNonce)
            external
            returns (address proxy);
    }

    interface IERC1271 {
        function isValidSignature(bytes32 hash, bytes memory signature) external view returns (bytes4 magicValue);
    }

    /// Pre-final ERC-1271 draft, still answered by v1.3.0 fallback handlers. `data` is the signed
    /// pre-image rather than its hash.
    interface IERC1271Legacy {
        function isValidSignature(bytes memory data, bytes memory signature) external view returns (bytes4 magicValue);
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// `isValidSignature(bytes32,bytes)` success value.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// `isValidSignature(bytes,bytes)` success value.
pub const LEGACY_ERC1271_MAGIC_VALUE: [u8; 4] = [0x20, 0xc1, 0x3b, 0x0b];
