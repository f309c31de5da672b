//! Big-endian parsing and fixed-width packing helpers.

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::errors::EncodingError;

fn ensure(bytes: &[u8], i: usize, needed: usize) -> Result<(), EncodingError> {
    let available = bytes.len().saturating_sub(i);
    if available < needed {
        return Err(EncodingError::Truncated {
            offset: i,
            needed,
            available,
        });
    }
    Ok(())
}

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Vec<u8>, EncodingError> {
    ensure(bytes, *i, len)?;
    let out = bytes[*i..*i + len].to_vec();
    *i += len;
    Ok(out)
}

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, EncodingError> {
    ensure(bytes, *i, 1)?;
    let b = bytes[*i];
    *i += 1;
    Ok(b)
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, EncodingError> {
    ensure(bytes, *i, 32)?;
    let out = U256::from_be_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(out)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Result<B256, EncodingError> {
    ensure(bytes, *i, 32)?;
    let out = B256::from_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(out)
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, EncodingError> {
    ensure(bytes, *i, 20)?;
    let addr = Address::from_slice(&bytes[*i..*i + 20]);
    *i += 20;
    Ok(addr)
}

/// Read a 32-byte length word and narrow it to `usize`.
pub fn read_len(bytes: &[u8], i: &mut usize) -> Result<usize, EncodingError> {
    let word = read_u256_be(bytes, i)?;
    usize::try_from(word).map_err(|_| EncodingError::LengthOverflow(word))
}

/// Left-pad an address to one ABI word.
pub fn pad_address(address: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..32].copy_from_slice(address.as_slice());
    out
}

pub fn word_u64(value: u64) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

pub fn word_usize(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

pub fn b256_from_slice(bytes: &[u8]) -> Result<B256, EncodingError> {
    if bytes.len() != 32 {
        return Err(EncodingError::WrongWidth {
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(B256::from_slice(bytes))
}

pub fn address_from_slice(bytes: &[u8]) -> Result<Address, EncodingError> {
    if bytes.len() != 20 {
        return Err(EncodingError::WrongWidth {
            expected: 20,
            actual: bytes.len(),
        });
    }
    Ok(Address::from_slice(bytes))
}

/// Parse `0x`-prefixed hex into bytes. The prefix is mandatory.
pub fn parse_hex_bytes(raw: &str) -> Result<Bytes, EncodingError> {
    let body = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or(EncodingError::MissingHexPrefix)?;
    hex::decode(body)
        .map(Bytes::from)
        .map_err(|e| EncodingError::InvalidHex(e.to_string()))
}
