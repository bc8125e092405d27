use crate::error::{CoreError, Result};
use num_bigint::BigUint;
use std::cmp::Ordering;

/// Size of the keyspace for arrays of `len` bytes: 256^len.
pub fn space_size(len: usize) -> BigUint {
    num_traits::pow(BigUint::from(256u32), len)
}

/// Big-endian base-256 representation of `index`, left-padded with zero
/// bytes to exactly `len` bytes. Byte position 0 is most significant.
pub fn index_to_array(index: &BigUint, len: usize) -> Result<Vec<u8>> {
    if len == 0 {
        return Err(CoreError::Validation(
            "array length must be positive".to_string(),
        ));
    }
    let digits = index.to_bytes_be();
    if digits.len() > len {
        return Err(CoreError::Validation(format!(
            "index {index} does not fit in {len} bytes"
        )));
    }
    let mut out = vec![0u8; len - digits.len()];
    out.extend_from_slice(&digits);
    Ok(out)
}

/// Inverse of `index_to_array`: interpret bytes as a big-endian integer.
pub fn array_to_index(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Lexicographic byte-by-byte comparison, big-endian. Unequal lengths
/// compare by common prefix, then by length.
pub fn compare_arrays(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Inclusive count of arrays between `start` and `stop`.
pub fn count_inclusive(start: &[u8], stop: &[u8]) -> BigUint {
    &array_to_index(stop) - &array_to_index(start) + BigUint::from(1u32)
}
