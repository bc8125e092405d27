use crate::cancel::CancelToken;
use crate::codec::compare_arrays;
use crate::error::{CoreError, Result};
use crossbeam_channel::Sender;
use std::cmp::Ordering;

/// Validate a (start, stop) bound pair before enumeration.
///
/// `stop < start` was undefined behaviour in earlier incarnations of this
/// engine; here it is an explicit validation error, reported before any
/// array is emitted.
pub fn validate_bounds(start: &[u8], stop: &[u8]) -> Result<()> {
    if start.is_empty() {
        return Err(CoreError::Validation(
            "array length must be positive".to_string(),
        ));
    }
    if start.len() != stop.len() {
        return Err(CoreError::Validation(format!(
            "bound lengths differ: {} vs {}",
            start.len(),
            stop.len()
        )));
    }
    if compare_arrays(start, stop) == Ordering::Greater {
        return Err(CoreError::Validation(
            "stop bound precedes start bound".to_string(),
        ));
    }
    Ok(())
}

// Mixed-radix odometer step: increment the rightmost byte with carry.
// Callers guarantee the current value is below the stop bound, so the
// carry can never run off the most significant byte.
fn increment(bytes: &mut [u8]) {
    for b in bytes.iter_mut().rev() {
        if *b == 255 {
            *b = 0;
        } else {
            *b += 1;
            return;
        }
    }
}

/// Emit every array `A` with `start <= A <= stop` on `tx`, in strictly
/// ascending lexicographic order, terminating the moment `stop` is sent.
///
/// Generation resumes exactly from `start` (not from zero). Returns early
/// without error when the token is cancelled or every receiver is gone;
/// both are normal shutdown paths for the worker pool.
pub fn generate(
    start: &[u8],
    stop: &[u8],
    tx: &Sender<Vec<u8>>,
    cancel: &CancelToken,
) -> Result<()> {
    validate_bounds(start, stop)?;
    let mut current = start.to_vec();
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let at_stop = current.as_slice() == stop;
        if tx.send(current.clone()).is_err() {
            return Ok(());
        }
        if at_stop {
            return Ok(());
        }
        increment(&mut current);
    }
}
