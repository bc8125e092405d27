use crate::codec::{index_to_array, space_size};
use crate::config::Config;
use crate::domain::PermutationRange;
use crate::error::{CoreError, Result};
use num_bigint::BigUint;
use uuid::Uuid;

fn div_ceil(a: &BigUint, b: &BigUint) -> BigUint {
    (a + b - BigUint::from(1u32)) / b
}

/// Number of packages needed to tile the full 256^len keyspace with the
/// configured line/segment/package sizes.
pub fn total_packages(len: usize, cfg: &Config) -> Result<BigUint> {
    if len == 0 {
        return Err(CoreError::Validation(
            "array length must be positive".to_string(),
        ));
    }
    let total = space_size(len);
    let perms_per_file = BigUint::from(cfg.max_permutations_per_line)
        * BigUint::from(cfg.max_ranges_per_segment);
    let total_files = div_ceil(&total, &perms_per_file);
    Ok(div_ceil(
        &total_files,
        &BigUint::from(cfg.max_segments_per_package),
    ))
}

/// Tile package `package` (1-indexed) of the 256^len keyspace into one
/// `PermutationRange` per line.
///
/// Across packages `1..=total_packages` the emitted ranges partition
/// `[0, 256^len)` exactly: no gaps, no overlaps. Re-running the planner
/// for the same (len, package) yields a second, duplicate row set; the
/// planner does not deduplicate.
pub fn plan_package(len: usize, package: u64, cfg: &Config) -> Result<Vec<PermutationRange>> {
    let packages = total_packages(len, cfg)?;
    if package == 0 || BigUint::from(package) > packages {
        return Err(CoreError::Validation(format!(
            "package {package} outside [1, {packages}] for length {len}"
        )));
    }

    let total = space_size(len);
    let perms_per_line = BigUint::from(cfg.max_permutations_per_line);
    let perms_per_file = &perms_per_line * BigUint::from(cfg.max_ranges_per_segment);
    let total_files = div_ceil(&total, &perms_per_file);
    let first_file = BigUint::from(package - 1) * BigUint::from(cfg.max_segments_per_package);

    let mut ranges = Vec::new();
    for file_off in 0..cfg.max_segments_per_package {
        let file_index = &first_file + BigUint::from(file_off);
        if file_index >= total_files {
            break;
        }
        let file_start = &file_index * &perms_per_file;
        for line in 0..cfg.max_ranges_per_segment {
            let line_start = &file_start + BigUint::from(line) * &perms_per_line;
            if line_start >= total {
                break;
            }
            let mut line_end = &line_start + &perms_per_line; // exclusive
            if line_end > total {
                line_end = total.clone();
            }
            let count = &line_end - &line_start;
            let start_array = index_to_array(&line_start, len)?;
            let end_array = index_to_array(&(&line_end - BigUint::from(1u32)), len)?;
            ranges.push(PermutationRange {
                id: Uuid::new_v4().to_string(),
                start_array,
                end_array,
                package_name: format!("PACK_{package}"),
                segment_name: format!("SEG_{file_index}"),
                array_length: len,
                number_of_permutations: count,
                processed: false,
                reported_to_api: false,
            });
        }
    }
    Ok(ranges)
}
