//! Seeded generators for columns of synthetic records.
//!
//! The string generators draw from a bounded pool of distinct values, so a
//! writer's dictionary grows only while unseen pool entries keep arriving.
//! Sizing the pool relative to the dictionary limit controls whether and
//! roughly when the dictionary-to-plain fallback triggers. Null injection
//! is independent of value selection.

/// Parameters for a generated string column.
#[derive(Debug, Clone)]
pub struct StringColumnParams {
    pub record_count: usize,
    /// Number of distinct values the records draw from.
    pub pool_size: usize,
    /// Length of the random prefix of each pool entry; a distinct suffix
    /// of 7 bytes is appended.
    pub value_len: usize,
    /// Fraction of rows generated as null, in `0.0..=1.0`.
    pub null_fraction: f64,
    pub seed: u64,
}

impl StringColumnParams {
    /// The shape used by the fallback scenarios: a pool of one distinct
    /// value per twenty records.
    pub fn fallback(record_count: usize, seed: u64) -> StringColumnParams {
        StringColumnParams {
            record_count,
            pool_size: (record_count / 20).max(1),
            value_len: 10,
            null_fraction: 0.0,
            seed,
        }
    }
}

/// A generated column along with the tallies tests assert against.
#[derive(Debug, Clone)]
pub struct GeneratedColumn<T> {
    pub values: Vec<Option<T>>,
    pub null_count: usize,
}

impl<T> GeneratedColumn<T> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.values.len() - self.null_count
    }
}

/// Generates `pool_size` distinct strings: a seeded random prefix of
/// `value_len` alphanumeric characters plus a unique suffix.
pub fn generate_string_pool(pool_size: usize, value_len: usize, seed: u64) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..pool_size)
        .map(|i| {
            let mut value = String::with_capacity(value_len + 7);
            for _ in 0..value_len {
                value.push(rng.alphanumeric());
            }
            value.push_str(&format!("-{i:06}"));
            value
        })
        .collect()
}

/// Generates a string column per `params`, drawing values uniformly from the
/// pool and injecting nulls independently.
pub fn generate_string_column(params: &StringColumnParams) -> GeneratedColumn<String> {
    let pool = generate_string_pool(params.pool_size, params.value_len, params.seed);
    let mut rng = fastrand::Rng::with_seed(params.seed.wrapping_add(1));
    let mut values = Vec::with_capacity(params.record_count);
    let mut null_count = 0;
    for _ in 0..params.record_count {
        if rng.f64() < params.null_fraction {
            values.push(None);
            null_count += 1;
        } else {
            values.push(Some(pool[rng.usize(0..pool.len())].clone()));
        }
    }
    GeneratedColumn { values, null_count }
}

/// Generates an `i64` column drawing from `0..distinct_values`, with
/// independent null injection.
pub fn generate_int_column(
    record_count: usize,
    distinct_values: u64,
    null_fraction: f64,
    seed: u64,
) -> GeneratedColumn<i64> {
    assert!(distinct_values > 0);
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut values = Vec::with_capacity(record_count);
    let mut null_count = 0;
    for _ in 0..record_count {
        if rng.f64() < null_fraction {
            values.push(None);
            null_count += 1;
        } else {
            values.push(Some(rng.u64(0..distinct_values) as i64));
        }
    }
    GeneratedColumn { values, null_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_entries_are_distinct() {
        let pool = generate_string_pool(1000, 10, 17);
        let unique: std::collections::HashSet<&String> = pool.iter().collect();
        assert_eq!(unique.len(), pool.len());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let params = StringColumnParams {
            record_count: 500,
            pool_size: 40,
            value_len: 8,
            null_fraction: 0.3,
            seed: 42,
        };
        let a = generate_string_column(&params);
        let b = generate_string_column(&params);
        assert_eq!(a.values, b.values);
        assert_eq!(a.null_count, b.null_count);
    }

    #[test]
    fn test_null_fraction_respected() {
        let params = StringColumnParams {
            record_count: 10_000,
            pool_size: 10,
            value_len: 4,
            null_fraction: 0.5,
            seed: 7,
        };
        let column = generate_string_column(&params);
        let fraction = column.null_count as f64 / column.len() as f64;
        assert!((fraction - 0.5).abs() < 0.05);

        let params = StringColumnParams {
            null_fraction: 0.0,
            ..params
        };
        assert_eq!(generate_string_column(&params).null_count, 0);
    }

    #[test]
    fn test_values_come_from_pool() {
        let params = StringColumnParams::fallback(200, 3);
        let pool: std::collections::HashSet<String> =
            generate_string_pool(params.pool_size, params.value_len, params.seed)
                .into_iter()
                .collect();
        let column = generate_string_column(&params);
        for value in column.values.iter().flatten() {
            assert!(pool.contains(value));
        }
    }

    #[test]
    fn test_int_column_bounded() {
        let column = generate_int_column(1000, 16, 0.25, 11);
        assert!(column.values.iter().flatten().all(|&v| (0..16).contains(&v)));
        assert!(column.null_count > 100);
        assert_eq!(column.present_count() + column.null_count, 1000);
    }
}
