//! A fixed-capacity batch of decoded column values.

use stratum_format::schema::{BasicType, BasicTypeDescriptor};

use crate::{offsets::Offsets, presence::Presence, values::Values};

/// One decoded batch of rows for a single column.
///
/// Fixed-size types store one slot per row in `values` (null rows are
/// zero-filled), so the value at row `i` sits at index `i` of the typed
/// view. Variable-size types (`String`, `Binary`) store concatenated bytes
/// in `values` with per-row byte ranges in `offsets`; null rows occupy an
/// empty range. `presence` tracks which rows actually hold a value; the
/// value accessors are only meaningful for rows where `is_valid` returns
/// `true`.
#[derive(Debug, Clone)]
pub struct ValueBatch {
    pub values: Values,
    pub offsets: Option<Offsets>,
    pub presence: Presence,
    pub type_desc: BasicTypeDescriptor,
}

impl ValueBatch {
    /// Creates an empty batch for the given type.
    pub fn empty(type_desc: BasicTypeDescriptor) -> ValueBatch {
        ValueBatch {
            values: Values::new(),
            offsets: type_desc.requires_offsets().then(Offsets::new),
            presence: Presence::Trivial(0),
            type_desc,
        }
    }

    /// Creates an empty batch with storage pre-allocated for `capacity` rows.
    pub fn with_capacity(type_desc: BasicTypeDescriptor, capacity: usize) -> ValueBatch {
        let elem_size = type_desc.primitive_size().unwrap_or(16);
        ValueBatch {
            values: Values::with_byte_capacity(capacity * elem_size),
            offsets: type_desc
                .requires_offsets()
                .then(|| Offsets::with_capacity(capacity)),
            presence: Presence::Trivial(0),
            type_desc,
        }
    }

    /// Number of rows in the batch, null rows included.
    #[inline]
    pub fn len(&self) -> usize {
        self.presence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the row at `index` holds a value.
    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.presence.is_valid(index)
    }

    /// Appends a primitive value.
    ///
    /// # Panics
    ///
    /// Panics if `size_of::<T>()` does not match the column's primitive
    /// size, or if the column is variable-size.
    pub fn push_value<T>(&mut self, value: T)
    where
        T: bytemuck::NoUninit,
    {
        assert_eq!(
            self.type_desc.primitive_size(),
            Some(std::mem::size_of::<T>())
        );
        assert!(self.offsets.is_none());
        self.values.push(value);
        self.presence.push_non_null();
    }

    /// Appends a run of primitive values.
    pub fn extend_from_slice<T>(&mut self, values: &[T])
    where
        T: bytemuck::NoUninit,
    {
        assert_eq!(
            self.type_desc.primitive_size(),
            Some(std::mem::size_of::<T>())
        );
        assert!(self.offsets.is_none());
        self.values.extend_from_slice(values);
        self.presence.extend_with_non_nulls(values.len());
    }

    /// Appends one fixed-size value given as raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if the byte length does not match the column's primitive size.
    pub fn push_fixed(&mut self, value: &[u8]) {
        assert_eq!(self.type_desc.primitive_size(), Some(value.len()));
        assert!(self.offsets.is_none());
        self.values.extend_from_byte_slice(value);
        self.presence.push_non_null();
    }

    /// Appends a run of fixed-size values given as raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if the byte length is not a multiple of the column's
    /// primitive size.
    pub fn extend_fixed(&mut self, values: &[u8]) {
        let size = self
            .type_desc
            .primitive_size()
            .expect("fixed-size column type");
        assert!(self.offsets.is_none());
        assert_eq!(values.len() % size, 0);
        self.values.extend_from_byte_slice(values);
        self.presence.extend_with_non_nulls(values.len() / size);
    }

    /// Appends a variable-size value.
    ///
    /// # Panics
    ///
    /// Panics if the column is not `String` or `Binary`.
    pub fn push_binary(&mut self, value: &[u8]) {
        assert!(matches!(
            self.type_desc.basic_type,
            BasicType::String | BasicType::Binary
        ));
        self.offsets
            .as_mut()
            .expect("offsets for variable-size type")
            .push_length(value.len());
        self.values.extend_from_byte_slice(value);
        self.presence.push_non_null();
    }

    pub fn push_str(&mut self, value: &str) {
        assert_eq!(self.type_desc.basic_type, BasicType::String);
        self.push_binary(value.as_bytes());
    }

    /// Appends a null row.
    pub fn push_null(&mut self) {
        self.push_nulls(1);
    }

    /// Appends `count` null rows.
    pub fn push_nulls(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(offsets) = self.offsets.as_mut() {
            offsets.push_empty(count);
        } else {
            let size = self.type_desc.primitive_size().unwrap_or(0);
            self.values
                .resize_zeroed_bytes(self.values.bytes_len() + size * count);
        }
        self.presence.extend_with_nulls(count);
    }

    /// The value at `index` for a fixed-size column. Zero for null rows.
    #[inline]
    pub fn value_at<T>(&self, index: usize) -> T
    where
        T: bytemuck::AnyBitPattern,
    {
        self.values.as_slice::<T>()[index]
    }

    /// The value bytes at `index` for a variable-size column. Empty for
    /// null rows.
    #[inline]
    pub fn binary_at(&self, index: usize) -> &[u8] {
        let range = self
            .offsets
            .as_ref()
            .expect("offsets for variable-size type")
            .range(index);
        &self.values.as_bytes()[range]
    }

    /// Fully invalidates the batch contents for refilling: length back to
    /// zero, every validity marker dropped, offsets reset. Storage is kept
    /// for reuse.
    pub fn clear(&mut self) {
        self.values.clear();
        if let Some(offsets) = self.offsets.as_mut() {
            offsets.clear();
        }
        self.presence.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_format::schema::{BasicType, BasicTypeDescriptor};

    fn int64_desc() -> BasicTypeDescriptor {
        BasicTypeDescriptor::new(BasicType::Int64, true)
    }

    fn string_desc() -> BasicTypeDescriptor {
        BasicTypeDescriptor::new(BasicType::String, false)
    }

    #[test]
    fn test_primitive_batch_positional_slots() {
        let mut batch = ValueBatch::with_capacity(int64_desc(), 4);
        batch.push_value(7i64);
        batch.push_null();
        batch.push_value(-3i64);
        assert_eq!(batch.len(), 3);
        assert!(batch.is_valid(0));
        assert!(!batch.is_valid(1));
        assert_eq!(batch.value_at::<i64>(0), 7);
        assert_eq!(batch.value_at::<i64>(1), 0);
        assert_eq!(batch.value_at::<i64>(2), -3);
    }

    #[test]
    fn test_string_batch() {
        let mut batch = ValueBatch::empty(string_desc());
        batch.push_str("alpha");
        batch.push_null();
        batch.push_str("b");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.binary_at(0), b"alpha");
        assert_eq!(batch.binary_at(1), b"");
        assert_eq!(batch.binary_at(2), b"b");
        assert_eq!(batch.presence.count_nulls(), 1);
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut batch = ValueBatch::empty(string_desc());
        batch.push_str("stale");
        batch.push_null();
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.presence.count_nulls(), 0);

        batch.push_str("fresh");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.binary_at(0), b"fresh");
    }

    #[test]
    fn test_extend_from_slice() {
        let mut batch = ValueBatch::empty(int64_desc());
        batch.extend_from_slice(&[1i64, 2, 3]);
        batch.push_nulls(2);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.values.len::<i64>(), 5);
        assert_eq!(batch.value_at::<i64>(4), 0);
    }

    #[test]
    #[should_panic]
    fn test_push_value_type_mismatch() {
        let mut batch = ValueBatch::empty(int64_desc());
        batch.push_value(1i32);
    }
}
