//! Value type descriptors for column data.

/// The set of value types a column chunk can store.
///
/// Fixed-size types occupy a constant stride in the values buffer.
/// `String` and `Binary` are variable-size and require an offsets buffer
/// alongside the value bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BasicType {
    Int32 = 0,
    Int64 = 1,
    Float32 = 2,
    Float64 = 3,
    String = 4,
    Binary = 5,
}

impl BasicType {
    /// Converts a wire-encoded type tag back into a `BasicType`.
    pub fn from_code(code: u8) -> Option<BasicType> {
        Some(match code {
            0 => BasicType::Int32,
            1 => BasicType::Int64,
            2 => BasicType::Float32,
            3 => BasicType::Float64,
            4 => BasicType::String,
            5 => BasicType::Binary,
            _ => return None,
        })
    }

    /// Returns `true` if values of this type are stored with an offsets
    /// buffer (variable-size representation).
    #[inline]
    pub fn requires_offsets(&self) -> bool {
        matches!(self, BasicType::String | BasicType::Binary)
    }
}

/// Describes the value type of a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicTypeDescriptor {
    pub basic_type: BasicType,
    /// Whether an integer type is signed. Meaningless for non-integer types.
    pub signed: bool,
}

impl BasicTypeDescriptor {
    pub fn new(basic_type: BasicType, signed: bool) -> BasicTypeDescriptor {
        BasicTypeDescriptor { basic_type, signed }
    }

    /// Returns the fixed byte width of a single value, or `None` for
    /// variable-size types.
    #[inline]
    pub fn primitive_size(&self) -> Option<usize> {
        match self.basic_type {
            BasicType::Int32 | BasicType::Float32 => Some(4),
            BasicType::Int64 | BasicType::Float64 => Some(8),
            BasicType::String | BasicType::Binary => None,
        }
    }

    #[inline]
    pub fn requires_offsets(&self) -> bool {
        self.basic_type.requires_offsets()
    }
}

impl Default for BasicTypeDescriptor {
    fn default() -> Self {
        BasicTypeDescriptor {
            basic_type: BasicType::Int64,
            signed: true,
        }
    }
}
