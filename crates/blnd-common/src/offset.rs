//! Relative offset addressing conventions.
//!
//! Every offset field in a BLND file is a signed 32-bit delta. What the delta
//! is added to depends on where the field sits in the format, so every call
//! site names its convention explicitly instead of inferring it.

/// Base position an offset field is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBase {
    /// Relative to the position of the offset field itself.
    Field,
    /// Relative to the start of the enclosing record.
    Record(usize),
}

impl OffsetBase {
    /// Resolve the base against the position of the field being read or written.
    #[inline]
    pub fn resolve(self, field_position: usize) -> usize {
        match self {
            Self::Field => field_position,
            Self::Record(base) => base,
        }
    }
}

/// Base position for the entries of an offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableBase {
    /// Entries are relative to the first byte of the table.
    TableStart,
    /// Entries are relative to the start of the record that owns the table.
    Record(usize),
}

impl TableBase {
    /// Resolve the base given where the table begins.
    #[inline]
    pub fn resolve(self, table_start: usize) -> usize {
        match self {
            Self::TableStart => table_start,
            Self::Record(base) => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_base_resolve() {
        assert_eq!(OffsetBase::Field.resolve(0x40), 0x40);
        assert_eq!(OffsetBase::Record(0x10).resolve(0x40), 0x10);
    }

    #[test]
    fn test_table_base_resolve() {
        assert_eq!(TableBase::TableStart.resolve(0x80), 0x80);
        assert_eq!(TableBase::Record(0x20).resolve(0x80), 0x20);
    }
}
