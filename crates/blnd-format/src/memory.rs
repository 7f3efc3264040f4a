//! Relative memory allocator.
//!
//! BLND files are a single block of records that point at each other with
//! relative offsets. Encoding a document graph back into that block takes two
//! runs of the same traversal:
//!
//! 1. **Measure.** Every record writes itself into a counting sink. Each
//!    record reached through an offset field is measured once, in isolation,
//!    and remembered in first-discovery order. Offsets come back as zero.
//! 2. **Place.** Referenced records get consecutive addresses starting at 0
//!    in discovery order. Records written inline inside another record are
//!    addressed relative to their container instead.
//! 3. **Write.** The traversal runs again into the real buffer. The first
//!    time a placed record is referenced it is written at its address (the
//!    writer seeks there and back); every reference emits
//!    `address - base`.
//!
//! Records are identified by [`NodeKey`]: the type and address of the value
//! in the borrowed graph. Shared records live behind an [`Rc`], so every
//! owner of the same `Rc` produces the same key and the record is written
//! once. Strings are keyed by value instead: equal strings share one copy.

use std::any::TypeId;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use blnd_common::{ByteWriter, Immutable, IntoBytes, OffsetBase, TableBase};
use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;

use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Slot used to key an offset table separately from an inline array over
/// the same items.
const TABLE_SLOT: u32 = u32::MAX;

/// A record that can be written by the [`RelativeWriter`].
///
/// `encode` is run once per pass and must emit the same shape both times.
pub trait Encode: 'static {
    /// Write the record's own fields at the writer's current position.
    fn encode(&self, writer: &mut RelativeWriter) -> Result<()>;

    /// Identity of this record within one encode session.
    fn node_key(&self) -> NodeKey {
        NodeKey::of(self)
    }
}

impl<T: Encode> Encode for Rc<T> {
    fn encode(&self, writer: &mut RelativeWriter) -> Result<()> {
        (**self).encode(writer)
    }

    fn node_key(&self) -> NodeKey {
        (**self).node_key()
    }
}

/// Identity of a record in the graph being encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    kind: TypeId,
    address: usize,
    slot: u32,
}

impl NodeKey {
    /// Key a value by its type and address.
    pub fn of<T: ?Sized + 'static>(value: &T) -> Self {
        Self {
            kind: TypeId::of::<T>(),
            address: value as *const T as *const () as usize,
            slot: 0,
        }
    }

    /// Derive a distinct key for a secondary block owned by the same value.
    pub fn with_slot(self, slot: u32) -> Self {
        Self { slot, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Measure,
    Write,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    /// Measured but not yet referenced.
    Unplaced,
    /// Referenced through an offset; gets its own address.
    Placed,
    /// Written inline at `offset` bytes into another record.
    Inline { container: usize, offset: usize },
}

#[derive(Debug)]
struct Slot {
    key: NodeKey,
    size: usize,
    placement: Placement,
    address: Option<usize>,
    written: bool,
}

/// Two-pass writer that lays out a record graph with relative offsets.
#[derive(Debug)]
pub struct RelativeWriter {
    pass: Pass,
    out: ByteWriter,
    slots: Vec<Slot>,
    index: FxHashMap<NodeKey, usize>,
    strings: FxHashMap<String, NodeKey>,
    measuring: Vec<(usize, usize)>,
    total: usize,
}

fn divergence(message: impl Into<String>) -> Error {
    Error::AllocatorConsistency(message.into())
}

fn relative(target: usize, base: usize) -> Result<i32> {
    i32::try_from(target as i64 - base as i64).map_err(|_| Error::OffsetOverflow { target, base })
}

impl RelativeWriter {
    fn new() -> Self {
        Self {
            pass: Pass::Measure,
            out: ByteWriter::counting(),
            slots: Vec::new(),
            index: FxHashMap::default(),
            strings: FxHashMap::default(),
            measuring: Vec::new(),
            total: 0,
        }
    }

    /// Encode a graph whose root record is placed at address 0.
    pub fn encode_root<T: Encode>(root: &T) -> Result<Vec<u8>> {
        let mut writer = Self::new();
        let key = root.node_key();

        writer.reference(0, key, |w| root.encode(w))?;
        writer.place();

        writer.pass = Pass::Write;
        writer.out = ByteWriter::with_len(writer.total);
        writer.reference(0, key, |w| root.encode(w))?;
        writer.finish()
    }

    fn place(&mut self) {
        let mut next = 0;
        for index in 0..self.slots.len() {
            let address = match self.slots[index].placement {
                Placement::Placed => {
                    let address = next;
                    next += self.slots[index].size;
                    Some(address)
                }
                Placement::Inline { container, offset } => {
                    self.slots[container].address.map(|base| base + offset)
                }
                Placement::Unplaced => None,
            };
            self.slots[index].address = address;
            tracing::trace!(index, address, size = self.slots[index].size, "placed record");
        }
        self.total = next;

        tracing::debug!(records = self.slots.len(), total = self.total, "layout complete");
    }

    fn finish(self) -> Result<Vec<u8>> {
        if let Some(slot) = self
            .slots
            .iter()
            .find(|slot| matches!(slot.placement, Placement::Placed) && !slot.written)
        {
            return Err(divergence(format!(
                "record at {:#x} was placed but never written",
                slot.address.unwrap_or_default()
            )));
        }
        if self.out.len() != self.total {
            return Err(divergence(format!(
                "wrote {} bytes but placement reserved {}",
                self.out.len(),
                self.total
            )));
        }
        Ok(self.out.into_bytes())
    }

    fn new_slot(&mut self, key: NodeKey, placement: Placement) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            key,
            size: 0,
            placement,
            address: None,
            written: false,
        });
        self.index.insert(key, index);
        index
    }

    fn lookup(&self, key: NodeKey) -> Result<usize> {
        self.index
            .get(&key)
            .copied()
            .ok_or_else(|| divergence("object must be allocated in a prior pass"))
    }

    fn address_of(&self, index: usize) -> Result<usize> {
        self.slots[index].address.ok_or_else(|| {
            divergence(format!("record {:?} has no assigned address", self.slots[index].key))
        })
    }

    fn measure(
        &mut self,
        index: usize,
        restore: bool,
        write: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let start = self.out.position();
        self.measuring.push((index, start));
        let result = write(self);
        self.measuring.pop();
        result?;

        self.slots[index].size = self.out.position() - start;
        if restore {
            self.out.seek(start);
        }
        Ok(())
    }

    fn check_extent(&self, index: usize, start: usize) -> Result<()> {
        let written = self.out.position() - start;
        let measured = self.slots[index].size;
        if written != measured {
            return Err(divergence(format!(
                "record at {start:#x} wrote {written} bytes but measured {measured}"
            )));
        }
        Ok(())
    }

    /// Resolve a reference to `key`, writing the target on first use in the
    /// write pass. Returns the offset relative to `base`.
    fn reference(
        &mut self,
        base: usize,
        key: NodeKey,
        write: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<i32> {
        match self.pass {
            Pass::Measure => {
                let index = match self.index.get(&key) {
                    Some(&index) => index,
                    None => {
                        let index = self.new_slot(key, Placement::Unplaced);
                        self.measure(index, true, write)?;
                        index
                    }
                };
                let slot = &mut self.slots[index];
                if matches!(slot.placement, Placement::Unplaced) {
                    slot.placement = Placement::Placed;
                }
                Ok(0)
            }
            Pass::Write => {
                let index = self.lookup(key)?;
                let address = self.address_of(index)?;

                let slot = &mut self.slots[index];
                if matches!(slot.placement, Placement::Placed) && !slot.written {
                    slot.written = true;
                    let resume = self.out.position();
                    self.out.seek(address);
                    write(self)?;
                    self.check_extent(index, address)?;
                    self.out.seek(resume);
                }
                relative(address, base)
            }
        }
    }

    /// Size of a record as measured in the first pass.
    ///
    /// Returns 0 while measuring; the field has the same width either way.
    pub fn size_of<T: Encode + ?Sized>(&self, node: &T) -> Result<u32> {
        match self.pass {
            Pass::Measure => Ok(0),
            Pass::Write => {
                let index = self.lookup(node.node_key())?;
                u32::try_from(self.slots[index].size)
                    .map_err(|_| divergence("record size does not fit in 32 bits"))
            }
        }
    }

    /// Write a record inline at the current position.
    ///
    /// The record is measured like any other, so it can carry a size field
    /// and can be the target of offsets from elsewhere; those offsets resolve
    /// to this inline copy.
    pub fn write_inline<T: Encode + ?Sized>(&mut self, node: &T) -> Result<()> {
        let key = node.node_key();
        match self.pass {
            Pass::Measure => {
                if self.index.contains_key(&key) {
                    return node.encode(self);
                }
                let &(container, container_start) = self
                    .measuring
                    .last()
                    .ok_or_else(|| divergence("inline record written outside of any placed record"))?;
                let offset = self.out.position() - container_start;
                let index = self.new_slot(key, Placement::Inline { container, offset });
                self.measure(index, false, |w| node.encode(w))
            }
            Pass::Write => {
                let index = self.lookup(key)?;
                let start = self.out.position();
                let first = matches!(self.slots[index].placement, Placement::Inline { .. })
                    && !self.slots[index].written;

                if first {
                    let address = self.address_of(index)?;
                    if address != start {
                        return Err(divergence(format!(
                            "inline record expected at {address:#x} but written at {start:#x}"
                        )));
                    }
                    self.slots[index].written = true;
                }
                node.encode(self)?;
                if first {
                    self.check_extent(index, start)?;
                }
                Ok(())
            }
        }
    }

    /// Write an offset field pointing at `node`, or zero if it is absent.
    pub fn write_ref<T: Encode + ?Sized>(&mut self, base: OffsetBase, node: Option<&T>) -> Result<()> {
        let base = base.resolve(self.out.position());
        let offset = match node {
            Some(node) => self.reference(base, node.node_key(), |w| node.encode(w))?,
            None => 0,
        };
        self.out.write_i32(offset);
        Ok(())
    }

    /// Write an offset field pointing at a null-terminated string, or zero if
    /// it is absent.
    ///
    /// The first occurrence of a value is the one that gets placed; every
    /// later equal string points at it.
    pub fn write_str_ref(&mut self, base: OffsetBase, value: Option<&str>) -> Result<()> {
        let Some(value) = value else {
            self.out.write_i32(0);
            return Ok(());
        };
        let key = match self.strings.get(value) {
            Some(&key) => key,
            None => {
                let key = NodeKey::of(value);
                self.strings.insert(value.to_owned(), key);
                key
            }
        };
        self.write_ref_with(base, key, |w| {
            w.write_cstring(value);
            Ok(())
        })
    }

    /// Write an offset field pointing at a block produced by `write`.
    ///
    /// `key` identifies the block; a second reference with the same key
    /// points at the same bytes.
    pub fn write_ref_with(
        &mut self,
        base: OffsetBase,
        key: NodeKey,
        write: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let base = base.resolve(self.out.position());
        let offset = self.reference(base, key, write)?;
        self.out.write_i32(offset);
        Ok(())
    }

    /// Write an offset field pointing at an inline array of records.
    ///
    /// An empty array is encoded as a zero offset.
    pub fn write_array_ref<T: Encode>(&mut self, base: OffsetBase, items: &[T]) -> Result<()> {
        if items.is_empty() {
            self.out.write_i32(0);
            return Ok(());
        }
        self.write_ref_with(base, NodeKey::of(items), |w| {
            items.iter().try_for_each(|item| w.write_inline(item))
        })
    }

    /// Write an offset field pointing at an inline array of plain-old-data
    /// values.
    pub fn write_pod_array_ref<T>(&mut self, base: OffsetBase, items: &[T]) -> Result<()>
    where
        T: IntoBytes + Immutable + 'static,
    {
        if items.is_empty() {
            self.out.write_i32(0);
            return Ok(());
        }
        self.write_ref_with(base, NodeKey::of(items), |w| {
            w.out.write_struct(items);
            Ok(())
        })
    }

    /// Write an offset field pointing at a table of offsets, one per item.
    ///
    /// Each item is placed independently; table entries are resolved against
    /// `entry_base`. An empty table is encoded as a zero offset.
    pub fn write_table_ref<T: Encode>(
        &mut self,
        base: OffsetBase,
        entry_base: TableBase,
        items: &[T],
    ) -> Result<()> {
        if items.is_empty() {
            self.out.write_i32(0);
            return Ok(());
        }
        let key = NodeKey::of(items).with_slot(TABLE_SLOT);
        self.write_ref_with(base, key, |w| {
            let entry_base = OffsetBase::Record(entry_base.resolve(w.position()));
            items
                .iter()
                .try_for_each(|item| w.write_ref(entry_base, Some(item)))
        })
    }

    /// Get the current position.
    #[inline]
    pub fn position(&self) -> usize {
        self.out.position()
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.write_bytes(bytes);
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.out.write_u8(value);
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.out.write_u16(value);
    }

    /// Write a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.out.write_u32(value);
    }

    /// Write a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.out.write_i32(value);
    }

    /// Write a little-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.out.write_f32(value);
    }

    /// Write a null-terminated string.
    #[inline]
    pub fn write_cstring(&mut self, value: &str) {
        self.out.write_cstring(value);
    }

    /// Write a string into a fixed-size, null-padded field.
    #[inline]
    pub fn write_fixed_string(&mut self, value: &str, field_size: usize) {
        self.out.write_fixed_string(value, field_size);
    }

    /// Write a struct using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable + ?Sized>(&mut self, value: &T) {
        self.out.write_struct(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sized record with an optional name and an optional child.
    struct Node {
        value: u32,
        name: Option<String>,
        child: Option<Rc<Node>>,
    }

    impl Encode for Node {
        fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
            let base = w.position();
            w.write_u32(w.size_of(self)?);
            w.write_u32(self.value);
            w.write_str_ref(OffsetBase::Record(base), self.name.as_deref())?;
            w.write_ref(OffsetBase::Record(base), self.child.as_ref())?;
            Ok(())
        }
    }

    fn leaf(value: u32) -> Rc<Node> {
        Rc::new(Node {
            value,
            name: None,
            child: None,
        })
    }

    /// Root holding an inline array and an offset table.
    struct Root {
        inline: Vec<Rc<Node>>,
        table: Vec<Rc<Node>>,
    }

    impl Encode for Root {
        fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
            w.write_u32(self.inline.len() as u32);
            w.write_array_ref(OffsetBase::Field, &self.inline)?;
            w.write_u32(self.table.len() as u32);
            w.write_table_ref(OffsetBase::Field, TableBase::TableStart, &self.table)?;
            Ok(())
        }
    }

    fn word(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn offset(bytes: &[u8], at: usize) -> i32 {
        i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    /// Follow the offset stored at `at`, relative to `base`.
    fn resolve(bytes: &[u8], base: usize, at: usize) -> usize {
        (base as i64 + i64::from(offset(bytes, at))) as usize
    }

    #[test]
    fn test_single_record_layout() {
        let node = Node {
            value: 7,
            name: Some("ab".to_string()),
            child: None,
        };
        let bytes = RelativeWriter::encode_root(&node).unwrap();

        // 16-byte record then "ab\0"
        assert_eq!(bytes.len(), 19);
        assert_eq!(word(&bytes, 0), 16);
        assert_eq!(word(&bytes, 4), 7);
        assert_eq!(offset(&bytes, 8), 16);
        assert_eq!(offset(&bytes, 12), 0);
        assert_eq!(&bytes[16..], b"ab\0");
    }

    #[test]
    fn test_shared_child_written_once() {
        let shared = leaf(9);
        let root = Root {
            inline: Vec::new(),
            table: vec![
                Rc::new(Node {
                    value: 1,
                    name: None,
                    child: Some(shared.clone()),
                }),
                Rc::new(Node {
                    value: 2,
                    name: None,
                    child: Some(shared.clone()),
                }),
            ],
        };
        let bytes = RelativeWriter::encode_root(&root).unwrap();

        // root 16 | table 8 | node1 16 | shared 16 | node2 16
        assert_eq!(bytes.len(), 16 + 8 + 16 * 3);
        assert_eq!(word(&bytes, 0), 0);
        assert_eq!(offset(&bytes, 4), 0);
        assert_eq!(word(&bytes, 8), 2);
        assert_eq!(offset(&bytes, 12), 16 - 12);

        let table = 16;
        let first = resolve(&bytes, table, table);
        let second = resolve(&bytes, table, table + 4);
        assert_eq!(first, 24);
        assert_eq!(second, 56);

        let first_child = resolve(&bytes, first, first + 12);
        let second_child = resolve(&bytes, second, second + 12);
        assert_eq!(first_child, 40);
        assert_eq!(first_child, second_child);
        assert_eq!(word(&bytes, first_child + 4), 9);
    }

    #[test]
    fn test_reference_into_inline_array() {
        let track = leaf(3);
        let root = Root {
            inline: vec![leaf(1), track.clone()],
            table: vec![Rc::new(Node {
                value: 5,
                name: None,
                child: Some(track.clone()),
            })],
        };
        let bytes = RelativeWriter::encode_root(&root).unwrap();

        // root 16 | inline array 32 | table 4 | node 16
        assert_eq!(bytes.len(), 16 + 32 + 4 + 16);
        let array = resolve(&bytes, 4, 4);
        assert_eq!(array, 16);
        assert_eq!(word(&bytes, array), 16);
        assert_eq!(word(&bytes, array + 20), 3);

        let table = resolve(&bytes, 12, 12);
        let node = resolve(&bytes, table, table);
        let child = resolve(&bytes, node, node + 12);
        assert_eq!(child, array + 16);
    }

    #[test]
    fn test_empty_collections_encode_zero_offsets() {
        let root = Root {
            inline: Vec::new(),
            table: Vec::new(),
        };
        let bytes = RelativeWriter::encode_root(&root).unwrap();
        assert_eq!(bytes, vec![0u8; 16]);
    }

    #[test]
    fn test_equal_strings_written_once() {
        let root = Root {
            inline: Vec::new(),
            table: vec![
                Rc::new(Node {
                    value: 1,
                    name: Some("idle".to_string()),
                    child: None,
                }),
                Rc::new(Node {
                    value: 2,
                    name: Some("idle".to_string()),
                    child: None,
                }),
            ],
        };
        let bytes = RelativeWriter::encode_root(&root).unwrap();

        // root 16 | table 8 | node1 16 | "idle\0" 5 | node2 16
        assert_eq!(bytes.len(), 16 + 8 + 16 + 5 + 16);
        let first = resolve(&bytes, 16, 16);
        let second = resolve(&bytes, 16, 20);
        let first_name = resolve(&bytes, first, first + 8);
        let second_name = resolve(&bytes, second, second + 8);
        assert_eq!(first_name, 40);
        assert_eq!(first_name, second_name);
        assert_eq!(&bytes[40..45], b"idle\0");
    }

    #[test]
    fn test_pod_array() {
        struct Values(Vec<u32>);
        impl Encode for Values {
            fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
                w.write_pod_array_ref(OffsetBase::Field, &self.0)
            }
        }

        let bytes = RelativeWriter::encode_root(&Values(vec![10, 20])).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(offset(&bytes, 0), 4);
        assert_eq!(word(&bytes, 4), 10);
        assert_eq!(word(&bytes, 8), 20);
    }

    #[test]
    fn test_divergent_traversal_detected() {
        use std::cell::Cell;

        struct Flaky {
            calls: Cell<u32>,
            name: String,
        }
        impl Encode for Flaky {
            fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
                let call = self.calls.get();
                self.calls.set(call + 1);
                // Only references the name on the second run
                let name = (call > 0).then_some(self.name.as_str());
                w.write_str_ref(OffsetBase::Field, name)
            }
        }

        let flaky = Flaky {
            calls: Cell::new(0),
            name: "x".to_string(),
        };
        let result = RelativeWriter::encode_root(&flaky);
        assert!(matches!(result, Err(Error::AllocatorConsistency(_))));
    }

    #[test]
    fn test_inline_outside_placed_record() {
        let mut writer = RelativeWriter::new();
        let result = writer.write_inline(&*leaf(1));
        assert!(matches!(result, Err(Error::AllocatorConsistency(_))));
    }
}
