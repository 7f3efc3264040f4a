//! Decode session with an identity cache keyed by stream position.
//!
//! Several parents may point at the same record. The session decodes a shared
//! record once and hands every later referent the same [`Rc`], so the graph
//! keeps the sharing the file had and the encoder can write it back once.

use std::any::{type_name, Any};
use std::collections::BTreeSet;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use blnd_common::{ByteCursor, FromBytes, OffsetBase, TableBase};
use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;

use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A record that can be decoded from the current cursor position.
pub trait Decode: Sized + 'static {
    /// Decode the record starting at the session's current position.
    ///
    /// On return the cursor must sit just past the record's fixed fields.
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self>;
}

/// Decoder for one variant of a tagged union.
///
/// Called with the cursor just past the type tag and the position of the
/// record start.
pub type VariantDecoder<T> = fn(&mut DecodeSession<'_>, usize) -> Result<T>;

#[derive(Debug)]
struct CachedRecord {
    value: Rc<dyn Any>,
    end: usize,
}

/// State for decoding one file.
///
/// The cache lives exactly as long as the session, so independent decodes
/// never observe each other's records.
#[derive(Debug)]
pub struct DecodeSession<'a> {
    /// Cursor over the whole file.
    pub cursor: ByteCursor<'a>,
    cache: FxHashMap<usize, CachedRecord>,
    /// Every position an offset has been followed to.
    landmarks: BTreeSet<usize>,
}

impl<'a> DecodeSession<'a> {
    /// Create a session over a whole file buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            cache: FxHashMap::default(),
            landmarks: BTreeSet::new(),
        }
    }

    /// Number of distinct shared records decoded so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached record and known reference target.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.landmarks.clear();
    }

    /// Remember that something in the file points at `position`.
    pub fn mark(&mut self, position: usize) {
        self.landmarks.insert(position);
    }

    /// The first referenced position after `position`, or the end of the
    /// file.
    ///
    /// Records whose length the format does not state end here.
    pub fn next_landmark(&self, position: usize) -> usize {
        self.landmarks
            .range(position + 1..)
            .next()
            .copied()
            .unwrap_or(self.cursor.len())
            .min(self.cursor.len())
    }

    /// Run `f` with the cursor at `position`, then restore the cursor.
    pub fn at<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.mark(position);
        let resume = self.cursor.position();
        self.cursor.seek(position)?;
        let value = f(self)?;
        self.cursor.seek(resume)?;
        Ok(value)
    }

    /// Decode a shared record at the current position, or return the
    /// instance already decoded there.
    ///
    /// A cache hit moves the cursor to where the cached record ended, so
    /// sequential reads stay aligned either way.
    pub fn decode_shared<T: Decode>(&mut self) -> Result<Rc<T>> {
        let start = self.cursor.position();

        let cached = self
            .cache
            .get(&start)
            .map(|record| (Rc::clone(&record.value), record.end));
        if let Some((value, end)) = cached {
            let value = value.downcast::<T>().map_err(|_| Error::CacheTypeMismatch {
                offset: start,
                expected: type_name::<T>(),
            })?;
            self.cursor.seek(end)?;
            return Ok(value);
        }

        let value = Rc::new(T::decode(self)?);
        let end = self.cursor.position();
        let erased: Rc<dyn Any> = value.clone();
        self.cache.insert(start, CachedRecord { value: erased, end });
        Ok(value)
    }

    /// Follow an optional reference to a shared record.
    pub fn decode_ref<T: Decode>(&mut self, target: Option<usize>) -> Result<Option<Rc<T>>> {
        match target {
            Some(position) => self.at(position, Self::decode_shared::<T>).map(Some),
            None => Ok(None),
        }
    }

    /// Follow an optional reference to a record owned by exactly one parent.
    pub fn decode_optional<T: Decode>(&mut self, target: Option<usize>) -> Result<Option<T>> {
        target.map(|position| self.at(position, T::decode)).transpose()
    }

    /// Follow a required reference to a record owned by exactly one parent.
    pub fn decode_owned<T: Decode>(
        &mut self,
        target: Option<usize>,
        field: &'static str,
        record: usize,
    ) -> Result<T> {
        let position = target.ok_or(Error::NullReference {
            field,
            offset: record,
        })?;
        self.at(position, T::decode)
    }

    /// Follow an optional reference to a null-terminated string.
    pub fn read_string(&mut self, target: Option<usize>) -> Result<Option<String>> {
        match target {
            Some(position) => self.at(position, |s| Ok(s.cursor.read_cstring()?)).map(Some),
            None => Ok(None),
        }
    }

    /// Follow a required reference to a null-terminated string.
    pub fn read_required_string(
        &mut self,
        target: Option<usize>,
        field: &'static str,
        record: usize,
    ) -> Result<String> {
        self.read_string(target)?.ok_or(Error::NullReference {
            field,
            offset: record,
        })
    }

    /// Follow a reference to an inline array of `count` records.
    ///
    /// An empty array never dereferences its offset.
    pub fn read_array<T>(
        &mut self,
        target: Option<usize>,
        count: usize,
        field: &'static str,
        record: usize,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let position = target.ok_or(Error::NullReference {
            field,
            offset: record,
        })?;

        self.at(position, |s| {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read(s)?);
            }
            Ok(items)
        })
    }

    /// Follow a reference to an inline array of plain-old-data values.
    pub fn read_pod_array<T: FromBytes>(
        &mut self,
        target: Option<usize>,
        count: usize,
        field: &'static str,
        record: usize,
    ) -> Result<Vec<T>> {
        self.read_array(target, count, field, record, |s| {
            Ok(s.cursor.read_struct::<T>()?)
        })
    }

    /// Follow a reference to an offset table of `count` shared records.
    ///
    /// Each table entry is resolved against `entry_base`; a zero entry is a
    /// [`Error::NullReference`].
    pub fn read_table<T: Decode>(
        &mut self,
        target: Option<usize>,
        count: usize,
        entry_base: TableBase,
        field: &'static str,
        record: usize,
    ) -> Result<Vec<Rc<T>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let table = target.ok_or(Error::NullReference {
            field,
            offset: record,
        })?;
        let base = OffsetBase::Record(entry_base.resolve(table));

        let targets = self.at(table, |s| {
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                let entry = s.cursor.position();
                let target = s.cursor.read_offset(base)?.ok_or(Error::NullReference {
                    field,
                    offset: entry,
                })?;
                targets.push(target);
            }
            Ok(targets)
        })?;
        for &position in &targets {
            self.mark(position);
        }

        targets
            .into_iter()
            .map(|position| self.at(position, Self::decode_shared::<T>))
            .collect()
    }

    /// Look up the decoder for the tag stored `tag_offset` bytes into the
    /// record at the current position.
    ///
    /// The tag is peeked, not consumed. Unmapped tags fail with
    /// [`Error::UnknownVariant`].
    pub fn peek_variant<T>(
        &self,
        domain: &'static str,
        tag_offset: usize,
        decoders: &[(u32, VariantDecoder<T>)],
    ) -> Result<VariantDecoder<T>> {
        let tag = self.cursor.peek_u32_at(tag_offset)?;
        decoders
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|&(_, decoder)| decoder)
            .ok_or(Error::UnknownVariant {
                domain,
                tag,
                offset: self.cursor.position(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair(u32, u32);

    impl Decode for Pair {
        fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
            Ok(Pair(session.cursor.read_u32()?, session.cursor.read_u32()?))
        }
    }

    #[derive(Debug)]
    struct Single(u32);

    impl Decode for Single {
        fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
            Ok(Single(session.cursor.read_u32()?))
        }
    }

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_shared_record_decoded_once() {
        let data = words(&[1, 2, 3, 4]);
        let mut session = DecodeSession::new(&data);

        let first = session.decode_ref::<Pair>(Some(8)).unwrap().unwrap();
        let second = session.decode_ref::<Pair>(Some(8)).unwrap().unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*first, Pair(3, 4));
        assert_eq!(session.cached_len(), 1);
        assert_eq!(session.cursor.position(), 0);
    }

    #[test]
    fn test_cache_hit_advances_cursor() {
        let data = words(&[1, 2, 3, 4]);
        let mut session = DecodeSession::new(&data);
        session.decode_ref::<Pair>(Some(0)).unwrap();

        let items = session
            .read_array(Some(0), 2, "pairs", 0, |s| s.decode_shared::<Pair>())
            .unwrap();
        assert!(Rc::ptr_eq(&items[0], &session.decode_ref::<Pair>(Some(0)).unwrap().unwrap()));
        assert_eq!(*items[1], Pair(3, 4));
    }

    #[test]
    fn test_cache_type_mismatch() {
        let data = words(&[1, 2]);
        let mut session = DecodeSession::new(&data);
        session.decode_ref::<Pair>(Some(0)).unwrap();

        let result = session.decode_ref::<Single>(Some(0));
        assert!(matches!(result, Err(Error::CacheTypeMismatch { offset: 0, .. })));
    }

    #[test]
    fn test_clear_forgets_records() {
        let data = words(&[1, 2]);
        let mut session = DecodeSession::new(&data);
        let first = session.decode_ref::<Pair>(Some(0)).unwrap().unwrap();
        session.clear();
        let second = session.decode_ref::<Pair>(Some(0)).unwrap().unwrap();

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_next_landmark() {
        let data = words(&[1, 2, 3, 4]);
        let mut session = DecodeSession::new(&data);
        session.decode_ref::<Pair>(Some(8)).unwrap();
        session.mark(4);

        assert_eq!(session.next_landmark(0), 4);
        assert_eq!(session.next_landmark(4), 8);
        assert_eq!(session.next_landmark(8), 16);

        session.clear();
        assert_eq!(session.next_landmark(0), 16);
    }

    #[test]
    fn test_absent_reference() {
        let data = words(&[1, 2]);
        let mut session = DecodeSession::new(&data);

        assert!(session.decode_ref::<Pair>(None).unwrap().is_none());
        assert!(session.read_string(None).unwrap().is_none());
        assert!(session.read_array(None, 0, "empty", 0, |s| Ok(s.cursor.read_u32()?)).unwrap().is_empty());
        assert!(matches!(
            session.read_pod_array::<u32>(None, 1, "values", 0),
            Err(Error::NullReference { field: "values", .. })
        ));
    }

    #[test]
    fn test_offset_table_entries() {
        // table at 0 with two entries relative to the table start, records at 8 and 16
        let data = words(&[8, 16, 10, 11, 20, 21]);
        let mut session = DecodeSession::new(&data);

        let items = session
            .read_table::<Pair>(Some(0), 2, TableBase::TableStart, "pairs", 0)
            .unwrap();
        assert_eq!(*items[0], Pair(10, 11));
        assert_eq!(*items[1], Pair(20, 21));
    }

    #[test]
    fn test_offset_table_null_entry() {
        let data = words(&[8, 0, 10, 11]);
        let mut session = DecodeSession::new(&data);

        let result = session.read_table::<Pair>(Some(0), 2, TableBase::TableStart, "pairs", 0);
        assert!(matches!(result, Err(Error::NullReference { offset: 4, .. })));
    }

    #[test]
    fn test_peek_variant() {
        fn one(_: &mut DecodeSession<'_>, _: usize) -> Result<u32> {
            Ok(1)
        }
        fn two(_: &mut DecodeSession<'_>, _: usize) -> Result<u32> {
            Ok(2)
        }
        let decoders: [(u32, VariantDecoder<u32>); 2] = [(1, one), (2, two)];

        let data = words(&[0, 2, 9]);
        let mut session = DecodeSession::new(&data);

        let decoder = session.peek_variant("test", 4, &decoders).unwrap();
        assert_eq!(session.cursor.position(), 0);
        assert_eq!(decoder(&mut session, 0).unwrap(), 2);

        session.cursor.seek(4).unwrap();
        assert!(matches!(
            session.peek_variant("test", 4, &decoders),
            Err(Error::UnknownVariant { tag: 9, offset: 4, .. })
        ));
    }
}
