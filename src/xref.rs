//! Cross-reference table and trailer (spec §4.5/§4.7): where every indirect object lives in the
//! file, reached either through a classic `xref` table or a cross-reference stream, optionally
//! chained through `/Prev` across incremental updates.

use std::collections::BTreeMap;

use crate::Dictionary;

/// Where an object's bytes live, or how it's otherwise accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// A direct, uncompressed object starting at this byte offset.
    Normal { offset: u64, generation: u16 },
    /// An object packed inside an object stream (spec §4.6): the object stream's object number
    /// and this object's index within it.
    Compressed { stream_number: u32, index: u32 },
    /// A `f`/free entry; kept so the writer can preserve the free list's linked structure.
    Free { generation: u16 },
}

/// Maps object numbers to their [`XrefEntry`], plus the trailer dictionary that closes out the
/// xref section (and therefore describes the whole document: `/Root`, `/Size`, `/Info`,
/// `/Encrypt`, `/ID`).
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
    /// Highest `/Size` seen across the whole `/Prev` chain; used to allocate fresh object
    /// numbers on write.
    pub max_object_number: u32,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable::default()
    }

    pub fn get(&self, object_number: u32) -> Option<XrefEntry> {
        self.entries.get(&object_number).copied()
    }

    /// Inserts `entry` for `object_number`, unless an entry for it already exists — earlier
    /// (more recent) sections in a `/Prev` chain are merged first, so the first writer wins and
    /// later (older) sections must not clobber it.
    pub fn insert_if_absent(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.entry(object_number).or_insert(entry);
    }

    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest object number not currently in use, for allocating new indirect objects.
    pub fn next_free_object_number(&self) -> u32 {
        self.max_object_number.max(
            self.entries
                .keys()
                .next_back()
                .map(|&n| n + 1)
                .unwrap_or(1),
        )
    }

    pub fn normal_entries(&self) -> impl Iterator<Item = (u32, u64, u16)> + '_ {
        self.entries.iter().filter_map(|(&num, entry)| match entry {
            XrefEntry::Normal { offset, generation } => Some((num, *offset, *generation)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_writer() {
        let mut table = XrefTable::new();
        table.insert_if_absent(3, XrefEntry::Normal { offset: 100, generation: 0 });
        table.insert_if_absent(3, XrefEntry::Normal { offset: 999, generation: 0 });
        assert_eq!(table.get(3), Some(XrefEntry::Normal { offset: 100, generation: 0 }));
    }

    #[test]
    fn next_free_object_number_skips_used_numbers() {
        let mut table = XrefTable::new();
        table.insert(1, XrefEntry::Normal { offset: 0, generation: 0 });
        table.insert(5, XrefEntry::Normal { offset: 0, generation: 0 });
        assert_eq!(table.next_free_object_number(), 6);
    }

    #[test]
    fn compressed_entries_are_excluded_from_normal_entries() {
        let mut table = XrefTable::new();
        table.insert(2, XrefEntry::Normal { offset: 10, generation: 0 });
        table.insert(3, XrefEntry::Compressed { stream_number: 7, index: 0 });
        let normals: Vec<_> = table.normal_entries().collect();
        assert_eq!(normals, vec![(2, 10, 0)]);
    }
}
