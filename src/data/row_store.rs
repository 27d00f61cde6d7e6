//! Arena of rows addressed by generational handles.
//!
//! Rows live in slots that are recycled after removal; every reuse bumps the
//! slot generation so handles to removed rows stop resolving instead of
//! silently pointing at a newer row. The table's visible order is kept
//! separately as a sequence of keys, which may contain holes after a
//! non-compacting removal.

use std::fmt;

use crate::data::datatable::TableId;
use crate::data::row::Row;

/// Stable handle to a row of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId {
    table: TableId,
    slot: u32,
    generation: u32,
}

impl RowId {
    pub fn table(&self) -> TableId {
        self.table
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}v{}", self.table, self.slot, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    row: Option<Row>,
}

#[derive(Debug)]
pub(crate) struct RowStore {
    table: TableId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    keys: Vec<Option<RowId>>,
    live: usize,
}

impl RowStore {
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            slots: Vec::new(),
            free: Vec::new(),
            keys: Vec::new(),
            live: 0,
        }
    }

    fn allocate(&mut self, row: Row) -> RowId {
        debug_assert_eq!(row.owner(), self.table, "row stored in a foreign table");
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.row = Some(row);
            return RowId {
                table: self.table,
                slot,
                generation: entry.generation,
            };
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            row: Some(row),
        });
        RowId {
            table: self.table,
            slot,
            generation: 0,
        }
    }

    /// Store a row at the end of the key sequence.
    pub fn push_back(&mut self, row: Row) -> RowId {
        let id = self.allocate(row);
        self.keys.push(Some(id));
        id
    }

    /// Store a row at key 0. Every existing key shifts, so holes are dropped.
    pub fn push_front(&mut self, row: Row) -> RowId {
        let id = self.allocate(row);
        self.compact();
        self.keys.insert(0, Some(id));
        id
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        if id.table != self.table {
            return None;
        }
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.row.as_ref()
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut Row> {
        if id.table != self.table {
            return None;
        }
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.row.as_mut()
    }

    pub fn id_at(&self, key: usize) -> Option<RowId> {
        self.keys.get(key).copied().flatten()
    }

    pub fn key_of(&self, id: RowId) -> Option<usize> {
        self.keys.iter().position(|k| *k == Some(id))
    }

    /// Drop the row stored under `key`, leaving a hole in the key sequence.
    pub fn remove_key(&mut self, key: usize) -> Option<Row> {
        let id = self.keys.get_mut(key)?.take()?;
        let slot = &mut self.slots[id.slot as usize];
        let row = slot.row.take();
        if row.is_some() {
            self.free.push(id.slot);
            self.live -= 1;
        }
        row
    }

    /// Renumber keys contiguously.
    pub fn compact(&mut self) {
        self.keys.retain(Option::is_some);
    }

    /// Handles of the stored rows in key order.
    pub fn ids(&self) -> Vec<RowId> {
        self.keys.iter().flatten().copied().collect()
    }

    /// `(key, handle)` pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, RowId)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(key, id)| id.map(|id| (key, id)))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.row.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
