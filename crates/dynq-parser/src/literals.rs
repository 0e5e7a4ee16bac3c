//! Source text of the literals in one parse.
//!
//! A literal is first typed by its own text (`5` is `Int32`), but its final
//! type may only be known later: `x == 5` with a `Decimal` `x` needs the
//! literal as a `Decimal`. Promotion looks the text up here and re-reads it
//! as the wanted type.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one literal node of one parse. Ids minted by another table,
/// such as those inside a spliced-in tree from an earlier parse, are never
/// found here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiteralId {
    table: u32,
    index: u32,
}

/// Append-only table from literal node to its source text.
#[derive(Debug)]
pub struct LiteralTable {
    id: u32,
    texts: Vec<String>,
}

impl Default for LiteralTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralTable {
    pub fn new() -> Self {
        LiteralTable {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            texts: Vec::new(),
        }
    }

    pub fn add(&mut self, text: impl Into<String>) -> LiteralId {
        let id = LiteralId {
            table: self.id,
            index: self.texts.len() as u32,
        };
        self.texts.push(text.into());
        id
    }

    pub fn text(&self, id: LiteralId) -> Option<&str> {
        if id.table != self.id {
            return None;
        }
        self.texts.get(id.index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
