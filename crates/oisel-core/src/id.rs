//! Strongly-typed identifiers used across the engine.
//!
//! Files and tables live in arenas (`OiFitsCollection::files`, `OiFile::tables`);
//! these ids are plain indexes into them, never pointers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(v: u32) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u32 {
                self.0
            }
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(FileId);
new_id!(TableId);

/// Identity of one table inside a collection: used as key by mask registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct TableRef {
    pub file: FileId,
    pub table: TableId,
}

impl TableRef {
    pub const fn new(file: FileId, table: TableId) -> Self {
        Self { file, table }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.get(), self.table.get())
    }
}
