use crate::filesystem::FileEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    Name,
    Size,
    Type,
    Modified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: SortColumn::Name,
            order: SortOrder::Ascending,
        }
    }
}

impl SortState {
    /// Header click: flip the order on the active column, otherwise switch to
    /// `column` ascending.
    pub fn click(&mut self, column: SortColumn) {
        if self.column == column {
            self.order = match self.order {
                SortOrder::Ascending => SortOrder::Descending,
                SortOrder::Descending => SortOrder::Ascending,
            };
        } else {
            self.column = column;
            self.order = SortOrder::Ascending;
        }
    }

    pub fn header_label(&self, column: SortColumn) -> String {
        let name = match column {
            SortColumn::Name => "Name",
            SortColumn::Size => "Size",
            SortColumn::Type => "Type",
            SortColumn::Modified => "Modified",
        };
        if self.column != column {
            return name.to_string();
        }
        match self.order {
            SortOrder::Ascending => format!("{} ⬆", name),
            SortOrder::Descending => format!("{} ⬇", name),
        }
    }
}

fn effective_size(entry: &FileEntry, sizes: &HashMap<PathBuf, u64>) -> u64 {
    if entry.is_dir() {
        sizes.get(&entry.path).copied().unwrap_or(0)
    } else {
        entry.size
    }
}

/// Directories always stay on top; `state` orders each group, name breaks ties.
pub fn sort_entries(entries: &mut [FileEntry], state: SortState, sizes: &HashMap<PathBuf, u64>) {
    entries.sort_by(|a, b| {
        match (a.is_dir(), b.is_dir()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let by_name = a.name.to_lowercase().cmp(&b.name.to_lowercase());
        let ordering = match state.column {
            SortColumn::Name => by_name,
            SortColumn::Size => effective_size(a, sizes)
                .cmp(&effective_size(b, sizes))
                .then(by_name),
            SortColumn::Type => a.extension().cmp(&b.extension()).then(by_name),
            SortColumn::Modified => a.modified.cmp(&b.modified).then(by_name),
        };

        match state.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}
