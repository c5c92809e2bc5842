use crate::filesystem::{FileEntry, FileType};
use chrono::{Local, TimeZone};
use humansize::WINDOWS;

pub const CALCULATING: &str = "Calculating...";

/// 1024-based size, or the placeholder while a folder is still being sized.
pub fn format_size(size: Option<u64>) -> String {
    match size {
        Some(bytes) => humansize::format_size(bytes, WINDOWS),
        None => CALCULATING.to_string(),
    }
}

pub fn format_modified(modified: i64) -> String {
    if modified <= 0 {
        return String::new();
    }
    match Local.timestamp_opt(modified, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

pub fn type_label(entry: &FileEntry) -> String {
    match entry.file_type {
        FileType::Directory => "Folder".to_string(),
        FileType::Symlink => "Link".to_string(),
        FileType::File | FileType::Unknown => {
            let ext = entry.extension();
            if ext.is_empty() {
                "File".to_string()
            } else {
                format!("{} file", ext.to_uppercase())
            }
        }
    }
}
