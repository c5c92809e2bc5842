//! Listing filters: type, size, modification date, name and hidden files.

use crate::filesystem::{FileEntry, FileType};
use chrono::{DateTime, Duration, Local, TimeZone};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFilter {
    All,
    Folders,
    Files,
    Documents,
    Images,
    Audio,
    Video,
    Archives,
    Code,
}

impl TypeFilter {
    pub const ALL: [TypeFilter; 9] = [
        TypeFilter::All,
        TypeFilter::Folders,
        TypeFilter::Files,
        TypeFilter::Documents,
        TypeFilter::Images,
        TypeFilter::Audio,
        TypeFilter::Video,
        TypeFilter::Archives,
        TypeFilter::Code,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TypeFilter::All => "All types",
            TypeFilter::Folders => "Folders",
            TypeFilter::Files => "Files",
            TypeFilter::Documents => "Documents",
            TypeFilter::Images => "Images",
            TypeFilter::Audio => "Audio",
            TypeFilter::Video => "Video",
            TypeFilter::Archives => "Archives",
            TypeFilter::Code => "Code",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            TypeFilter::Documents => &[
                "txt", "md", "pdf", "doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "ppt",
                "pptx", "odp", "csv", "epub",
            ],
            TypeFilter::Images => &[
                "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff", "heic",
                "raw",
            ],
            TypeFilter::Audio => &["mp3", "wav", "flac", "ogg", "aac", "m4a", "wma", "opus"],
            TypeFilter::Video => &["mp4", "mkv", "avi", "mov", "wmv", "webm", "flv", "m4v"],
            TypeFilter::Archives => &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "zst", "iso"],
            TypeFilter::Code => &[
                "rs", "py", "js", "ts", "jsx", "tsx", "c", "h", "cpp", "hpp", "cc", "go", "java",
                "kt", "rb", "php", "lua", "sh", "ps1", "bat", "html", "css", "json", "toml",
                "yaml", "yml", "sql", "swift", "dart", "zig",
            ],
            TypeFilter::All | TypeFilter::Folders | TypeFilter::Files => &[],
        }
    }

    pub fn matches(self, entry: &FileEntry) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Folders => entry.is_dir(),
            TypeFilter::Files => !entry.is_dir(),
            category => {
                !entry.is_dir() && category.extensions().contains(&entry.extension().as_str())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeFilter {
    Any,
    Empty,
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeFilter {
    pub const ALL: [SizeFilter; 7] = [
        SizeFilter::Any,
        SizeFilter::Empty,
        SizeFilter::Tiny,
        SizeFilter::Small,
        SizeFilter::Medium,
        SizeFilter::Large,
        SizeFilter::Huge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SizeFilter::Any => "Any size",
            SizeFilter::Empty => "Empty (0 B)",
            SizeFilter::Tiny => "Tiny (< 16 KB)",
            SizeFilter::Small => "Small (< 1 MB)",
            SizeFilter::Medium => "Medium (< 128 MB)",
            SizeFilter::Large => "Large (< 1 GB)",
            SizeFilter::Huge => "Huge (>= 1 GB)",
        }
    }

    pub fn matches(self, size: u64) -> bool {
        match self {
            SizeFilter::Any => true,
            SizeFilter::Empty => size == 0,
            SizeFilter::Tiny => size < 16 * KB,
            SizeFilter::Small => size < MB,
            SizeFilter::Medium => size < 128 * MB,
            SizeFilter::Large => size < GB,
            SizeFilter::Huge => size >= GB,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateFilter {
    Any,
    Today,
    PastWeek,
    PastMonth,
    PastYear,
    Older,
}

impl DateFilter {
    pub const ALL: [DateFilter; 6] = [
        DateFilter::Any,
        DateFilter::Today,
        DateFilter::PastWeek,
        DateFilter::PastMonth,
        DateFilter::PastYear,
        DateFilter::Older,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateFilter::Any => "Any date",
            DateFilter::Today => "Today",
            DateFilter::PastWeek => "Past week",
            DateFilter::PastMonth => "Past month",
            DateFilter::PastYear => "Past year",
            DateFilter::Older => "Older than a year",
        }
    }

    /// `modified` is unix seconds; 0 means unknown and only passes `Any`.
    pub fn matches(self, modified: i64, now: DateTime<Local>) -> bool {
        if self == DateFilter::Any {
            return true;
        }
        if modified <= 0 {
            return false;
        }
        let Some(when) = Local.timestamp_opt(modified, 0).single() else {
            return false;
        };
        let age = now.signed_duration_since(when);
        match self {
            DateFilter::Any => true,
            DateFilter::Today => when.date_naive() == now.date_naive(),
            DateFilter::PastWeek => age <= Duration::days(7),
            DateFilter::PastMonth => age <= Duration::days(30),
            DateFilter::PastYear => age <= Duration::days(365),
            DateFilter::Older => age > Duration::days(365),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterState {
    pub type_filter: TypeFilter,
    pub size_filter: SizeFilter,
    pub date_filter: DateFilter,
    pub query: String,
    pub show_hidden: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            type_filter: TypeFilter::All,
            size_filter: SizeFilter::Any,
            date_filter: DateFilter::Any,
            query: String::new(),
            show_hidden: false,
        }
    }
}

impl FilterState {
    /// True when any filter other than the hidden-files toggle narrows the listing.
    pub fn is_active(&self) -> bool {
        self.type_filter != TypeFilter::All
            || self.size_filter != SizeFilter::Any
            || self.date_filter != DateFilter::Any
            || !self.query.is_empty()
    }

    pub fn reset(&mut self) {
        let show_hidden = self.show_hidden;
        *self = Self {
            show_hidden,
            ..Self::default()
        };
    }

    /// `known_size` is the computed folder size; `None` while still calculating.
    pub fn matches(&self, entry: &FileEntry, known_size: Option<u64>, now: DateTime<Local>) -> bool {
        if entry.is_hidden && !self.show_hidden {
            return false;
        }
        if !self.query.is_empty()
            && !entry
                .name
                .to_lowercase()
                .contains(&self.query.to_lowercase())
        {
            return false;
        }
        if !self.type_filter.matches(entry) {
            return false;
        }
        let size = match entry.file_type {
            FileType::Directory => known_size,
            _ => Some(entry.size),
        };
        // Folders still being sized stay visible.
        if let Some(size) = size {
            if !self.size_filter.matches(size) {
                return false;
            }
        }
        self.date_filter.matches(entry.modified, now)
    }
}
