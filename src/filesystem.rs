use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use sysinfo::Disks;
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq)]
pub enum FileType {
    Directory,
    File,
    Symlink,
    Unknown,
}

#[derive(Clone, Debug)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub file_type: FileType,
    /// Byte length for files, 0 for directories (see `sizing`).
    pub size: u64,
    /// Seconds since the unix epoch, 0 when unknown.
    pub modified: i64,
    pub is_hidden: bool,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Lower-cased extension, empty for directories and extensionless names.
    pub fn extension(&self) -> String {
        if self.is_dir() {
            return String::new();
        }
        self.path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[derive(Clone, Debug)]
pub struct DriveInfo {
    pub name: String,
    pub mount_point: PathBuf,
    pub total_space: u64,
    pub available_space: u64,
}

pub fn get_drives() -> Vec<DriveInfo> {
    let disks = Disks::new_with_refreshed_list();
    // Bind mounts and snap loops often report the same mount point twice.
    let mut by_mount: BTreeMap<PathBuf, DriveInfo> = BTreeMap::new();
    for disk in disks.list() {
        let mount_point = disk.mount_point().to_path_buf();
        by_mount.entry(mount_point.clone()).or_insert_with(|| DriveInfo {
            name: disk.name().to_string_lossy().to_string(),
            mount_point,
            total_space: disk.total_space(),
            available_space: disk.available_space(),
        });
    }
    by_mount.into_values().collect()
}

#[cfg(windows)]
pub fn is_hidden(name: &str, metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    name.starts_with('.') || (metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN) != 0
}

#[cfg(not(windows))]
pub fn is_hidden(name: &str, _metadata: &fs::Metadata) -> bool {
    name.starts_with('.')
}

fn modified_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn read_directory(path: &Path) -> Result<Vec<FileEntry>> {
    let read_dir =
        fs::read_dir(path).with_context(|| format!("Cannot open {}", path.display()))?;

    let mut entries = Vec::new();
    for entry in read_dir.flatten() {
        // symlink_metadata so links to directories are never followed
        let metadata = match fs::symlink_metadata(entry.path()) {
            Ok(m) => m,
            Err(_) => continue, // Skip files we can't stat
        };

        let name = entry.file_name().to_string_lossy().to_string();
        let is_hidden = is_hidden(&name, &metadata);

        let file_type = if metadata.file_type().is_symlink() {
            FileType::Symlink
        } else if metadata.is_dir() {
            FileType::Directory
        } else if metadata.is_file() {
            FileType::File
        } else {
            FileType::Unknown
        };

        let size = if metadata.is_dir() { 0 } else { metadata.len() };

        entries.push(FileEntry {
            name,
            path: entry.path(),
            file_type,
            size,
            modified: modified_secs(&metadata),
            is_hidden,
        });
    }

    // Sort: Directories first, then files. Alphabetical within groups.
    entries.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });

    Ok(entries)
}

/// Total bytes of all regular files below `path`; unreadable parts count as 0.
/// Gives up and returns `None` as soon as `keep_going` returns false.
pub fn folder_size_until(path: &Path, keep_going: impl Fn() -> bool) -> Option<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        if !keep_going() {
            return None;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.file_type().is_file() {
            if let Ok(metadata) = entry.metadata() {
                total = total.saturating_add(metadata.len());
            }
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn folder_size(path: &Path) -> u64 {
        folder_size_until(path, || true).unwrap()
    }

    fn write(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    #[test]
    fn read_directory_lists_dirs_first_then_files_by_name() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("b.txt"), 3);
        write(&tmp.path().join("A.txt"), 1);
        fs::create_dir(tmp.path().join("zeta")).unwrap();
        fs::create_dir(tmp.path().join("Alpha")).unwrap();

        let entries = read_directory(tmp.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta", "A.txt", "b.txt"]);
        assert!(entries[0].is_dir());
        assert_eq!(entries[0].size, 0);
        assert_eq!(entries[3].size, 3);
        assert!(entries[3].modified > 0);
    }

    #[test]
    fn read_directory_marks_dot_files_hidden() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(".secret"), 1);
        write(&tmp.path().join("plain"), 1);

        let entries = read_directory(tmp.path()).unwrap();
        let hidden: Vec<_> = entries.iter().filter(|e| e.is_hidden).collect();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].name, ".secret");
    }

    #[test]
    fn read_directory_missing_path_is_an_error_naming_the_path() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let err = read_directory(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn read_directory_reports_symlinked_dirs_as_links() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        let entries = read_directory(tmp.path()).unwrap();
        let link = entries.iter().find(|e| e.name == "link").unwrap();
        assert_eq!(link.file_type, FileType::Symlink);
    }

    #[test]
    fn folder_size_sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        write(&tmp.path().join("top.bin"), 100);
        write(&tmp.path().join("a").join("mid.bin"), 20);
        write(&nested.join("deep.bin"), 3);

        assert_eq!(folder_size(tmp.path()), 123);
    }

    #[test]
    fn folder_size_of_missing_folder_is_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(folder_size(&tmp.path().join("gone")), 0);
    }

    #[test]
    fn folder_size_until_stops_when_asked() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("f"), 10);
        assert_eq!(folder_size_until(tmp.path(), || false), None);
    }

    #[cfg(unix)]
    #[test]
    fn folder_size_does_not_follow_symlinks() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let big = tmp.path().join("big");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&big).unwrap();
        write(&root.join("small"), 10);
        write(&big.join("huge"), 1000);
        std::os::unix::fs::symlink(&big, root.join("link")).unwrap();

        assert_eq!(folder_size(&root), 10);
    }

    #[cfg(unix)]
    #[test]
    fn folder_size_skips_unreadable_subfolders() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let locked = root.join("locked");
        fs::create_dir_all(&locked).unwrap();
        write(&root.join("ok.bin"), 10);
        write(&locked.join("f"), 5);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let size = folder_size(&root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root can still read the locked folder.
        assert!(size == 10 || size == 15, "unexpected size {}", size);
    }

    #[test]
    fn extension_is_lowercased_and_empty_for_dirs() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("Photo.JPG"), 1);
        fs::create_dir(tmp.path().join("dir.d")).unwrap();

        let entries = read_directory(tmp.path()).unwrap();
        let dir = entries.iter().find(|e| e.name == "dir.d").unwrap();
        let photo = entries.iter().find(|e| e.name == "Photo.JPG").unwrap();
        assert_eq!(dir.extension(), "");
        assert_eq!(photo.extension(), "jpg");
    }
}
