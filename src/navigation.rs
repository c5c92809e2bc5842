use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    Drives,
    Directory(PathBuf),
}

impl Location {
    pub fn label(&self) -> String {
        match self {
            Location::Drives => "Drives".to_string(),
            Location::Directory(path) => path.to_string_lossy().to_string(),
        }
    }
}

/// Current location plus browser-style back/forward history.
pub struct Navigator {
    current: Location,
    history: Vec<Location>,
    forward_stack: Vec<Location>,
}

impl Navigator {
    pub fn new(start: Location) -> Self {
        Self {
            current: start,
            history: Vec::new(),
            forward_stack: Vec::new(),
        }
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn current_dir(&self) -> Option<&Path> {
        match &self.current {
            Location::Directory(path) => Some(path),
            Location::Drives => None,
        }
    }

    fn goto(&mut self, location: Location) -> bool {
        if self.current == location {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, location);
        self.history.push(previous);
        self.forward_stack.clear();
        true
    }

    pub fn enter(&mut self, path: PathBuf) -> bool {
        self.goto(Location::Directory(path))
    }

    pub fn show_drives(&mut self) -> bool {
        self.goto(Location::Drives)
    }

    /// Parent directory, or the drives list from a filesystem root.
    pub fn go_up(&mut self) -> bool {
        let target = match &self.current {
            Location::Drives => return false,
            Location::Directory(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    Location::Directory(parent.to_path_buf())
                }
                _ => Location::Drives,
            },
        };
        self.goto(target)
    }

    pub fn go_back(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                let current = std::mem::replace(&mut self.current, prev);
                self.forward_stack.push(current);
                true
            }
            None => false,
        }
    }

    pub fn go_forward(&mut self) -> bool {
        match self.forward_stack.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.current, next);
                self.history.push(current);
                true
            }
            None => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward_stack.is_empty()
    }
}
