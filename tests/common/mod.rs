#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

/// Scratch directory removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `lines` joined by newlines (with a trailing newline) and returns
    /// the path.
    pub fn write_csv(&self, name: &str, lines: &[&str]) -> PathBuf {
        let path = self.file(name);
        let mut contents = lines.join("\n");
        contents.push('\n');
        fs::write(&path, contents).expect("write temp csv");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.file(name)).expect("read workspace file")
    }
}
