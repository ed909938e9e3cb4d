//! Shared fixtures for root integration tests.
//!
//! [`FakeChdman`] is a shell script standing in for chdman. For
//! `createcd`/`createdvd` it writes 100 bytes to the `-o` path. The input
//! name selects other behaviour:
//!
//! | input contains | behaviour |
//! |----------------|-----------|
//! | `fail`    | error on stderr, exits 1, writes nothing |
//! | `partial` | writes 40 bytes to the output, then exits 1 |
//! | `hang`    | `exec sleep 30` (only ends when killed) |

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-help" ]; then
  echo "chdman - MAME Compressed Hunks of Data (CHD) manager 0.262 (fake)"
  exit 1
fi
case "$3" in
  *fail*) echo "Error opening input file" >&2; exit 1 ;;
  *partial*) head -c 40 /dev/zero > "$5"; echo "Error writing output" >&2; exit 1 ;;
  *hang*) exec sleep 30 ;;
esac
echo "Compressing, 10% complete"
echo "Compressing, 60% complete"
case "$1" in
  create*) head -c 100 /dev/zero > "$5" ;;
esac
echo "Compression complete"
exit 0
"#;

pub struct FakeChdman {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl FakeChdman {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chdman");
        std::fs::write(&path, SCRIPT).expect("write fake chdman");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake chdman");
        Self { dir, path }
    }

    /// Create a file of `len` bytes inside the fixture directory.
    pub fn input(&self, name: &str, len: usize) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, vec![0u8; len]).expect("write input");
        path
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
