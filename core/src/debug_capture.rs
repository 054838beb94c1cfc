/*
 * debug_capture.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of msgmta, a Microsoft Graph mail relay.
 *
 * msgmta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * msgmta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with msgmta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Per-invocation diagnostic artifacts: the raw input, the merged envelope
//! and the bearer token, written side by side under one base name.

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::envelope::Envelope;
use crate::oauth::AccessToken;

/// First of `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... inside `dir` for which
/// `exists` is false.
pub fn first_free_name(dir: &Path, stem: &str, ext: &str, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !exists(&candidate) {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, n, ext));
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Open capture for one invocation. The `.raw` file is written on start; the
/// other artifacts reuse its base name.
#[derive(Debug)]
pub struct DebugCapture {
    base: PathBuf,
}

impl DebugCapture {
    /// Create `dir` if needed and write the raw message under a timestamped name.
    pub fn start(dir: &Path, raw: &[u8]) -> io::Result<Self> {
        Self::start_with_stem(dir, &chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(), raw)
    }

    pub(crate) fn start_with_stem(dir: &Path, stem: &str, raw: &[u8]) -> io::Result<Self> {
        create_private_dir(dir)?;
        // Another invocation in the same second may take the name first.
        let (path, mut file) = loop {
            let path = first_free_name(dir, stem, "raw", |p| p.exists());
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => break (path, f),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        };
        file.write_all(raw)?;
        debug!("captured raw message to {}", path.display());
        Ok(Self {
            base: path.with_extension(""),
        })
    }

    /// Path of the artifact with the given extension.
    pub fn path(&self, ext: &str) -> PathBuf {
        self.base.with_extension(ext)
    }

    pub fn write_envelope(&self, envelope: &Envelope) -> io::Result<PathBuf> {
        let path = self.path("json");
        let json = serde_json::to_vec_pretty(envelope)?;
        fs::write(&path, json)?;
        debug!("captured envelope to {}", path.display());
        Ok(path)
    }

    pub fn write_token(&self, token: &AccessToken) -> io::Result<PathBuf> {
        let path = self.path("tkn");
        let mut file = create_private_file(&path)?;
        file.write_all(token.secret().as_bytes())?;
        debug!("captured token to {}", path.display());
        Ok(path)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    DirBuilder::new().recursive(true).create(dir)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> io::Result<File> {
    File::create(path)
}
