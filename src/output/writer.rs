//! Append-only and create-only corpus writers
//!
//! JSONL logs are opened in append mode and every record is written as one
//! complete line and flushed immediately. Page files are written through a
//! temporary file and renamed into place, and an existing file is never
//! replaced.

use crate::output::records::{AssetRecord, ErrorRecord, MappingRecord, PageRecord};
use crate::output::OutputLayout;
use crate::{CorpusError, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Writes `bytes` to `path` atomically (temp file in the same directory, then rename)
///
/// Readers either see the previous file or the complete new one, never a
/// partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp, path)
}

/// Writer for everything under `BASE_DIR` except the checkpoint
#[derive(Debug)]
pub struct OutputWriter {
    layout: OutputLayout,
    mapping: File,
    assets: File,
    errors: File,
}

impl OutputWriter {
    /// Creates the directory layout and opens the JSONL logs for appending
    ///
    /// # Returns
    ///
    /// * `Ok(OutputWriter)` - Directories exist and logs are open
    /// * `Err(CorpusError::Output)` - The output directory is not writable
    pub fn open(layout: OutputLayout) -> Result<Self> {
        for dir in [layout.base_dir().to_path_buf(), layout.pages_dir(), layout.json_dir()] {
            fs::create_dir_all(&dir).map_err(|e| CorpusError::output(&dir, e))?;
        }

        let mapping = open_log(&layout.mapping_path())?;
        let assets = open_log(&layout.assets_path())?;
        let errors = open_log(&layout.errors_path())?;

        Ok(Self {
            layout,
            mapping,
            assets,
            errors,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Stores a raw response body as `pages/<html_key>.html`
    ///
    /// Returns false, without writing, if the file already exists.
    pub fn write_html(&self, html_key: &str, body: &[u8]) -> Result<bool> {
        let path = self.layout.html_path(html_key);
        create_only(&path, body)
    }

    /// Stores a page record as `json/<json_key>.json`
    ///
    /// Returns false, without writing, if a record with this content hash
    /// already exists.
    pub fn write_page_record(&self, record: &PageRecord) -> Result<bool> {
        let path = self.layout.json_path(&record.json_key);
        if path.exists() {
            return Ok(false);
        }
        let json = serde_json::to_vec_pretty(record)?;
        create_only(&path, &json)
    }

    pub fn append_mapping(&mut self, record: &MappingRecord) -> Result<()> {
        let path = self.layout.mapping_path();
        append_line(&mut self.mapping, &path, record)
    }

    pub fn append_asset(&mut self, record: &AssetRecord) -> Result<()> {
        let path = self.layout.assets_path();
        append_line(&mut self.assets, &path, record)
    }

    pub fn append_error(&mut self, record: &ErrorRecord) -> Result<()> {
        let path = self.layout.errors_path();
        append_line(&mut self.errors, &path, record)
    }
}

/// Opens a JSONL log for appending, terminating a torn last line if present
fn open_log(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| CorpusError::output(path, e))?;

    terminate_last_line(&mut file).map_err(|e| CorpusError::output(path, e))?;
    Ok(file)
}

/// Appends a newline if the file is non-empty and does not end with one
///
/// A crash mid-append can leave a partial line; without this the next record
/// would be glued onto it.
fn terminate_last_line(file: &mut File) -> io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn append_line<T: Serialize>(file: &mut File, path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    file.write_all(line.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| CorpusError::output(path, e))
}

fn create_only(path: &Path, bytes: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_atomic(path, bytes).map_err(|e| CorpusError::output(path, e))?;
    Ok(true)
}
