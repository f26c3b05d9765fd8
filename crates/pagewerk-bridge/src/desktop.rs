// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop capability implementations backed by the local filesystem and the
// poppler `pdftoppm` tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{ExportedFile, PageIndex, Record};
use tracing::{debug, info, instrument};

use crate::traits::*;

/// Points per inch; a raster at `72 × scale` DPI maps one point to `scale` pixels.
const POINTS_PER_INCH: f32 = 72.0;

// -- File writing ---------------------------------------------------------------

/// Writes files atomically: the bytes land in a temporary file in the target
/// directory which is then renamed over the destination.
#[derive(Debug, Clone, Default)]
pub struct LocalFileWriter;

impl FileWriter for LocalFileWriter {
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len(), dir = %directory.display()))]
    fn write_file(&self, bytes: &[u8], file_name: &str, directory: &Path) -> Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(PagewerkError::Storage(format!(
                "invalid file name {file_name:?}"
            )));
        }
        std::fs::create_dir_all(directory).map_err(|err| {
            PagewerkError::Storage(format!("cannot create {}: {}", directory.display(), err))
        })?;

        let destination = directory.join(file_name);
        let mut staged = tempfile::NamedTempFile::new_in(directory).map_err(|err| {
            PagewerkError::Storage(format!("cannot stage file in {}: {}", directory.display(), err))
        })?;
        staged
            .write_all(bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| PagewerkError::Storage(format!("failed to write {file_name}: {err}")))?;
        staged.persist(&destination).map_err(|err| {
            PagewerkError::Storage(format!(
                "failed to replace {}: {}",
                destination.display(),
                err.error
            ))
        })?;

        info!(path = %destination.display(), "File written");
        Ok(destination)
    }
}

/// Persists exported files into one folder.
#[derive(Debug, Clone)]
pub struct DirectoryExportSink {
    directory: PathBuf,
    writer: LocalFileWriter,
}

impl DirectoryExportSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            writer: LocalFileWriter,
        }
    }
}

impl ExportSink for DirectoryExportSink {
    fn persist_exported_files(&self, files: &[ExportedFile]) -> Result<()> {
        for file in files {
            self.writer
                .write_file(&file.bytes, &file.file_name, &self.directory)?;
        }
        info!(
            count = files.len(),
            dir = %self.directory.display(),
            "Exported files persisted"
        );
        Ok(())
    }
}

// -- Catalog and documents ------------------------------------------------------

/// Reads the record catalog from a JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordCatalogSource for JsonCatalogFile {
    fn fetch_record_catalog(&self) -> Result<Vec<Record>> {
        let data = std::fs::read_to_string(&self.path).map_err(|err| {
            PagewerkError::Catalog(format!("cannot read {}: {}", self.path.display(), err))
        })?;
        let records: Vec<Record> = serde_json::from_str(&data).map_err(|err| {
            PagewerkError::Catalog(format!("{} is not a record list: {}", self.path.display(), err))
        })?;
        debug!(records = records.len(), "Catalog loaded");
        Ok(records)
    }
}

/// Treats document references as filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct FsDocumentFetcher;

impl DocumentFetcher for FsDocumentFetcher {
    fn fetch_document(&self, reference: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(reference)?)
    }
}

// -- Rasterisation --------------------------------------------------------------

/// Renders pages through poppler's `pdftoppm` command-line tool.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    /// Use a specific `pdftoppm` binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    #[instrument(skip_all, fields(page = page.get(), scale = scale))]
    fn rasterize(&self, pdf: &[u8], page: PageIndex, scale: f32) -> Result<DynamicImage> {
        let raster_err = |what: &str, err: &dyn std::fmt::Display| {
            PagewerkError::RasterError(format!("{what} for page {page}: {err}"))
        };

        let workdir = tempfile::tempdir().map_err(|err| raster_err("no scratch dir", &err))?;
        let input = workdir.path().join("source.pdf");
        std::fs::write(&input, pdf).map_err(|err| raster_err("cannot stage PDF", &err))?;
        let prefix = workdir.path().join("page");

        let dpi = (POINTS_PER_INCH * scale).round().max(1.0) as u32;
        let page_arg = page.get().to_string();
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|err| raster_err("failed to invoke pdftoppm (is poppler-utils installed?)", &err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(raster_err("pdftoppm failed", &stderr.trim()));
        }

        let image_path = prefix.with_extension("png");
        let image = image::open(&image_path).map_err(|err| raster_err("unreadable raster", &err))?;
        debug!(
            width = image.width(),
            height = image.height(),
            dpi,
            "Page rasterised"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::types::RecordId;

    #[test]
    fn local_writer_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalFileWriter;

        let first = writer.write_file(b"first", "order.pdf", dir.path()).unwrap();
        let second = writer.write_file(b"second", "order.pdf", dir.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
        // Only the destination remains; the staging file was renamed away.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn local_writer_rejects_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileWriter.write_file(b"x", "../escape.pdf", dir.path());
        assert!(matches!(result, Err(PagewerkError::Storage(_))));
    }

    #[test]
    fn directory_sink_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryExportSink::new(dir.path().join("out"));
        let files = vec![
            ExportedFile {
                bytes: b"a".to_vec(),
                file_name: "A-1.pdf".into(),
                record_id: RecordId::new("1"),
                pages: vec![PageIndex(1)],
                used_fallback_name: false,
            },
            ExportedFile {
                bytes: b"b".to_vec(),
                file_name: "B-2.pdf".into(),
                record_id: RecordId::new("2"),
                pages: vec![PageIndex(2)],
                used_fallback_name: false,
            },
        ];
        sink.persist_exported_files(&files).unwrap();
        assert_eq!(std::fs::read(dir.path().join("out/A-1.pdf")).unwrap(), b"a");
        assert_eq!(std::fs::read(dir.path().join("out/B-2.pdf")).unwrap(), b"b");
    }

    #[test]
    fn json_catalog_reads_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"id":"1","primary_code":"BR-100","display_name":"Bracket"},{"id":"2","display_name":"Hinge"}]"#,
        )
        .unwrap();

        let records = JsonCatalogFile::new(&path).fetch_record_catalog().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].primary_code.as_deref(), Some("BR-100"));
        assert_eq!(records[1].primary_code, None);
    }

    #[test]
    fn json_catalog_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = JsonCatalogFile::new(&path).fetch_record_catalog();
        assert!(matches!(result, Err(PagewerkError::Catalog(_))));
    }

    #[test]
    fn missing_pdftoppm_is_a_raster_error() {
        let rasterizer = PdftoppmRasterizer::with_program("/nonexistent/pdftoppm");
        let result = rasterizer.rasterize(b"%PDF-1.5", PageIndex(1), 2.0);
        assert!(matches!(result, Err(PagewerkError::RasterError(_))));
    }
}
