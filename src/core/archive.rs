//! Archive creation: walk a build output directory and produce one
//! compressed ZIP at `source_dir/archive_name`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::events::{EventSink, PipelineEvent};

/// What the builder produced, for reporting and for the deploy stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub bytes: u64,
    pub entries: usize,
}

/// Build the archive, overwriting any previous one at the same path.
///
/// The output file itself is excluded from the walk so a re-run never packs
/// the previous archive into the new one. Entries are written in sorted
/// order with a fixed timestamp and fixed permissions, so an unchanged input
/// set reproduces a byte-identical archive.
pub fn build(
    source_dir: &Path,
    archive_name: &str,
    events: &dyn EventSink,
) -> Result<ArchiveSummary> {
    if !source_dir.is_dir() {
        return Err(Error::Archive(format!(
            "source directory not found: {}",
            source_dir.display()
        )));
    }

    let archive_path = source_dir.join(archive_name);

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    collect_entries(source_dir, &archive_path, &mut files, &mut dirs)?;
    files.sort();
    dirs.sort();

    let file = File::create(&archive_path)
        .map_err(|err| Error::Archive(format!("cannot create {}: {}", archive_path.display(), err)))?;
    let mut writer = ZipWriter::new(file);

    let file_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);
    let dir_options = file_options.unix_permissions(0o755);

    let mut entries = 0usize;

    for dir in &dirs {
        writer
            .add_directory(entry_name(source_dir, dir)?, dir_options)
            .map_err(|err| Error::Archive(err.to_string()))?;
        entries += 1;
    }

    for path in &files {
        writer
            .start_file(entry_name(source_dir, path)?, file_options)
            .map_err(|err| Error::Archive(err.to_string()))?;
        let mut input = File::open(path)
            .map_err(|err| Error::Archive(format!("cannot read {}: {}", path.display(), err)))?;
        io::copy(&mut input, &mut writer)
            .map_err(|err| Error::Archive(format!("cannot write {}: {}", path.display(), err)))?;
        entries += 1;
    }

    let file = writer
        .finish()
        .map_err(|err| Error::Archive(err.to_string()))?;
    let bytes = file
        .metadata()
        .map_err(|err| Error::Archive(err.to_string()))?
        .len();

    events.emit(PipelineEvent::ArchiveWritten {
        path: archive_path.display().to_string(),
        bytes,
        entries,
    });

    Ok(ArchiveSummary {
        path: archive_path,
        bytes,
        entries,
    })
}

/// Collect every entry under `dir` except the archive output path.
fn collect_entries(
    dir: &Path,
    skip: &Path,
    files: &mut Vec<PathBuf>,
    dirs: &mut Vec<PathBuf>,
) -> Result<()> {
    let reader = fs::read_dir(dir)
        .map_err(|err| Error::Archive(format!("cannot read {}: {}", dir.display(), err)))?;

    for entry in reader {
        let entry = entry.map_err(|err| Error::Archive(err.to_string()))?;
        let path = entry.path();
        if path == skip {
            continue;
        }
        if path.is_dir() {
            dirs.push(path.clone());
            collect_entries(&path, skip, files, dirs)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::Archive(format!("{} escapes the source directory", path.display())))?;
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct NullSink;

    impl EventSink for NullSink {
        fn emit(&self, _event: PipelineEvent) {}
    }

    fn entry_names(archive_path: &Path) -> HashSet<String> {
        let file = File::open(archive_path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(|name| name.to_string()).collect()
    }

    #[test]
    fn packs_files_and_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.js"), "console.log(1);").unwrap();

        let summary = build(dir.path(), "build.zip", &NullSink).unwrap();
        assert!(summary.path.exists());
        assert!(summary.bytes > 0);
        assert_eq!(summary.entries, 3);

        let names = entry_names(&summary.path);
        assert!(names.contains("index.html"));
        assert!(names.contains("assets/"));
        assert!(names.contains("assets/app.js"));
    }

    #[test]
    fn archive_never_contains_itself() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        build(dir.path(), "build.zip", &NullSink).unwrap();
        // Second run: the previous archive is on disk but must be skipped.
        let summary = build(dir.path(), "build.zip", &NullSink).unwrap();

        let names = entry_names(&summary.path);
        assert!(!names.contains("build.zip"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn rebuilding_unchanged_input_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();

        let first = build(dir.path(), "build.zip", &NullSink).unwrap();
        let first_bytes = fs::read(&first.path).unwrap();

        let second = build(dir.path(), "build.zip", &NullSink).unwrap();
        let second_bytes = fs::read(&second.path).unwrap();

        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn overwrites_a_stale_archive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("build.zip"), "not a real archive").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let summary = build(dir.path(), "build.zip", &NullSink).unwrap();
        let names = entry_names(&summary.path);
        assert_eq!(names.len(), 1);
        assert!(names.contains("index.html"));
    }

    #[test]
    fn preserves_empty_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("logs")).unwrap();

        let summary = build(dir.path(), "build.zip", &NullSink).unwrap();
        let names = entry_names(&summary.path);
        assert!(names.contains("logs/"));
    }

    #[test]
    fn missing_source_directory_is_an_archive_error() {
        let err = build(Path::new("/nonexistent/dist"), "build.zip", &NullSink).unwrap_err();
        assert_eq!(err.code(), "ARCHIVE_ERROR");
    }

    #[test]
    fn reports_size_and_path_through_events() {
        struct Recorder(std::cell::RefCell<Vec<PipelineEvent>>);

        impl EventSink for Recorder {
            fn emit(&self, event: PipelineEvent) {
                self.0.borrow_mut().push(event);
            }
        }

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let recorder = Recorder(Default::default());
        let summary = build(dir.path(), "build.zip", &recorder).unwrap();

        let events = recorder.0.into_inner();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PipelineEvent::ArchiveWritten { path, bytes, entries } => {
                assert_eq!(*bytes, summary.bytes);
                assert_eq!(*entries, 1);
                assert!(path.ends_with("build.zip"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
