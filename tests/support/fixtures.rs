//! Publication fixtures written to temporary directories.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const MIMETYPE: &str = "application/epub+zip";

pub const CHAPTER: &str = "<html><head><title>Chapter 1</title></head>\
<body><h1>Loomings</h1><p>Call me Ishmael.</p></body></html>";

/// Writes a minimal EPUB with a stored `mimetype` and a deflated chapter.
///
/// The `TempDir` must be kept alive for the path to remain valid.
pub fn epub() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("book.epub");
    let mut writer = zip::ZipWriter::new(File::create(&path).expect("create epub"));
    writer
        .start_file(
            "mimetype",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .expect("start mimetype");
    writer.write_all(MIMETYPE.as_bytes()).expect("write mimetype");
    writer
        .start_file(
            "OEBPS/chapter1.xhtml",
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        )
        .expect("start chapter");
    writer.write_all(CHAPTER.as_bytes()).expect("write chapter");
    writer.finish().expect("finish epub");
    (dir, path)
}

/// Writes the same publication as an exploded directory.
pub fn exploded() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    std::fs::write(dir.path().join("mimetype"), MIMETYPE).expect("write mimetype");
    std::fs::create_dir_all(dir.path().join("OEBPS")).expect("create OEBPS");
    std::fs::write(dir.path().join("OEBPS/chapter1.xhtml"), CHAPTER).expect("write chapter");
    dir
}

/// Deterministic binary content of `len` bytes.
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
