//! Integration tests for archive backends and archive-backed resources.

mod support;

use std::sync::Arc;

use pubfetch::{
    Archive, ArchiveFactory, ArchiveFetcher, ArchiveResource, DefaultArchiveFactory, Fetcher, Link,
    Resource, ResourceError, ResourceExt, ZipArchive,
};
use support::fixtures::{self, CHAPTER, MIMETYPE};

#[tokio::test]
async fn test_zip_mimetype_ranges() {
    let (_dir, path) = fixtures::epub();
    let fetcher = ArchiveFetcher::open(path, None).await.unwrap();
    let resource = fetcher.get(&Link::new("/mimetype"));

    assert_eq!(resource.read(Some(0..11)).await.unwrap().as_ref(), b"application");
    assert_eq!(
        resource.read(Some(5..60)).await.unwrap().as_ref(),
        b"cation/epub+zip"
    );
    assert_eq!(resource.read(None).await.unwrap().as_ref(), MIMETYPE.as_bytes());
    assert_eq!(resource.length().await.unwrap(), 20);
    assert!(resource.file().is_none());
}

#[tokio::test]
async fn test_zip_unknown_entry_is_not_found_every_time() {
    let (_dir, path) = fixtures::epub();
    let fetcher = ArchiveFetcher::open(path, None).await.unwrap();
    let resource = fetcher.get(&Link::new("/unknown"));

    for _ in 0..2 {
        assert!(matches!(
            resource.read(None).await,
            Err(ResourceError::NotFound)
        ));
        assert!(matches!(
            resource.length().await,
            Err(ResourceError::NotFound)
        ));
    }
}

#[tokio::test]
async fn test_deflated_subranges_match_whole_read() {
    let (_dir, path) = fixtures::epub();
    let fetcher = ArchiveFetcher::open(path, None).await.unwrap();
    let resource = fetcher.get(&Link::new("/OEBPS/chapter1.xhtml"));

    let whole = resource.read(None).await.unwrap();
    assert_eq!(whole.as_ref(), CHAPTER.as_bytes());
    for range in [0..1, 10..40, 50..whole.len() as u64, 0..whole.len() as u64] {
        let start = usize::try_from(range.start).unwrap();
        let end = usize::try_from(range.end).unwrap();
        assert_eq!(
            resource.read(Some(range.clone())).await.unwrap(),
            whole.slice(start..end),
            "range {range:?}"
        );
    }
    assert!(resource.read(Some(10_000..20_000)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exploded_and_zip_expose_same_entries() {
    let (_zip_dir, zip_path) = fixtures::epub();
    let exploded_dir = fixtures::exploded();
    let factory = DefaultArchiveFactory::new();

    let zip = factory.open(&zip_path, None).unwrap();
    let exploded = factory.open(exploded_dir.path(), None).unwrap();

    let zip_paths: Vec<_> = zip.entries().into_iter().map(|e| e.path).collect();
    let exploded_paths: Vec<_> = exploded.entries().into_iter().map(|e| e.path).collect();
    assert_eq!(zip_paths, exploded_paths);
    assert_eq!(
        zip.read("/OEBPS/chapter1.xhtml", None).unwrap(),
        exploded.read("/OEBPS/chapter1.xhtml", None).unwrap()
    );
}

#[tokio::test]
async fn test_exploded_resource_exposes_file() {
    let dir = fixtures::exploded();
    let fetcher = ArchiveFetcher::open(dir.path().to_path_buf(), None)
        .await
        .unwrap();
    let resource = fetcher.get(&Link::new("/OEBPS/chapter1.xhtml"));
    assert_eq!(
        resource.file().unwrap(),
        dir.path().join("OEBPS/chapter1.xhtml")
    );
    assert_eq!(resource.read_as_string().await.unwrap(), CHAPTER);
}

#[tokio::test]
async fn test_replace_then_read_through_resource() {
    let (_dir, path) = fixtures::epub();
    let archive: Arc<dyn Archive> = Arc::new(ZipArchive::open(&path, None).unwrap());
    archive
        .as_mutable()
        .unwrap()
        .replace("/OEBPS/notes.txt", b"marginalia", true)
        .unwrap();

    let resource = ArchiveResource::new(
        Link::new("/OEBPS/notes.txt"),
        Arc::clone(&archive),
        "/OEBPS/notes.txt",
    );
    assert_eq!(resource.read(Some(0..6)).await.unwrap().as_ref(), b"margin");
    assert!(archive.entry("/OEBPS/notes.txt").unwrap().is_compressed);
}

#[tokio::test]
async fn test_closed_archive_reads_fail() {
    let (_dir, path) = fixtures::epub();
    let fetcher = ArchiveFetcher::open(path, None).await.unwrap();
    let resource = fetcher.get(&Link::new("/mimetype"));
    fetcher.close();
    assert!(matches!(
        resource.read(None).await,
        Err(ResourceError::Other(_))
    ));
}

#[tokio::test]
async fn test_open_missing_path_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = ArchiveFetcher::open(dir.path().join("missing.epub"), None).await;
    assert!(result.is_err());
}
