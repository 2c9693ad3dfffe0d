//! Fetcher serving files from the local filesystem.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use super::{Fetcher, rooted};
use crate::link::Link;
use crate::media_type;
use crate::resource::{FailureResource, FileResource, Resource};

/// Fetcher mapping hrefs to local paths.
///
/// Each mapping binds an href to a file or a directory. A directory mapping
/// also serves every href below it, but never a path escaping the directory
/// with `..`.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    paths: Vec<(String, PathBuf)>,
}

impl FileFetcher {
    /// Creates a fetcher without any mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher serving `directory` at the root href `/`.
    pub fn from_directory(directory: impl Into<PathBuf>) -> Self {
        Self::new().with_path("/", directory)
    }

    /// Adds a mapping from `href` to `path`.
    #[must_use]
    pub fn with_path(mut self, href: &str, path: impl Into<PathBuf>) -> Self {
        self.paths.push((rooted(href), path.into()));
        self
    }

    fn resolve(&self, href: &str) -> Option<PathBuf> {
        for (prefix, path) in &self.paths {
            if href == prefix {
                return Some(path.clone());
            }
            let prefix = prefix.trim_end_matches('/');
            let Some(rest) = href.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) else {
                continue;
            };
            if !path.is_dir() {
                continue;
            }
            let relative = Path::new(rest);
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                warn!(href, "refusing href escaping the mapped directory");
                return None;
            }
            return Some(path.join(relative));
        }
        None
    }
}

impl Fetcher for FileFetcher {
    fn links(&self) -> Vec<Link> {
        let mut links = Vec::new();
        for (href, path) in &self.paths {
            if path.is_file() {
                links.push(link_for(href.clone()));
                continue;
            }
            let base = href.trim_end_matches('/');
            for entry in jwalk::WalkDir::new(path).sort(true).into_iter().flatten() {
                if !entry.file_type().is_file() {
                    continue;
                }
                let entry_path = entry.path();
                let Ok(relative) = entry_path.strip_prefix(path) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                links.push(link_for(format!("{base}/{relative}")));
            }
        }
        links
    }

    fn get(&self, link: &Link) -> Box<dyn Resource> {
        let href = rooted(&link.href_path());
        match self.resolve(&href) {
            Some(path) => Box::new(FileResource::new(link.clone(), path)),
            None => Box::new(FailureResource::not_found(link.clone())),
        }
    }
}

fn link_for(href: String) -> Link {
    let media_type = media_type::guess_from_path(&href);
    let link = Link::new(href);
    match media_type {
        Some(media_type) => link.with_media_type(media_type.essence_str()),
        None => link,
    }
}
