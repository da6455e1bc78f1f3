//! Resource Loader
//!
//! The fetcher seam and a filesystem-backed fetcher.

use std::path::{Component, PathBuf};

use futures::future::{FutureExt, LocalBoxFuture};
use url::Url;

use crate::{NetError, Response};

/// Loads a source identifier into a response.
///
/// Futures are `'static` so callers can memoize and share them.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Response, NetError>>;
}

/// Serves `/path` and `file://` identifiers from a directory
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &std::path::Path {
        &self.base
    }

    /// Map an identifier to a path under the base directory. Dot segments
    /// are resolved first, so nothing escapes the base.
    pub fn resolve(&self, id: &str) -> Result<PathBuf, NetError> {
        let url = if id.starts_with("file:") {
            Url::parse(id)
        } else {
            Url::parse("file:///").and_then(|root| root.join(id))
        }
        .map_err(|e| NetError::InvalidUrl(format!("{}: {}", id, e)))?;

        if url.scheme() != "file" {
            return Err(NetError::InvalidUrl(id.to_string()));
        }
        let path = url.to_file_path()
            .map_err(|_| NetError::InvalidUrl(id.to_string()))?;

        let mut resolved = self.base.clone();
        for component in path.components() {
            if let Component::Normal(part) = component {
                resolved.push(part);
            }
        }
        Ok(resolved)
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Response, NetError>> {
        let path = self.resolve(url);
        let url = url.to_string();
        async move {
            let path = path?;
            tracing::info!("GET {} -> {}", url, path.display());
            match smol::fs::read(&path).await {
                Ok(body) => Ok(Response::ok_with(body)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Ok(Response::with_status(404, "Not Found", Vec::new()))
                }
                Err(e) => Err(NetError::Network(format!("{}: {}", url, e))),
            }
        }
        .boxed_local()
    }
}
