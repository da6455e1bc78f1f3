//! Edge case tests for fos-net
//!
//! Filesystem fetching and source cache behaviour over real I/O.

use std::rc::Rc;

use fos_net::*;

#[test]
fn test_file_fetcher_reads_under_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("c")).unwrap();
    std::fs::write(dir.path().join("c/card.html"), "<template><p>card</p></template>").unwrap();

    let fetcher = FileFetcher::new(dir.path());
    let response = smol::block_on(fetcher.fetch("/c/card.html")).unwrap();
    assert!(response.ok());
    assert_eq!(response.text().unwrap(), "<template><p>card</p></template>");
}

#[test]
fn test_file_fetcher_missing_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = FileFetcher::new(dir.path());

    let response = smol::block_on(fetcher.fetch("/nope.html")).unwrap();
    assert_eq!(response.status, 404);
}

#[test]
fn test_file_url_identifier() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.html"), "x").unwrap();
    let fetcher = FileFetcher::new(dir.path());

    let response = smol::block_on(fetcher.fetch("file:///x.html")).unwrap();
    assert_eq!(response.body, b"x");
}

#[test]
fn test_source_cache_over_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.html"), "a").unwrap();
    let cache = SourceCache::new("source", Rc::new(FileFetcher::new(dir.path())));

    assert_eq!(&*smol::block_on(cache.get("/a.html")).unwrap(), "a");

    // Cached text survives the file changing
    std::fs::write(dir.path().join("a.html"), "changed").unwrap();
    assert_eq!(&*smol::block_on(cache.get("/a.html")).unwrap(), "a");

    cache.invalidate("/a.html");
    assert_eq!(&*smol::block_on(cache.get("/a.html")).unwrap(), "changed");
}

#[test]
fn test_source_cache_missing_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SourceCache::new("fallback", Rc::new(FileFetcher::new(dir.path())));

    let err = smol::block_on(cache.get("/gone.html")).unwrap_err();
    assert_eq!(err, NetError::Http { status: 404, status_text: "Not Found".into() });
    assert!(cache.is_empty());
}

#[test]
fn test_latency_still_deduplicates() {
    let fetcher = MemoryFetcher::new();
    fetcher.route("/slow", "done");
    fetcher.set_latency(std::time::Duration::from_millis(5));
    let cache = SourceCache::new("source", Rc::new(fetcher.clone()));

    let futures: Vec<_> = (0..4).map(|_| cache.get("/slow")).collect();
    let results = smol::block_on(futures::future::join_all(futures));
    assert!(results.iter().all(|r| r.as_deref() == Ok("done")));
    assert_eq!(fetcher.requests("/slow"), 1);
}
