//! In-memory fetcher
//!
//! Routes registered ahead of time, with per-URL request counters. Clones
//! share routes and counters.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::{Fetcher, NetError, Response};

#[derive(Debug, Clone)]
enum Route {
    Respond(Response),
    Fail(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    routes: HashMap<String, Route>,
    requests: HashMap<String, usize>,
    latency: Option<Duration>,
}

/// Fetcher backed by a route table
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200
    pub fn route(&self, url: &str, body: &str) -> &Self {
        self.respond(url, Response::ok_with(body))
    }

    /// Serve an arbitrary response
    pub fn respond(&self, url: &str, response: Response) -> &Self {
        self.state.borrow_mut().routes.insert(url.to_string(), Route::Respond(response));
        self
    }

    /// Fail with a transport error
    pub fn fail(&self, url: &str, message: &str) -> &Self {
        self.state.borrow_mut().routes.insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    pub fn unroute(&self, url: &str) {
        self.state.borrow_mut().routes.remove(url);
    }

    /// Delay every response with a timer
    pub fn set_latency(&self, latency: Duration) {
        self.state.borrow_mut().latency = Some(latency);
    }

    /// How many times `url` was fetched
    pub fn requests(&self, url: &str) -> usize {
        self.state.borrow().requests.get(url).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.state.borrow().requests.values().sum()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Response, NetError>> {
        let (route, latency) = {
            let mut state = self.state.borrow_mut();
            *state.requests.entry(url.to_string()).or_default() += 1;
            (state.routes.get(url).cloned(), state.latency)
        };
        tracing::debug!("Memory fetch {}", url);

        async move {
            match latency {
                Some(latency) => {
                    smol::Timer::after(latency).await;
                }
                // Resolve on a later poll so concurrent callers overlap
                None => smol::future::yield_now().await,
            }
            match route {
                Some(Route::Respond(response)) => Ok(response),
                Some(Route::Fail(message)) => Err(NetError::Network(message)),
                None => Ok(Response::with_status(404, "Not Found", Vec::new())),
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_counters() {
        let fetcher = MemoryFetcher::new();
        fetcher.route("/a.html", "<p>a</p>").fail("/b.html", "connection reset");

        smol::block_on(async {
            let a = fetcher.fetch("/a.html").await.unwrap();
            assert_eq!(a.text().unwrap(), "<p>a</p>");

            let b = fetcher.fetch("/b.html").await;
            assert_eq!(b, Err(NetError::Network("connection reset".into())));

            let missing = fetcher.fetch("/missing.html").await.unwrap();
            assert_eq!(missing.status, 404);
        });

        assert_eq!(fetcher.requests("/a.html"), 1);
        assert_eq!(fetcher.total_requests(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let fetcher = MemoryFetcher::new();
        let clone = fetcher.clone();
        clone.route("/x", "x");

        smol::block_on(fetcher.fetch("/x")).unwrap();
        assert_eq!(clone.requests("/x"), 1);
    }
}
