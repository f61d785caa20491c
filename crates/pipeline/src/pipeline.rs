use crate::error::{ErrorKind, Result};
use crate::event::{Event, Match, Stats};
use crate::query::Query;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use ziptrawl_archive::error::ErrorKind as ArchiveErrorKind;
use ziptrawl_archive::ArchiveScanner;
use ziptrawl_cache::ContentCache;
use ziptrawl_dates::DateRangeFilter;
use ziptrawl_storage::error::ErrorKind as StorageErrorKind;
use ziptrawl_storage::{CredentialRouter, RetryPolicy, StoreHandle, TreeWalker};

/// Crawl, filter, cache and scan.
///
/// Holds everything that outlives a single search; each call to
/// [`run()`](Self::run) opens its own remote session.
#[derive(Clone)]
pub struct Pipeline {
    store: StoreHandle,
    credentials: CredentialRouter,
    cache: ContentCache,
    retry: RetryPolicy,
}
impl Pipeline {
    pub fn new(store: StoreHandle, credentials: CredentialRouter, cache: ContentCache) -> Self {
        Self {
            store,
            credentials,
            cache,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for opening the session and for retrieving files.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Streams [`Event`]s for every archive entry under the query's root that
    /// matches its terms, in depth-first traversal order.
    ///
    /// Credentials are resolved before anything is contacted. Files whose
    /// name falls outside the date range are never retrieved; every other
    /// file is served from the cache or retrieved and cached. Nothing runs
    /// until the stream is polled, and dropping the stream closes the remote
    /// session.
    ///
    /// Archives and entries that can't be read are reported as skip events.
    /// Failing to connect, walk, retrieve or cache ends the stream with an
    /// error.
    pub fn run<'a>(&'a self, query: &'a Query) -> impl Stream<Item = Result<Event>> + 'a {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let root = query.root();
            let filter = DateRangeFilter::new(query.dates().copied());
            let mut stats = Stats::default();

            let credentials = match self.credentials.resolve(root).or_raise(|| ErrorKind::Credentials(root.to_string())) {
                Ok(credentials) => credentials,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let session = match self
                .retry
                .retry("open", || self.store.open(credentials))
                .await
                .or_raise(|| ErrorKind::Connect(self.store.name().to_string()))
            {
                Ok(session) => session,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let mut walker = match TreeWalker::start(session, root).await.or_raise(|| ErrorKind::Walk(root.to_string())) {
                Ok(walker) => walker,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            tracing::info!(root = %walker.root(), user = %credentials.user, dates = ?query.dates(), terms = %query.terms(), "Searching");

            loop {
                let entry = match walker.next_entry().await.or_raise(|| ErrorKind::Walk(root.to_string())) {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                stats.visited += 1;
                if !filter.matches(&entry.name) {
                    tracing::trace!(path = %entry, "Outside date range");
                    stats.filtered += 1;
                    continue;
                }

                let path = entry.path();
                let bytes = match self.fetch(&mut walker, &path, &mut stats).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                let scanner = match ArchiveScanner::open(bytes, query.terms()) {
                    Ok(scanner) => scanner,
                    Err(e) => {
                        let kind: &ArchiveErrorKind = &e;
                        tracing::warn!(path = %path, error = %kind, "Skipping archive");
                        yield Ok(Event::ArchiveSkipped { path, reason: kind.to_string() });
                        continue;
                    },
                };
                for result in scanner {
                    match result {
                        Ok(found) => {
                            stats.matches += 1;
                            yield Ok(Event::Match(Match {
                                path: path.clone(),
                                entry: found.name,
                                content: found.content,
                            }));
                        },
                        Err(e) => {
                            let kind: &ArchiveErrorKind = &e;
                            tracing::warn!(path = %path, error = %kind, "Skipping archive entry");
                            yield Ok(Event::EntrySkipped {
                                path: path.clone(),
                                entry: entry_name(kind),
                                reason: kind.to_string(),
                            });
                        },
                    }
                }
            }

            // Everything has been delivered; a failed goodbye doesn't change that.
            if let Err(e) = walker.session_mut().close().await {
                let kind: &StorageErrorKind = &e;
                tracing::warn!(error = %kind, "Could not close remote session cleanly");
            }
            tracing::info!(%stats, "Search finished");
            yield Ok(Event::Finished(stats));
        })
    }

    /// Cached bytes of `path`, or the remote file (which is then cached).
    async fn fetch(&self, walker: &mut TreeWalker, path: &str, stats: &mut Stats) -> Result<Vec<u8>> {
        let cached = self.cache.load(path).await.or_raise(|| ErrorKind::Cache(path.to_string()))?;
        if let Some(bytes) = cached {
            tracing::debug!(path, "Cache hit");
            stats.cache_hits += 1;
            return Ok(bytes);
        }

        // The walker's session is borrowed exclusively, so this can't go
        // through `RetryPolicy::retry()`.
        let mut attempt = 1;
        let bytes = loop {
            match walker.session_mut().retrieve(path).await {
                Ok(bytes) => break bytes,
                Err(err) if self.retry.should_retry(attempt, err.is_retryable()) => {
                    let delay = self.retry.delay(attempt);
                    let kind: &StorageErrorKind = &err;
                    tracing::warn!(path, attempt, delay_ms = delay.as_millis() as u64, error = %kind, "Retrying fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err.raise(ErrorKind::Fetch(path.to_string()))),
            }
        };
        stats.fetched += 1;

        let evicted = self.cache.store(path, &bytes).await.or_raise(|| ErrorKind::Cache(path.to_string()))?;
        if !evicted.is_empty() {
            tracing::debug!(path, evicted = evicted.len(), "Cache full, evicted oldest archives");
        }
        Ok(bytes)
    }
}

fn entry_name(kind: &ArchiveErrorKind) -> String {
    match kind {
        ArchiveErrorKind::EntryRead(name) | ArchiveErrorKind::EntryDecode(name) => name.clone(),
        _ => String::new(),
    }
}
