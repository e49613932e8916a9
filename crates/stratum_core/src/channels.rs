//! Integration channel lookup behind a one-shot gate.
//!
//! The channel list of an integration tool is loaded at most once per cache.
//! The first caller performs the load; callers arriving while it runs block
//! until it finishes and then share its outcome, including a failed one.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use stratum_modules::ResolverError;
use tracing::{debug, warn};

/// A notification channel of an integration tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Where channel lists are fetched from.
#[cfg_attr(test, mockall::automock)]
pub trait ChannelSource: Send + Sync {
    fn list_channels(&self, tool: &str) -> Result<Vec<Channel>, ResolverError>;
}

type Loaded = Result<Arc<Vec<Channel>>, ResolverError>;

/// Exactly-once cache of one tool's channel list.
pub struct ChannelCache<'a> {
    tool: String,
    source: &'a dyn ChannelSource,
    loaded: OnceLock<Loaded>,
}

impl<'a> ChannelCache<'a> {
    pub fn new(tool: impl Into<String>, source: &'a dyn ChannelSource) -> Self {
        Self {
            tool: tool.into(),
            source,
            loaded: OnceLock::new(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// The channel list, loading it on first use.
    pub fn channels(&self) -> Result<Arc<Vec<Channel>>, ResolverError> {
        self.loaded
            .get_or_init(|| {
                debug!("Loading {} channels", self.tool);
                match self.source.list_channels(&self.tool) {
                    Ok(channels) => Ok(Arc::new(channels)),
                    Err(e) => {
                        warn!("Failed to load {} channels: {}", self.tool, e);
                        Err(e)
                    }
                }
            })
            .clone()
    }

    /// Look a channel up by name. A leading `#` is ignored.
    pub fn find(&self, name: &str) -> Result<Option<Channel>, ResolverError> {
        let wanted = name.trim_start_matches('#');
        Ok(self.channels()?.iter().find(|c| c.name == wanted).cloned())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct SlowSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ChannelSource for SlowSource {
        fn list_channels(&self, _tool: &str) -> Result<Vec<Channel>, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            if self.fail {
                return Err(ResolverError::Timeout {
                    service: "slack".into(),
                });
            }
            Ok(vec![Channel {
                id: "C1".into(),
                name: "deploys".into(),
            }])
        }
    }

    #[test]
    fn test_concurrent_callers_share_one_load() {
        let source = SlowSource {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let cache = ChannelCache::new("slack", &source);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.channels())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
    }

    #[test]
    fn test_failed_load_is_shared() {
        let source = SlowSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let cache = ChannelCache::new("slack", &source);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.channels())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Err(ResolverError::Timeout { .. }))));
        assert!(cache.channels().is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_find_by_name() {
        let mut source = MockChannelSource::new();
        source.expect_list_channels().times(1).returning(|_| {
            Ok(vec![Channel {
                id: "C1".into(),
                name: "deploys".into(),
            }])
        });
        let cache = ChannelCache::new("slack", &source);
        assert!(!cache.is_loaded());
        assert_eq!(cache.find("#deploys").unwrap().map(|c| c.id), Some("C1".into()));
        assert!(cache.find("alerts").unwrap().is_none());
        assert!(cache.is_loaded());
    }
}
