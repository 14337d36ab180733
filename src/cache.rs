use std::{fmt::Display, marker::PhantomData, path::PathBuf};

use async_trait::async_trait;
use cached::IOCachedAsync;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::SummaryError,
    source::{ChopperIntervals, ChopperRequest, DataSource, SignalRequest, TimeSeries},
};

/// Disk cache for one value type, entries never expire.
pub struct CacacheBackend<K, V> {
    root: PathBuf,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> CacacheBackend<K, V> {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<K, V> IOCachedAsync<K, V> for CacacheBackend<K, V>
where
    K: Display + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    type Error = SummaryError;

    async fn cache_get(&self, key: &K) -> Result<Option<V>, Self::Error> {
        match cacache::read(&self.root, key.to_string()).await {
            Ok(bytes) => Ok(Some(bincode::deserialize::<V>(&bytes)?)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrites without reading the previous entry, so always `Ok(None)`.
    async fn cache_set(&self, key: K, val: V) -> Result<Option<V>, Self::Error> {
        let bytes = bincode::serialize(&val)?;
        cacache::write(&self.root, key.to_string(), bytes).await?;
        Ok(None)
    }

    async fn cache_remove(&self, key: &K) -> Result<Option<V>, Self::Error> {
        let prev = self.cache_get(key).await?;
        cacache::remove(&self.root, key.to_string()).await?;
        Ok(prev)
    }

    fn cache_set_refresh(&mut self, _refresh: bool) -> bool {
        false
    }
}

/// Keeps every retrieval of the wrapped source on disk, keyed by the full
/// request and by `namespace`, which names the wrapped source (its data root).
pub struct CachedSource<S> {
    inner: S,
    namespace: String,
    chopper: CacacheBackend<String, ChopperIntervals>,
    signals: CacacheBackend<String, TimeSeries>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S, root: PathBuf, namespace: impl Display) -> Self {
        Self {
            inner,
            namespace: namespace.to_string(),
            chopper: CacacheBackend::new(root.join("chopper")),
            signals: CacacheBackend::new(root.join("signal")),
        }
    }

    fn chopper_key(&self, request: &ChopperRequest) -> String {
        format!(
            "chopper({},{},{},{},{},{})",
            self.namespace,
            request.exp_id,
            request.state,
            request.deflection,
            request.start_offset_us,
            request.end_offset_us
        )
    }

    fn signal_key(&self, request: &SignalRequest) -> String {
        format!(
            "signal({},{},{},{:?},{:?})",
            self.namespace, request.exp_id, request.channel, request.time_range, request.options
        )
    }
}

#[async_trait]
impl<S: DataSource> DataSource for CachedSource<S> {
    async fn chopper_intervals(
        &self,
        request: &ChopperRequest,
    ) -> Result<ChopperIntervals, SummaryError> {
        let key = self.chopper_key(request);
        if let Some(hit) = self.chopper.cache_get(&key).await? {
            log::debug!("cache hit: {key}");
            return Ok(hit);
        }
        let intervals = self.inner.chopper_intervals(request).await?;
        self.chopper.cache_set(key, intervals.clone()).await?;
        Ok(intervals)
    }

    async fn channel_signal(&self, request: &SignalRequest) -> Result<TimeSeries, SummaryError> {
        let key = self.signal_key(request);
        if let Some(hit) = self.signals.cache_get(&key).await? {
            log::debug!("cache hit: {key}");
            return Ok(hit);
        }
        let series = self.inner.channel_signal(request).await?;
        self.signals.cache_set(key, series.clone()).await?;
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::{
        directory::DirectorySource,
        source::{testing::MemorySource, BeamState, SignalOptions},
    };

    use super::*;

    struct Counting {
        inner: MemorySource,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for Counting {
        async fn chopper_intervals(
            &self,
            request: &ChopperRequest,
        ) -> Result<ChopperIntervals, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.chopper_intervals(request).await
        }

        async fn channel_signal(
            &self,
            request: &SignalRequest,
        ) -> Result<TimeSeries, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.channel_signal(request).await
        }
    }

    #[tokio::test]
    async fn second_request_is_served_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = MemorySource::default()
            .with_chopper("20230328.028", "Timed", &[(0.0, 1.0)], &[(1.0, 2.0)])
            .with_signal(
                "20230328.028",
                "ABES-10",
                TimeSeries::new(vec![0.0, 1.0], vec![0.5, 0.25]),
            );
        let source = CachedSource::new(
            Counting {
                inner: memory,
                calls: AtomicUsize::new(0),
            },
            tmp.path().to_owned(),
            "memory",
        );

        let chopper = ChopperRequest {
            exp_id: "20230328.028".to_owned(),
            state: BeamState::On,
            deflection: 0,
            start_offset_us: 1000.0,
            end_offset_us: -1000.0,
        };
        let signal = SignalRequest {
            exp_id: "20230328.028".to_owned(),
            channel: "ABES-10".to_owned(),
            time_range: None,
            options: SignalOptions::default(),
        };

        let first = source.chopper_intervals(&chopper).await.unwrap();
        let second = source.chopper_intervals(&chopper).await.unwrap();
        assert_eq!(first, second);

        let first = source.channel_signal(&signal).await.unwrap();
        let second = source.channel_signal(&signal).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let source = CachedSource::new(
            Counting {
                inner: MemorySource::default(),
                calls: AtomicUsize::new(0),
            },
            tmp.path().to_owned(),
            "memory",
        );
        let chopper = ChopperRequest {
            exp_id: "20230328.028".to_owned(),
            state: BeamState::Off,
            deflection: 0,
            start_offset_us: 0.0,
            end_offset_us: 0.0,
        };
        assert!(source.chopper_intervals(&chopper).await.is_err());
        assert!(source.chopper_intervals(&chopper).await.is_err());
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn data_roots_sharing_a_cache_dir_stay_apart() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_dir = tmp.path().join("cache");
        for (root, value) in [("a", "1.0"), ("b", "9.0")] {
            let dir = tmp.path().join(root).join("20230328.028");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("ABES-10.tsv"), format!("0.0\t{value}\n")).unwrap();
        }
        let signal = SignalRequest {
            exp_id: "20230328.028".to_owned(),
            channel: "ABES-10".to_owned(),
            time_range: None,
            options: SignalOptions {
                resample_hz: None,
                ..Default::default()
            },
        };

        let read = |root: &str| {
            let root = tmp.path().join(root);
            let source = CachedSource::new(
                DirectorySource::new(&root),
                cache_dir.clone(),
                root.display(),
            );
            let signal = signal.clone();
            async move { source.channel_signal(&signal).await.unwrap() }
        };

        assert_eq!(read("a").await.values, vec![1.0]);
        assert_eq!(read("b").await.values, vec![9.0]);
        assert_eq!(read("a").await.values, vec![1.0]);
    }

    #[tokio::test]
    async fn deflection_is_part_of_the_chopper_key() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = MemorySource::default().with_chopper(
            "20230328.028",
            "Timed",
            &[(0.0, 1.0)],
            &[(1.0, 2.0)],
        );
        let source = CachedSource::new(
            Counting {
                inner: memory,
                calls: AtomicUsize::new(0),
            },
            tmp.path().to_owned(),
            "memory",
        );
        let request = |deflection| ChopperRequest {
            exp_id: "20230328.028".to_owned(),
            state: BeamState::On,
            deflection,
            start_offset_us: 0.0,
            end_offset_us: 0.0,
        };

        source.chopper_intervals(&request(0)).await.unwrap();
        source.chopper_intervals(&request(1)).await.unwrap();
        source.chopper_intervals(&request(0)).await.unwrap();
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }
}
