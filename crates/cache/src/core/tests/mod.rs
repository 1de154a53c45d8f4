//! Unit tests for the cache facade and collector internals

use super::types::FileCache;
use crate::config::CacheConfig;
use crate::keys::KeyStem;
use crate::policy;
use crate::streaming::stage_from;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

async fn cache_in(temp_dir: &TempDir) -> FileCache<str> {
    filestash_utils::tracing::init_for_tests();
    let config = CacheConfig::builder()
        .with_base_dir(temp_dir.path())
        .with_staging_grace(Duration::ZERO)
        .build()
        .unwrap();
    FileCache::new(config).await.unwrap()
}

async fn put(cache: &FileCache<str>, key: &str, payload: &'static [u8]) {
    cache
        .add_or_update_stream(key, payload, &CancellationToken::new(), None)
        .await
        .unwrap();
}

async fn read(cache: &FileCache<str>, key: &str) -> Option<Vec<u8>> {
    let mut reader = cache
        .try_get_stream(key, &CancellationToken::new())
        .await
        .unwrap()?;
    let mut content = Vec::new();
    reader.read_to_end(&mut content).await.unwrap();
    Some(content)
}

#[tokio::test]
async fn test_commit_into_invalidated_epoch_is_not_published() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();
    let inner = &cache.inner;

    let epoch = inner.epochs.current();
    let stem = KeyStem::of("k").unwrap();
    let mut source: &[u8] = b"late write";
    let staged = stage_from(&epoch, &stem, &mut source, &cancel, 1024, false)
        .await
        .unwrap();

    cache.invalidate_all(&cancel).await.unwrap();

    let committed = inner
        .commit(&epoch, &stem, staged, None, &cancel)
        .await
        .unwrap();
    assert!(committed.path.exists());
    assert!(read(&cache, "k").await.is_none());

    // The retired epoch survives while the writer still holds it
    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.epochs_removed, 0);
    assert!(committed.path.exists());

    drop(epoch);
    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.epochs_removed, 1);
    assert!(!committed.path.exists());
}

#[tokio::test]
async fn test_collection_during_epoch_swap_keeps_next_epoch() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();
    let inner = &cache.inner;

    let next = inner.epochs.prepare().await.unwrap();
    let next_root = next.root();

    // A pass between creating and installing the next epoch
    let report = inner.collect(&cancel).await.unwrap();
    assert_eq!(report.epochs_removed, 0);
    assert!(next_root.is_dir());

    inner.catalog.reset(|| inner.epochs.install(next));
    assert_eq!(cache.current_epoch_dir(), next_root);
    assert!(cache.current_epoch_dir().is_dir());

    put(&cache, "k", b"after swap").await;
    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.epochs_removed, 1);
    assert!(cache.current_epoch_dir().is_dir());
    assert_eq!(read(&cache, "k").await.unwrap(), b"after swap");
}

#[tokio::test]
async fn test_abandoned_epoch_swap_is_collected() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    let next = cache.inner.epochs.prepare().await.unwrap();
    let next_root = next.root();
    drop(next);

    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.epochs_removed, 1);
    assert!(!next_root.exists());
    assert!(cache.current_epoch_dir().is_dir());
}

#[tokio::test]
async fn test_collector_skips_busy_keys() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    cache
        .add_or_update_stream(
            "k",
            &b"payload"[..],
            &cancel,
            Some(policy::absolute(SystemTime::now() - Duration::from_secs(1))),
        )
        .await
        .unwrap();

    let stem = KeyStem::of("k").unwrap();
    let guard = cache.inner.catalog.key_lock(&stem).lock_owned().await;

    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.busy_keys, 1);
    assert_eq!(report.expired_evicted, 0);
    assert_eq!(cache.len(), 1);

    drop(guard);
    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.expired_evicted, 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_externally_deleted_file_reads_as_miss() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    put(&cache, "k", b"payload").await;
    let path = cache
        .inner
        .catalog
        .lookup(&KeyStem::of("k").unwrap())
        .unwrap()
        .path;
    std::fs::remove_file(&path).unwrap();

    assert!(read(&cache, "k").await.is_none());

    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.dangling_dropped, 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_foreign_and_orphaned_files_are_swept() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    put(&cache, "kept", b"payload").await;
    let epoch = cache.inner.epochs.current();
    let orphan = epoch.committed_path(&KeyStem::of("gone").unwrap());
    std::fs::write(&orphan, b"orphan").unwrap();
    std::fs::write(epoch.objects_dir().join("stray.txt"), b"stray").unwrap();
    std::fs::write(epoch.graveyard_dir().join("buried"), b"old").unwrap();

    let report = cache.garbage_collect(&cancel).await.unwrap();

    assert_eq!(report.orphans_deleted, 2);
    assert_eq!(report.graveyard_deleted, 1);
    assert!(!orphan.exists());
    assert_eq!(read(&cache, "kept").await.unwrap(), b"payload");
}

#[tokio::test]
async fn test_young_staging_files_survive_grace_period() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::builder()
        .with_base_dir(temp_dir.path())
        .with_staging_grace(Duration::from_secs(3600))
        .build()
        .unwrap();
    let cache: FileCache<str> = FileCache::new(config).await.unwrap();
    let cancel = CancellationToken::new();

    let staging = cache.inner.epochs.current().staging_dir().join("in-flight");
    std::fs::write(&staging, b"partial").unwrap();

    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.staging_deleted, 0);
    assert!(staging.exists());
}

#[tokio::test]
async fn test_cancelled_collection_keeps_progress() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;

    cache
        .add_or_update_stream(
            "k",
            &b"payload"[..],
            &CancellationToken::new(),
            Some(policy::absolute(SystemTime::now() - Duration::from_secs(1))),
        )
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = cache.garbage_collect(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    // Cancelled before the first phase
    assert_eq!(cache.len(), 1);

    // Cancellation is not counted as an error
    assert_eq!(cache.statistics().errors, 0);
}

#[tokio::test]
async fn test_idle_locks_are_pruned() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    for key in ["a", "b", "c"] {
        put(&cache, key, b"x").await;
    }
    assert_eq!(cache.inner.catalog.lock_count(), 3);

    let report = cache.garbage_collect(&cancel).await.unwrap();
    assert_eq!(report.locks_pruned, 3);
    assert_eq!(cache.inner.catalog.lock_count(), 0);
    assert_eq!(read(&cache, "a").await.unwrap(), b"x");
}

#[tokio::test]
async fn test_statistics_track_operations() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_in(&temp_dir).await;
    let cancel = CancellationToken::new();

    assert!(read(&cache, "k").await.is_none());
    put(&cache, "k", b"abc").await;
    assert!(read(&cache, "k").await.is_some());
    assert!(cache.invalidate("k", &cancel).await.unwrap());

    let stats = cache.statistics();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.bytes_written, 3);
    assert_eq!(stats.invalidations, 1);
    assert_eq!(stats.entry_count, 0);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_background_collection_evicts_expired_entries() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::builder()
        .with_base_dir(temp_dir.path())
        .with_gc_interval(Some(Duration::from_millis(20)))
        .build()
        .unwrap();
    let cache: FileCache<str> = FileCache::new(config).await.unwrap();

    cache
        .add_or_update_stream(
            "k",
            &b"payload"[..],
            &CancellationToken::new(),
            Some(policy::absolute_after(Duration::from_millis(10))),
        )
        .await
        .unwrap();

    let mut waited = Duration::ZERO;
    while !cache.is_empty() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert!(cache.is_empty());
    assert!(cache.statistics().expired_evictions >= 1);

    let handle_present = cache.inner.cleanup_handle.read().is_some();
    assert!(handle_present);
}
