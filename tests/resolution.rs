mod common;

use common::{FakeAudio, FakeMetadata};
use jukebox_bot::{
    cache::SearchCache,
    catalog::{CatalogClient, JsonCatalog},
    error::ResolutionFailure,
    sources::{AudioInfo, MetadataMatch, TrackResolver},
};
use pretty_assertions::assert_eq;
use serenity::model::id::UserId;
use std::sync::Arc;
use tempfile::TempDir;

const SOURCE_U: &str = "https://www.youtube.com/watch?v=U";

fn song_a() -> MetadataMatch {
    MetadataMatch {
        catalog_id: "X".to_string(),
        title: "Song A".to_string(),
        artist: "Artist".to_string(),
        thumbnail: Some("https://i.scdn.co/image/a".to_string()),
    }
}

fn video(url: &str, title: &str) -> AudioInfo {
    AudioInfo {
        canonical_url: url.to_string(),
        stream_url: format!("stream://{}", url),
        title: title.to_string(),
        thumbnail: None,
    }
}

struct Setup {
    _dir: TempDir,
    catalog: Arc<JsonCatalog>,
    metadata: Arc<FakeMetadata>,
    audio: Arc<FakeAudio>,
    resolver: TrackResolver,
}

async fn setup() -> Setup {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(JsonCatalog::new(dir.path().to_path_buf()).await.unwrap());
    let metadata = Arc::new(FakeMetadata::default());
    let audio = Arc::new(FakeAudio::default());

    let resolver = TrackResolver::new(
        catalog.clone(),
        metadata.clone(),
        audio.clone(),
        SearchCache::with_ttl_secs(16, 3600),
    );

    Setup {
        _dir: dir,
        catalog,
        metadata,
        audio,
        resolver,
    }
}

#[tokio::test]
async fn url_request_reuses_source_stored_by_text_request() {
    let s = setup().await;
    s.metadata.answer("Song A", song_a());
    s.audio.answer("Artist Song A", video(SOURCE_U, "Song A (Official Video)"));

    let first = s
        .resolver
        .resolve("Song A", "ana", UserId::new(7))
        .await
        .unwrap();
    assert_eq!(first.catalog_id, "X");
    assert_eq!(first.source_url, SOURCE_U);
    assert_eq!(s.audio.call_count(), 1);

    let stored = s.catalog.find_by_key("X").await.unwrap().unwrap();
    assert_eq!(stored.source_url, SOURCE_U);

    let url = "https://www.youtube.com/watch?v=other";
    s.audio.answer(url, video(url, "Song A"));

    let second = s
        .resolver
        .resolve(url, "bob", UserId::new(8))
        .await
        .unwrap();

    assert_eq!(second.catalog_id, "X");
    assert_eq!(second.source_url, SOURCE_U);
    assert_eq!(second.requester, "bob");
    // Sólo la consulta del título del video; el audio de X no se vuelve a resolver
    assert_eq!(
        *s.audio.calls.lock(),
        vec!["Artist Song A".to_string(), url.to_string()]
    );
}

#[tokio::test]
async fn repeated_query_hits_the_metadata_cache() {
    let s = setup().await;
    s.metadata.answer("Song A", song_a());

    s.resolver.resolve("Song A", "ana", UserId::new(7)).await.unwrap();
    s.resolver.resolve("  song   a ", "ana", UserId::new(7)).await.unwrap();

    assert_eq!(s.metadata.calls.lock().len(), 1);
    assert_eq!(s.resolver.cache().len(), 1);
}

#[tokio::test]
async fn stored_sources_survive_a_restart() {
    let s = setup().await;
    s.metadata.answer("Song A", song_a());
    s.audio.answer("Artist Song A", video(SOURCE_U, "Song A"));
    s.resolver.resolve("Song A", "ana", UserId::new(7)).await.unwrap();

    let reloaded = JsonCatalog::new(s._dir.path().to_path_buf()).await.unwrap();
    let record = reloaded.find_by_key("X").await.unwrap().unwrap();

    assert_eq!(record.source_url, SOURCE_U);
    assert_eq!(record.requester, "ana");
    assert_eq!(record.requester_id, 7);
}

#[tokio::test]
async fn unknown_song_is_a_resolution_failure() {
    let s = setup().await;

    let err = s
        .resolver
        .resolve("nothing like this", "ana", UserId::new(7))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ResolutionFailure::NoMetadata("nothing like this".to_string())
    );
    assert!(s.catalog.is_empty());
}

#[tokio::test]
async fn missing_audio_is_a_resolution_failure() {
    let s = setup().await;
    s.metadata.answer("Song A", song_a());
    s.audio.kill("Artist Song A");

    let err = s
        .resolver
        .resolve("Song A", "ana", UserId::new(7))
        .await
        .unwrap_err();

    assert_eq!(err, ResolutionFailure::NoAudio("Artist Song A".to_string()));
    assert!(s.catalog.is_empty());
}
