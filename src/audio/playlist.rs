//! Playlist de relleno: cuando la cola de peticiones se vacía el motor sigue
//! sonando con canciones del catálogo, barajadas y sin repetir hasta agotar
//! la ronda.

use anyhow::Result;
use parking_lot::Mutex;
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::{
    catalog::{CatalogClient, CatalogRecord},
    config::FallbackMode,
};

/// Una ronda de barajado: lo ya sonado y lo que queda por sonar.
#[derive(Debug, Default)]
struct Rotation {
    history: Vec<CatalogRecord>,
    upcoming: VecDeque<CatalogRecord>,
    /// Último track terminado, venga de la cola o de la playlist.
    last_finished: Option<String>,
}

impl Rotation {
    fn last_played(&self) -> Option<&str> {
        self.last_finished
            .as_deref()
            .or_else(|| self.history.last().map(|r| r.catalog_id.as_str()))
    }

    /// Nueva ronda con todo el catálogo. El último track sonado nunca
    /// encabeza la ronda si hay más de uno.
    fn reshuffle<R: Rng>(&mut self, mut tracks: Vec<CatalogRecord>, rng: &mut R) {
        tracks.shuffle(rng);

        if tracks.len() > 1 {
            if let Some(last) = self.last_played() {
                if tracks[0].catalog_id == last {
                    let swap_with = rng.gen_range(1..tracks.len());
                    tracks.swap(0, swap_with);
                }
            }
        }

        // Conservamos sólo el último para la regla de no repetir
        let last = self.history.pop();
        self.history.clear();
        self.history.extend(last);
        self.upcoming = tracks.into();
    }

    fn pop_next(&mut self) -> Option<CatalogRecord> {
        // Una petición recién terminada no se repite como relleno inmediato
        if self.upcoming.len() > 1 {
            let repeats = self.upcoming.front().map(|r| r.catalog_id.as_str()) == self.last_played();
            if repeats {
                self.upcoming.swap(0, 1);
            }
        }

        let next = self.upcoming.pop_front()?;
        self.last_finished = Some(next.catalog_id.clone());
        self.history.push(next.clone());
        Some(next)
    }
}

/// Selección de tracks de relleno para un guild.
pub struct FallbackPlaylist {
    mode: FallbackMode,
    rotation: Mutex<Rotation>,
}

impl FallbackPlaylist {
    pub fn new(mode: FallbackMode) -> Self {
        Self {
            mode,
            rotation: Mutex::new(Rotation::default()),
        }
    }

    pub fn mode(&self) -> FallbackMode {
        self.mode
    }

    /// Siguiente track de relleno, o `None` si el catálogo está vacío.
    pub async fn next(&self, catalog: &dyn CatalogClient) -> Result<Option<CatalogRecord>> {
        match self.mode {
            FallbackMode::Shuffle => self.next_shuffled(catalog).await,
            FallbackMode::Random => {
                let last = self.last_played();
                let picked = catalog.random_or_next(last.as_deref()).await?;
                if let Some(record) = &picked {
                    // En modo aleatorio sólo importa el último
                    let mut rotation = self.rotation.lock();
                    rotation.history.clear();
                    rotation.history.push(record.clone());
                    rotation.last_finished = Some(record.catalog_id.clone());
                }
                Ok(picked)
            }
        }
    }

    async fn next_shuffled(&self, catalog: &dyn CatalogClient) -> Result<Option<CatalogRecord>> {
        if let Some(next) = self.rotation.lock().pop_next() {
            return Ok(Some(next));
        }

        let tracks = catalog.all_tracks().await?;
        if tracks.is_empty() {
            debug!("Catálogo vacío, no hay playlist de relleno");
            return Ok(None);
        }

        info!("🔀 Barajando playlist de relleno ({} canciones)", tracks.len());

        let mut rotation = self.rotation.lock();
        // Otro ciclo pudo rellenar mientras leíamos el catálogo
        if rotation.upcoming.is_empty() {
            rotation.reshuffle(tracks, &mut thread_rng());
        }
        Ok(rotation.pop_next())
    }

    /// Registra el track que acaba de terminar para no repetirlo enseguida.
    pub fn note_finished(&self, catalog_id: &str) {
        self.rotation.lock().last_finished = Some(catalog_id.to_string());
    }

    pub fn last_played(&self) -> Option<String> {
        self.rotation.lock().last_played().map(str::to_string)
    }

    pub fn upcoming_len(&self) -> usize {
        self.rotation.lock().upcoming.len()
    }

    pub fn history_len(&self) -> usize {
        self.rotation.lock().history.len()
    }

    pub fn reset(&self) {
        *self.rotation.lock() = Rotation::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn record(id: &str) -> CatalogRecord {
        CatalogRecord {
            catalog_id: id.to_string(),
            title: format!("Song {}", id),
            artist: "Artist".to_string(),
            thumbnail: None,
            source_url: format!("https://www.youtube.com/watch?v={}", id),
            requester: "ana".to_string(),
            requester_id: 7,
            last_played: None,
        }
    }

    /// Catálogo fijo que anota los `exclude_last` recibidos
    struct StaticCatalog {
        records: Vec<CatalogRecord>,
        excluded: Mutex<Vec<Option<String>>>,
    }

    impl StaticCatalog {
        fn of(ids: &[&str]) -> Self {
            Self {
                records: ids.iter().map(|id| record(id)).collect(),
                excluded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for StaticCatalog {
        async fn find_by_key(&self, catalog_id: &str) -> Result<Option<CatalogRecord>> {
            Ok(self.records.iter().find(|r| r.catalog_id == catalog_id).cloned())
        }

        async fn find_by_query(&self, _query: &str) -> Result<Option<CatalogRecord>> {
            Ok(None)
        }

        async fn save(&self, _record: CatalogRecord) -> Result<()> {
            Ok(())
        }

        async fn random_or_next(&self, exclude_last: Option<&str>) -> Result<Option<CatalogRecord>> {
            self.excluded.lock().push(exclude_last.map(str::to_string));
            Ok(self
                .records
                .iter()
                .find(|r| Some(r.catalog_id.as_str()) != exclude_last)
                .cloned())
        }

        async fn all_tracks(&self) -> Result<Vec<CatalogRecord>> {
            Ok(self.records.clone())
        }
    }

    #[test]
    fn reshuffle_never_starts_with_last_played() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut rotation = Rotation::default();
            rotation.history.push(record("b"));

            rotation.reshuffle(vec![record("a"), record("b"), record("c")], &mut rng);

            assert_ne!(rotation.upcoming[0].catalog_id, "b");
            assert_eq!(rotation.upcoming.len(), 3);
            assert_eq!(rotation.history.len(), 1);
        }
    }

    #[test]
    fn single_track_catalog_may_repeat() {
        let mut rotation = Rotation::default();
        rotation.history.push(record("a"));
        rotation.reshuffle(vec![record("a")], &mut thread_rng());

        assert_eq!(rotation.pop_next().unwrap().catalog_id, "a");
    }

    #[tokio::test]
    async fn every_track_plays_once_per_round() {
        let catalog = StaticCatalog::of(&["a", "b", "c"]);

        for _ in 0..20 {
            let playlist = FallbackPlaylist::new(FallbackMode::Shuffle);
            let mut seen = HashSet::new();
            let mut picks = Vec::new();
            for _ in 0..3 {
                let pick = playlist.next(&catalog).await.unwrap().unwrap();
                assert!(seen.insert(pick.catalog_id.clone()));
                picks.push(pick.catalog_id);
            }
            assert_eq!(playlist.upcoming_len(), 0);
            assert_eq!(playlist.history_len(), 3);

            let fourth = playlist.next(&catalog).await.unwrap().unwrap();
            assert_ne!(fourth.catalog_id, picks[2]);
            assert_eq!(playlist.upcoming_len(), 2);
        }
    }

    #[tokio::test]
    async fn finished_request_is_not_the_next_fallback() {
        let catalog = StaticCatalog::of(&["a", "b", "c"]);

        for _ in 0..20 {
            let playlist = FallbackPlaylist::new(FallbackMode::Shuffle);
            playlist.note_finished("b");

            let pick = playlist.next(&catalog).await.unwrap().unwrap();
            assert_ne!(pick.catalog_id, "b");
        }
    }

    #[tokio::test]
    async fn empty_catalog_yields_nothing() {
        let catalog = StaticCatalog::of(&[]);
        let playlist = FallbackPlaylist::new(FallbackMode::Shuffle);

        assert!(playlist.next(&catalog).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn random_mode_excludes_last_played() {
        let catalog = StaticCatalog::of(&["a", "b"]);
        let playlist = FallbackPlaylist::new(FallbackMode::Random);

        assert_eq!(playlist.next(&catalog).await.unwrap().unwrap().catalog_id, "a");
        assert_eq!(playlist.next(&catalog).await.unwrap().unwrap().catalog_id, "b");
        assert_eq!(playlist.last_played().as_deref(), Some("b"));
        assert_eq!(
            *catalog.excluded.lock(),
            vec![None, Some("a".to_string())]
        );
    }
}
