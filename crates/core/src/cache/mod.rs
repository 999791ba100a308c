//! Component D: the on-disk tile cache. Keys tiles by `(world_seed, tile,
//! params_hash)` and fronts the filesystem with atomic write-then-rename, so
//! a reader can never observe a half-written tile file.

mod format;

pub use format::{read_raster, write_raster};

use crate::compositor::RawHeightmap;
use crate::config::WorldConfig;
use crate::geometry::TileCoord;
use fnv::FnvHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

/// Running counters for cache hit/miss behavior, useful for tuning
/// `max_cached_batches` and diagnosing cold-start latency.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// Disk footprint of one cache's tile set, as reported by
/// [`TileCache::stats`]: a scan of the seed directory, not a running
/// counter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub tile_count: u64,
    pub bytes: u64,
}

/// Content-addressed on-disk store of eroded tiles.
///
/// The cache key folds in a hash of the generation parameters so that
/// changing `voronoi_noise`/`erosion` settings between runs never returns a
/// stale tile silently: it just misses and regenerates.
#[derive(Clone, Debug)]
pub struct TileCache {
    root: PathBuf,
    params_tag: u64,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>, config: &WorldConfig) -> Self {
        Self {
            root: root.into(),
            params_tag: params_hash(config),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, tile: TileCoord) -> PathBuf {
        // Spread tiles across subdirectories by tag, keeping any single
        // directory's entry count manageable for large worlds.
        self.root.join(format!(
            "{:016x}/{}_{}.flvt",
            self.params_tag, tile.tx, tile.ty
        ))
    }

    pub fn has(&self, tile: TileCoord) -> bool {
        self.path_for(tile).is_file()
    }

    /// Load a cached tile, or `None` on any miss: absent file, unreadable
    /// file, or a corrupt/foreign format. Corruption is logged and treated
    /// the same as a plain miss rather than surfaced as an error.
    pub fn load(&self, tile: TileCoord, stats: &mut CacheStats) -> Option<RawHeightmap> {
        let path = self.path_for(tile);
        match std::fs::File::open(&path) {
            Ok(mut file) => match format::read_raster(&mut file) {
                Ok(map) => {
                    stats.hits += 1;
                    Some(map)
                }
                Err(e) => {
                    log::warn!("cache entry {path:?} is corrupt, treating as a miss: {e}");
                    stats.misses += 1;
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                stats.misses += 1;
                None
            }
            Err(e) => {
                log::warn!("cache entry {path:?} could not be opened, treating as a miss: {e}");
                stats.misses += 1;
                None
            }
        }
    }

    /// Persist `map` for `tile`. Writes to a sibling temp file and renames
    /// it into place, so concurrent readers never observe a partial file.
    pub fn save(&self, tile: TileCoord, map: &RawHeightmap, stats: &mut CacheStats) -> io::Result<()> {
        let path = self.path_for(tile);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let tmp_path = path.with_extension("flvt.tmp");
        {
            let mut tmp_file = std::fs::File::create(&tmp_path)?;
            format::write_raster(&mut tmp_file, map)?;
            tmp_file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        stats.writes += 1;
        Ok(())
    }

    /// Remove every cached tile written under this cache's parameter tag,
    /// leaving entries from other parameter sets untouched.
    pub fn clear(&self) -> io::Result<()> {
        let dir = self.root.join(format!("{:016x}", self.params_tag));
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Scan this cache's parameter-tag directory and report how many tiles
    /// are persisted and how many bytes they occupy. A pure read: entries
    /// that disappear mid-scan (a concurrent `clear`) are simply not
    /// counted, rather than surfaced as an error.
    pub fn stats(&self) -> DiskUsage {
        let dir = self.root.join(format!("{:016x}", self.params_tag));
        let mut usage = DiskUsage::default();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return usage,
        };
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    usage.tile_count += 1;
                    usage.bytes += metadata.len();
                }
            }
        }
        usage
    }
}

/// FNV hash of every generation-affecting field of the config, used to tag
/// cache entries so a parameter change can never return a stale tile.
fn params_hash(config: &WorldConfig) -> u64 {
    let mut hasher = FnvHasher::default();
    config.world_seed.0.hash(&mut hasher);
    config.tile_size.hash(&mut hasher);
    config.padding.hash(&mut hasher);
    format!("{:?}", config.voronoi_noise).hash(&mut hasher);
    format!("{:?}", config.erosion).hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        let mut path = std::env::temp_dir();
        let tag: u32 = std::process::id();
        path.push(format!("fluvion-cache-test-{tag}-{}", rand_suffix()));
        path
    }

    fn rand_suffix() -> u32 {
        // Deterministic enough for test isolation without pulling in a
        // random source just for a temp directory name.
        let addr = &tempdir as *const _ as usize;
        addr as u32
    }

    /// A tile written to the cache must come back byte-identical.
    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempdir();
        let config = WorldConfig::default();
        let cache = TileCache::new(&dir, &config);
        let tile = TileCoord::new(2, -3);

        let mut map = RawHeightmap::filled(4, 0.0);
        map.set(1, 2, 0.75);

        let mut stats = CacheStats::default();
        cache.save(tile, &map, &mut stats).unwrap();
        assert_eq!(stats.writes, 1);

        let loaded = cache.load(tile, &mut stats).expect("must hit after save");
        assert_eq!(loaded, map);
        assert_eq!(stats.hits, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_miss_on_absent_tile() {
        let dir = tempdir();
        let config = WorldConfig::default();
        let cache = TileCache::new(&dir, &config);
        let mut stats = CacheStats::default();
        assert!(cache.load(TileCoord::new(9, 9), &mut stats).is_none());
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_corrupt_entry_is_treated_as_miss() {
        let dir = tempdir();
        let config = WorldConfig::default();
        let cache = TileCache::new(&dir, &config);
        let tile = TileCoord::new(0, 0);
        let path = cache.path_for(tile);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a tile").unwrap();

        let mut stats = CacheStats::default();
        assert!(cache.load(tile, &mut stats).is_none());
        assert_eq!(stats.misses, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_different_params_yield_different_keys() {
        let dir = tempdir();
        let mut a = WorldConfig::default();
        let mut b = WorldConfig::default();
        b.world_seed = crate::config::WorldSeed(1);
        a.padding = a.padding; // no-op, keep a at defaults

        let cache_a = TileCache::new(&dir, &a);
        let cache_b = TileCache::new(&dir, &b);
        assert_ne!(cache_a.path_for(TileCoord::ORIGIN), cache_b.path_for(TileCoord::ORIGIN));
    }

    #[test]
    fn test_stats_counts_saved_tiles() {
        let dir = tempdir();
        let config = WorldConfig::default();
        let cache = TileCache::new(&dir, &config);
        let mut stats = CacheStats::default();

        let empty = cache.stats();
        assert_eq!(empty.tile_count, 0);
        assert_eq!(empty.bytes, 0);

        let map = RawHeightmap::filled(4, 0.5);
        cache.save(TileCoord::new(0, 0), &map, &mut stats).unwrap();
        cache.save(TileCoord::new(1, 0), &map, &mut stats).unwrap();

        let usage = cache.stats();
        assert_eq!(usage.tile_count, 2);
        assert!(usage.bytes > 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_stats_on_missing_directory_is_zero() {
        let dir = tempdir();
        let config = WorldConfig::default();
        let cache = TileCache::new(&dir, &config);
        assert_eq!(cache.stats(), DiskUsage::default());
    }
}
