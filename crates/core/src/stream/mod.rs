//! Component E: the streaming supervisor. Schedules tile generation on a
//! single background worker, fronts it with the disk cache, keeps a bounded
//! set of batches resident in memory, and exposes a polling API so a
//! consumer (camera, renderer, anything moving through the world) can be fed
//! tiles without ever blocking on generation.

mod events;

pub use events::StreamEvent;

use crate::{
    cache::{CacheStats, TileCache},
    compositor::{RawHeightmap, VoronoiNoiseCompositor},
    config::WorldConfig,
    erosion::ErosionSimulator,
    geometry::{BatchRegion, TileCoord, Vec2, Vec3},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A generated tile resident in memory, ready to hand to a consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryTile {
    pub coord: TileCoord,
    pub heightmap: RawHeightmap,
}

struct TileJob {
    coord: TileCoord,
    region: BatchRegion,
}

struct TileResult {
    coord: TileCoord,
    region: BatchRegion,
    heightmap: Arc<RawHeightmap>,
    from_cache: bool,
}

type TileIndex = Arc<RwLock<HashMap<TileCoord, Arc<RawHeightmap>>>>;

/// Minimum horizontal speed, in world units, below which a consumer is
/// treated as stationary for batch-prediction purposes: `predict_next`
/// centers the next batch on the consumer rather than offsetting it along a
/// direction too noisy to trust.
const STATIONARY_SPEED_THRESHOLD: f32 = 0.1;

/// Drives tile generation for a moving consumer: batches requests in
/// spiral-from-center order, fronts them with the disk cache, and keeps a
/// bounded window of batches in memory.
///
/// Generation is carried out by exactly one background worker, matching the
/// spec's "one generation worker" concurrency model (spec.md §5): a job
/// queue feeds a single thread, so the order `TileCompleted` events are
/// observed in is always the order jobs were submitted in, i.e. the batch's
/// spiral order. Parallelizing generation across a pool would make
/// completion order depend on each tile's generation cost (droplet count,
/// cache hit vs. miss) instead, breaking that guarantee.
pub struct Supervisor {
    config: WorldConfig,
    index: TileIndex,
    completed_regions: Arc<RwLock<VecDeque<BatchRegion>>>,
    active_region: Arc<RwLock<Option<BatchRegion>>>,
    /// The region currently being walked by the worker, and how many of its
    /// tiles have yet to report back. At most one region is ever in flight:
    /// `submit_region` is only called while `generating` is false.
    pending_region: Arc<RwLock<Option<(BatchRegion, usize)>>>,
    generating: Arc<AtomicBool>,
    job_tx: Sender<TileJob>,
    result_rx: Receiver<TileResult>,
    event_tx: Sender<StreamEvent>,
    event_rx: Receiver<StreamEvent>,
    worker: Option<JoinHandle<()>>,
    shutting_down: Arc<AtomicBool>,
}

impl Supervisor {
    /// Build a supervisor from a validated config and spin up the worker
    /// thread. No tile generation is scheduled yet; call
    /// [`start_initial_batch`](Self::start_initial_batch) to begin.
    pub fn configure(config: WorldConfig) -> Result<Self, crate::error::ConfigError> {
        use crate::error::ConfigError;
        use validator::Validate;

        if config.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if config.voronoi_noise.n_points > 10 {
            return Err(ConfigError::TooManyVoronoiPoints(config.voronoi_noise.n_points));
        }
        config.validate()?;

        let compositor = VoronoiNoiseCompositor::new(config.voronoi_noise);
        let erosion = ErosionSimulator::new(config.erosion);
        let cache = if config.cache.enabled {
            std::fs::create_dir_all(&config.cache.root_path).map_err(|source| {
                ConfigError::CacheRootUnavailable {
                    path: config.cache.root_path.clone(),
                    source,
                }
            })?;
            Some(TileCache::new(config.cache.root_path.clone(), &config))
        } else {
            None
        };

        let (job_tx, job_rx) = unbounded::<TileJob>();
        let (result_tx, result_rx) = unbounded::<TileResult>();
        let (event_tx, event_rx) = unbounded::<StreamEvent>();

        let tile_size = config.tile_size;
        let padding = config.padding;
        let world_seed = config.world_seed;
        let index: TileIndex = Arc::new(RwLock::new(HashMap::new()));
        let shutting_down = Arc::new(AtomicBool::new(false));

        let worker = {
            let job_rx = job_rx;
            let result_tx = result_tx;
            let index = Arc::clone(&index);
            let shutting_down = Arc::clone(&shutting_down);
            std::thread::Builder::new()
                .name("fluvion-worker".to_string())
                .spawn(move || {
                    let mut stats = CacheStats::default();
                    for job in job_rx.iter() {
                        if shutting_down.load(Ordering::SeqCst) {
                            // Shutdown was signaled before this job started;
                            // leave it (and everything still queued)
                            // ungenerated rather than picking up new work.
                            break;
                        }
                        match generate_tile(
                            job.coord,
                            tile_size,
                            padding,
                            world_seed,
                            &compositor,
                            &erosion,
                            cache.as_ref(),
                            &index,
                            &mut stats,
                            &shutting_down,
                        ) {
                            Some((heightmap, from_cache)) => {
                                if result_tx
                                    .send(TileResult {
                                        coord: job.coord,
                                        region: job.region,
                                        heightmap,
                                        from_cache,
                                    })
                                    .is_err()
                                {
                                    // Supervisor dropped; nothing left to report to.
                                    break;
                                }
                            }
                            None => {
                                // Shutdown was observed while this tile was
                                // in flight: dropped, not persisted, not
                                // delivered. The worker exits cleanly.
                                break;
                            }
                        }
                    }
                })
                .expect("failed to spawn fluvion worker thread")
        };

        Ok(Self {
            config,
            index,
            completed_regions: Arc::new(RwLock::new(VecDeque::new())),
            active_region: Arc::new(RwLock::new(None)),
            pending_region: Arc::new(RwLock::new(None)),
            generating: Arc::new(AtomicBool::new(false)),
            job_tx,
            result_rx,
            event_tx,
            event_rx,
            worker: Some(worker),
            shutting_down,
        })
    }

    /// Schedule generation of the `batch_size x batch_size` rect centered on
    /// `center`. Idempotent if called again before the first completes: the
    /// second call is ignored with a warning, since a batch is already in
    /// flight.
    pub fn start_initial_batch(&self, center: TileCoord) {
        if self.generating.load(Ordering::SeqCst) {
            log::warn!(
                "start_initial_batch({center:?}) ignored: a batch is already generating"
            );
            return;
        }
        let region = BatchRegion::centered(center, self.config.streaming.batch_size);
        self.submit_region(region);
    }

    /// Submit every tile in `region`, in spiral-from-center order, to the
    /// worker. Per spec.md §4.E step 1, `BatchStarted` is emitted
    /// unconditionally: even when every tile in `region` turns out to
    /// already be resident (a realistic case once overlapping batches have
    /// accumulated in `index`), the region must still walk through to
    /// `BatchCompleted` so `active_region`/`completed_regions` stay current.
    /// The worker itself (not this submission step) decides whether a tile
    /// is an index hit, a cache hit, or needs full generation, so that
    /// decision is made in the same place — and the same strict submission
    /// order — as everything else, preserving spiral-order delivery.
    fn submit_region(&self, region: BatchRegion) {
        let tiles = region.spiral_order();

        self.generating.store(true, Ordering::SeqCst);
        *self.pending_region.write() = Some((region, tiles.len()));
        let _ = self.event_tx.send(StreamEvent::BatchStarted { region });

        for coord in tiles {
            let _ = self.job_tx.send(TileJob { coord, region });
        }
    }

    /// Drain any results the worker has finished since the last call, apply
    /// them to the in-memory index, emit events, and evict batches past
    /// `max_cached_batches`. Never blocks.
    fn drain_results(&self) {
        let mut finished_region = None;

        for result in self.result_rx.try_iter() {
            self.index
                .write()
                .insert(result.coord, Arc::clone(&result.heightmap));

            let _ = self.event_tx.send(StreamEvent::TileCompleted {
                coord: result.coord,
                from_cache: result.from_cache,
            });

            let mut pending = self.pending_region.write();
            if let Some((region, remaining)) = pending.as_mut() {
                if *region == result.region {
                    *remaining -= 1;
                    if *remaining == 0 {
                        finished_region = Some(*region);
                        *pending = None;
                    }
                }
            }
        }

        if let Some(region) = finished_region {
            self.finish_region(region);
        }
    }

    fn finish_region(&self, region: BatchRegion) {
        let _ = self.event_tx.send(StreamEvent::BatchCompleted { region });
        *self.active_region.write() = Some(region);
        self.generating.store(false, Ordering::SeqCst);

        let mut completed = self.completed_regions.write();
        completed.push_back(region);
        while completed.len() > self.config.streaming.max_cached_batches {
            if let Some(evicted) = completed.pop_front() {
                self.evict_region(evicted, &completed);
            }
        }
    }

    /// Drop every tile belonging to `region` from the in-memory index,
    /// unless a still-retained region also claims it (batches can overlap
    /// at their edges).
    fn evict_region(&self, region: BatchRegion, retained: &VecDeque<BatchRegion>) {
        let mut index = self.index.write();
        for coord in region.spiral_order() {
            if retained.iter().any(|r| r.contains(coord)) {
                continue;
            }
            index.remove(&coord);
        }
    }

    /// If the consumer is within `edge_threshold` tiles of `active_region`'s
    /// boundary and no batch is currently generating, predict and start the
    /// next batch along the consumer's direction of travel.
    fn maybe_advance(&self, consumer_tile: TileCoord, consumer_vel: Vec2) {
        if self.is_generating() {
            // A batch is already in flight; per the suspension-point
            // contract, skip the boundary check entirely rather than queue
            // a second batch on top of it.
            return;
        }
        let active = match *self.active_region.read() {
            Some(region) => region,
            None => return,
        };

        let edge_distance = active.distance_to_edge(consumer_tile);
        if edge_distance < 0 || edge_distance > self.config.streaming.edge_threshold as i32 {
            return;
        }

        let next = Self::predict_next(consumer_tile, consumer_vel, self.config.streaming.batch_size);
        let already_done = self.completed_regions.read().iter().any(|r| *r == next);
        if !already_done {
            self.submit_region(next);
        }
    }

    /// Pure prediction of the next batch region: centered on `pos` if the
    /// consumer is effectively stationary, otherwise offset half a batch's
    /// width along the normalized horizontal velocity direction.
    fn predict_next(pos: TileCoord, vel: Vec2, batch_size: u32) -> BatchRegion {
        if vel.norm() < STATIONARY_SPEED_THRESHOLD {
            return BatchRegion::centered(pos, batch_size);
        }
        let dir = vel.normalize();
        let offset = dir * (batch_size as f32 / 2.0);
        let center = TileCoord::new(
            pos.tx + offset.x.round() as i32,
            pos.ty + offset.y.round() as i32,
        );
        BatchRegion::centered(center, batch_size)
    }

    /// Advance the supervisor one step: drain any finished tiles, predict
    /// and kick off the next batch if the consumer is nearing the edge of
    /// the active region, and return the 3x3 neighborhood of tiles around
    /// the consumer currently resident in memory. Never blocks; a slow or
    /// busy worker just means fewer entries come back this tick.
    ///
    /// `consumer_pos`/`consumer_vel` are world-space; the vertical (`y`)
    /// component is ignored, matching every generator in this crate, which
    /// only ever reasons about the horizontal `(x, z)` plane.
    pub fn tick(&self, consumer_pos: Vec3, consumer_vel: Vec3) -> Vec<MemoryTile> {
        self.drain_results();

        let tile_size = self.config.tile_size as f32;
        let consumer_tile = TileCoord::new(
            (consumer_pos.x / tile_size).floor() as i32,
            (consumer_pos.z / tile_size).floor() as i32,
        );
        let vel_xz = Vec2::new(consumer_vel.x, consumer_vel.z);

        self.maybe_advance(consumer_tile, vel_xz);
        self.snapshot(consumer_tile)
    }

    /// `true` while at least one batch is still being generated.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// Snapshot the tiles in and around `coord`'s tile, for a consumer to
    /// read. Always an atomic read of the current index: never a torn
    /// partial view, and at most 9 entries, each present in the index at the
    /// moment of the read.
    pub fn snapshot(&self, coord: TileCoord) -> Vec<MemoryTile> {
        let index = self.index.read();
        let mut tiles = Vec::with_capacity(9);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let c = TileCoord::new(coord.tx + dx, coord.ty + dy);
                if let Some(map) = index.get(&c) {
                    tiles.push(MemoryTile {
                        coord: c,
                        heightmap: (**map).clone(),
                    });
                }
            }
        }
        tiles
    }

    /// Poll for the next queued event, if any, without blocking.
    pub fn poll_event(&self) -> Option<StreamEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Stop accepting new work and signal the worker to exit at the next
    /// tile boundary. Per the concurrent-shutdown error kind (spec.md §7.4):
    /// a tile the worker has already started generating when shutdown is
    /// signaled is allowed to finish running, but is dropped rather than
    /// persisted or delivered, and any tile still queued but not yet
    /// started is left ungenerated. The flag is set *before* the job queue
    /// is torn down so a worker blocked on `generate_tile` always observes
    /// it before its next save/send.
    pub fn shutdown(mut self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        drop(self.job_tx);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Produce the heightmap for `coord`: an index hit returns the resident tile
/// as-is, a cache hit loads it from disk, and otherwise 4.C is invoked to
/// erode a fresh tile (which is then written back to the cache). All three
/// branches are evaluated here, on the single worker thread, in the order
/// jobs are submitted, so that `TileCompleted` events always land in spiral
/// order regardless of which branch any given tile took.
///
/// Returns `None` if `shutting_down` is observed after generation but before
/// the tile would be persisted/delivered: the concurrent-shutdown contract
/// requires a tile in flight at shutdown time to be dropped rather than
/// written to cache or handed to the consumer.
#[allow(clippy::too_many_arguments)]
fn generate_tile(
    coord: TileCoord,
    tile_size: u32,
    padding: u32,
    world_seed: crate::config::WorldSeed,
    compositor: &VoronoiNoiseCompositor,
    erosion: &ErosionSimulator,
    cache: Option<&TileCache>,
    index: &TileIndex,
    stats: &mut CacheStats,
    shutting_down: &AtomicBool,
) -> Option<(Arc<RawHeightmap>, bool)> {
    if let Some(existing) = index.read().get(&coord) {
        return Some((Arc::clone(existing), true));
    }

    if let Some(cache) = cache {
        if let Some(map) = cache.load(coord, stats) {
            return Some((Arc::new(map), true));
        }
    }

    let eroded = erosion.simulate_tile(coord, tile_size, padding, world_seed, compositor);
    let map = eroded.into_inner();

    if shutting_down.load(Ordering::SeqCst) {
        return None;
    }

    if let Some(cache) = cache {
        if let Err(e) = cache.save(coord, &map, stats) {
            log::warn!("failed to write tile {coord:?} to cache: {e}");
        }
    }

    Some((Arc::new(map), false))
}
