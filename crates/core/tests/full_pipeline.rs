//! Integration tests exercising the full generation pipeline through the
//! crate's public API: config in, eroded tiles out.

use fluvion::{
    geometry::Vec3, CacheConfig, ErosionConfig, StreamingConfig, Supervisor, TileCoord,
    VoronoiNoiseConfig, WorldConfig, WorldSeed,
};
use std::time::{Duration, Instant};

fn run_to_quiescence(sup: &Supervisor) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while sup.is_generating() && Instant::now() < deadline {
        sup.tick(Vec3::zeros(), Vec3::zeros());
        std::thread::yield_now();
    }
    assert!(!sup.is_generating(), "supervisor never reached quiescence");
}

fn small_config(seed: u32) -> WorldConfig {
    WorldConfig {
        world_seed: WorldSeed(seed),
        tile_size: 32,
        padding: 8,
        voronoi_noise: VoronoiNoiseConfig {
            n_points: 3,
            ..Default::default()
        },
        erosion: ErosionConfig {
            droplets_per_tile: 20,
            max_lifetime: 10,
            ..Default::default()
        },
        streaming: StreamingConfig {
            batch_size: 3,
            edge_threshold: 1,
            max_cached_batches: 2,
            initial_tile: TileCoord::ORIGIN,
        },
        cache: CacheConfig {
            enabled: false,
            ..Default::default()
        },
    }
}

/// Two independently configured supervisors, same config, must produce
/// bit-identical tiles across their shared 3x3 neighborhood.
#[test]
fn test_identical_config_yields_identical_snapshots() {
    let a = Supervisor::configure(small_config(55)).unwrap();
    let b = Supervisor::configure(small_config(55)).unwrap();
    a.start_initial_batch(TileCoord::ORIGIN);
    b.start_initial_batch(TileCoord::ORIGIN);
    run_to_quiescence(&a);
    run_to_quiescence(&b);

    let snap_a = a.snapshot(TileCoord::ORIGIN);
    let snap_b = b.snapshot(TileCoord::ORIGIN);
    assert_eq!(snap_a.len(), snap_b.len());

    for tile_a in &snap_a {
        let tile_b = snap_b
            .iter()
            .find(|t| t.coord == tile_a.coord)
            .expect("same coord must appear in both snapshots");
        assert_eq!(tile_a.heightmap, tile_b.heightmap);
    }

    a.shutdown();
    b.shutdown();
}

/// Different seeds must (with overwhelming probability) diverge somewhere
/// in the patch; this guards against an accidental seed no-op.
#[test]
fn test_different_seeds_yield_different_worlds() {
    let a = Supervisor::configure(small_config(1)).unwrap();
    let b = Supervisor::configure(small_config(2)).unwrap();
    a.start_initial_batch(TileCoord::ORIGIN);
    b.start_initial_batch(TileCoord::ORIGIN);
    run_to_quiescence(&a);
    run_to_quiescence(&b);

    let snap_a = a.snapshot(TileCoord::ORIGIN);
    let snap_b = b.snapshot(TileCoord::ORIGIN);

    let any_different = snap_a.iter().any(|tile_a| {
        snap_b
            .iter()
            .find(|t| t.coord == tile_a.coord)
            .map(|tile_b| tile_b.heightmap != tile_a.heightmap)
            .unwrap_or(false)
    });
    assert!(any_different, "different seeds produced identical worlds");

    a.shutdown();
    b.shutdown();
}

/// Rejecting an invalid config must happen before any worker thread spins
/// up or any file touches disk.
#[test]
fn test_configure_rejects_invalid_config() {
    let mut config = small_config(1);
    config.voronoi_noise.n_points = 50;
    assert!(Supervisor::configure(config).is_err());
}

/// Walking the consumer steadily away from the initial batch must keep the
/// rendering-snapshot invariant intact at every step: at most 9 tiles
/// returned, every one of them inside the consumer's current 3x3
/// neighborhood. The eviction bound itself (`completed_regions.len() <=
/// max_cached_batches`) is covered at the unit level in `stream::tests`,
/// where the region history is visible.
#[test]
fn test_streaming_walk_respects_eviction_and_snapshot_invariants() {
    let config = WorldConfig {
        tile_size: 16,
        padding: 4,
        voronoi_noise: VoronoiNoiseConfig {
            n_points: 2,
            ..Default::default()
        },
        erosion: ErosionConfig {
            droplets_per_tile: 4,
            max_lifetime: 6,
            ..Default::default()
        },
        streaming: StreamingConfig {
            batch_size: 4,
            edge_threshold: 1,
            max_cached_batches: 2,
            initial_tile: TileCoord::ORIGIN,
        },
        cache: CacheConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let sup = Supervisor::configure(config).unwrap();
    sup.start_initial_batch(TileCoord::ORIGIN);
    run_to_quiescence(&sup);

    for frame in 0..8 {
        let pos = Vec3::new((frame * 16) as f32, 0.0, 0.0);
        let snapshot = sup.tick(pos, Vec3::new(1.0, 0.0, 0.0));
        run_to_quiescence(&sup);

        let consumer_tile = TileCoord::new(frame, 0);
        for tile in &snapshot {
            assert!(
                tile.coord.tx >= consumer_tile.tx - 1
                    && tile.coord.tx <= consumer_tile.tx + 1
                    && tile.coord.ty >= consumer_tile.ty - 1
                    && tile.coord.ty <= consumer_tile.ty + 1,
                "tile {:?} outside the 3x3 neighborhood of {:?}",
                tile.coord,
                consumer_tile
            );
        }
        assert!(snapshot.len() <= 9);
    }

    sup.shutdown();
}
