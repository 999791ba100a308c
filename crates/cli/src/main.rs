use anyhow::Context;
use config::{Config, File};
use fluvion::{geometry::Vec3, Supervisor, TileCoord, WorldConfig};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    fs,
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};
use structopt::StructOpt;

/// CLI for generating worlds with the Fluvion generation kit.
#[derive(Debug, StructOpt)]
#[structopt(name = "fluvion")]
struct Opt {
    /// Path to a config file that defines the world to be generated.
    /// Supported formats: JSON, TOML
    #[structopt(short, long)]
    config: PathBuf,

    /// Directory to write generated tiles into. Each tile is written as
    /// `<tx>_<ty>.flvt`
    #[structopt(short, long)]
    output: PathBuf,

    /// How many tiles out from the initial tile to generate, in each
    /// direction
    #[structopt(short, long, default_value = "0")]
    radius: u32,

    /// The logging level to use during world generation. See
    /// https://docs.rs/log/0.4.11/log/enum.LevelFilter.html for options
    #[structopt(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn load_config(config_path: &Path) -> anyhow::Result<WorldConfig> {
    let mut settings = Config::new();
    settings
        .merge(File::with_name(
            config_path
                .to_str()
                .with_context(|| format!("invalid character in path {config_path:?}"))?,
        ))
        .context("error reading config file")?;
    settings.try_into().context("error reading config")
}

fn run(opt: Opt) -> anyhow::Result<()> {
    SimpleLogger::new().with_level(opt.log_level).init()?;

    let config = load_config(&opt.config)?;
    let initial_tile = config.streaming.initial_tile;
    let tile_size = config.tile_size;
    let supervisor = Supervisor::configure(config).context("error configuring world")?;
    supervisor.start_initial_batch(initial_tile);

    // Walk the consumer outward so the requested radius of batches is
    // pulled in, not just the batch around the initial tile.
    for ring in 0..=opt.radius {
        let probe = TileCoord::new(initial_tile.tx + ring as i32, initial_tile.ty);
        let world = probe.world_origin(tile_size);
        let pos = Vec3::new(world.0 as f32, 0.0, world.1 as f32);

        let deadline = Instant::now() + Duration::from_secs(120);
        loop {
            supervisor.tick(pos, Vec3::zeros());
            if !supervisor.is_generating() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fs::create_dir_all(&opt.output).context("error creating output directory")?;
    let mut written = 0;
    for dty in -(opt.radius as i32)..=(opt.radius as i32) {
        for dtx in -(opt.radius as i32)..=(opt.radius as i32) {
            let coord = TileCoord::new(initial_tile.tx + dtx, initial_tile.ty + dty);
            for tile in supervisor.snapshot(coord) {
                if tile.coord != coord {
                    continue;
                }
                let path = opt.output.join(format!("{}_{}.flvt", coord.tx, coord.ty));
                let mut file = fs::File::create(&path)
                    .with_context(|| format!("error opening output file {path:?}"))?;
                fluvion::write_raster(&mut file, &tile.heightmap)
                    .with_context(|| format!("error writing tile to {path:?}"))?;
                written += 1;
            }
        }
    }
    info!("Wrote {written} tiles to {:?}", &opt.output);

    supervisor.shutdown();
    Ok(())
}

fn main() {
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    process::exit(exit_code);
}
