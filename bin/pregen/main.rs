//! Headless pre-generation of the LOD index around a point.

use horizon::core::glam::{IVec2, Vec2};
use horizon::core::ilattice::prelude::Extent;
use horizon::core::SmallKeyHashSet;
use horizon::map::{
    BlockStateCache, BlockUnits, ChunkStorage, ChunkUnits, DimensionContext, Level, LodIndex, MemoryChunkStore, NodeKey,
    RegionDirStore, SimpleBlockRegistry, SledChunkStore, SnapshotDecoder, CHUNK_LEVEL, REGION_LEVEL,
};
use horizon::worldgen::{
    BatchGenerationEnvironment, GenerationRequest, GenerationServices, NoiseSynthesizer, Phase, TickQueue,
};
use horizon::Config;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WATCHDOG_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "pregen", about = "Pre-generate LOD terrain summaries around a point")]
#[command(group(ArgGroup::new("source").args(["regions", "sled"])))]
struct Args {
    /// RON config file; defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory of region files to decode persisted chunks from
    #[arg(long)]
    regions: Option<PathBuf>,
    /// Sled database to decode persisted chunks from
    #[arg(long)]
    sled: Option<PathBuf>,
    /// World tree inside the sled database
    #[arg(long, default_value = "world")]
    world: String,
    /// Center of the generated area in blocks (X Z)
    #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_hyphen_values = true, default_values_t = [0.0, 0.0])]
    center: Vec<f32>,
    /// Generation radius in blocks
    #[arg(long, default_value_t = 2048.0)]
    radius: f32,
    /// Quadtree level of the submitted quadrants
    #[arg(long, default_value_t = CHUNK_LEVEL + 2, value_parser = clap::value_parser!(u8).range(CHUNK_LEVEL as i64..=REGION_LEVEL as i64))]
    level: Level,
}

impl Args {
    fn center(&self) -> Vec2 {
        Vec2::new(self.center[0], self.center[1])
    }

    /// Chunks overlapping the square that bounds the generation radius.
    fn chunk_extent(&self) -> ChunkUnits<Extent<IVec2>> {
        let radius = Vec2::splat(self.radius.max(0.0));
        let min = ((self.center() - radius) / 16.0).floor().as_ivec2();
        let lub = ((self.center() + radius) / 16.0).ceil().as_ivec2();
        ChunkUnits(Extent::from_min_and_lub(min, lub))
    }
}

fn open_storage(args: &Args) -> anyhow::Result<Arc<dyn ChunkStorage>> {
    if let Some(dir) = &args.regions {
        return Ok(Arc::new(RegionDirStore::new(dir.clone())));
    }
    if let Some(path) = &args.sled {
        let db = sled::open(path).with_context(|| format!("opening {}", path.display()))?;
        let store = SledChunkStore::open(&db, &args.world)?;
        let persisted = store.chunks_in_extent(args.chunk_extent())?;
        info!("{} persisted chunks of {} lie within the radius", persisted.len(), args.world);
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(MemoryChunkStore::new()))
}

fn report(key: NodeKey, request: &GenerationRequest) {
    match request.phase() {
        Phase::Completed(outcome) => info!(
            "{}: {} generated ({} decoded, {} synthesized), {} merged",
            key, outcome.generated, outcome.decoded, outcome.synthesized, outcome.merged
        ),
        Phase::Failed(e) => warn!("{}: {}", key, e),
        Phase::Cancelled => warn!("{}: cancelled", key),
        Phase::Abandoned => error!("{}: interrupted", key),
        Phase::Pending | Phase::Running => {}
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::read_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let blocks = Arc::new(BlockStateCache::new(Arc::new(SimpleBlockRegistry::overworld())));
    let index = Arc::new(LodIndex::new(config.index));
    let center = args.center();
    let center_block = center.as_ivec2();
    index.move_window(IVec2::new(
        center_block.x >> REGION_LEVEL,
        center_block.y >> REGION_LEVEL,
    ));

    let services = GenerationServices {
        index: index.clone(),
        storage: open_storage(&args)?,
        decoder: Arc::new(SnapshotDecoder::new(
            blocks.clone(),
            DimensionContext::from_config(&config.dimension),
        )),
        synthesizer: Arc::new(NoiseSynthesizer::new(&blocks, &config.dimension)),
        ticks: Arc::new(TickQueue::new()),
    };
    let env = BatchGenerationEnvironment::new(config.generation, services)?;

    let mode = config.generation.generation_mode;
    let step = mode.required_step();
    let light_mode = config.generation.light_mode;
    let max_in_flight = config.generation.max_in_flight.max(1);
    info!(
        "Pre-generating {:?} within {} blocks of {} with {} workers",
        mode, args.radius, center, config.generation.worker_threads
    );

    let started = Instant::now();
    let mut submitted = SmallKeyHashSet::default();
    let mut running: Vec<(NodeKey, GenerationRequest)> = Vec::new();
    loop {
        for candidate in index.nodes_to_generate(BlockUnits(center), args.level, mode, 0.0, args.radius) {
            if running.len() >= max_in_flight {
                break;
            }
            // Failed quadrants are not retried.
            if !submitted.insert(candidate.key) {
                continue;
            }
            running.push((candidate.key, env.submit_for_quadrant(candidate.key, step, light_mode)));
        }
        if running.is_empty() {
            break;
        }

        thread::sleep(WATCHDOG_INTERVAL);
        env.sweep_timeouts();
        running.retain(|(key, request)| {
            let done = request.phase().is_terminal();
            if done {
                report(*key, request);
            }
            !done
        });
    }

    let stats = env.stats();
    info!(
        "Finished in {:?}: {} requests ({} completed, {} failed, {} cancelled), {} chunks at {} us/chunk, {} LOD nodes",
        started.elapsed(),
        stats.submitted,
        stats.completed,
        stats.failed,
        stats.cancelled,
        stats.chunks_generated,
        stats.average_chunk_time_us,
        index.node_count()
    );
    Ok(())
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["pregen"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.regions.is_none() && args.sled.is_none());
        assert_eq!(args.world, "world");
        assert_eq!(args.center(), Vec2::ZERO);
        assert_eq!(args.radius, 2048.0);
        assert_eq!(args.level, CHUNK_LEVEL + 2);
    }

    #[test]
    fn center_accepts_negative_coordinates() {
        let args = Args::try_parse_from(["pregen", "--center", "-512", "96.5", "--level", "9"]).unwrap();
        assert_eq!(args.center(), Vec2::new(-512.0, 96.5));
        assert_eq!(args.level, REGION_LEVEL);
    }

    #[test]
    fn chunk_extent_covers_the_radius() {
        let args = Args::try_parse_from(["pregen", "--center", "-8", "8", "--radius", "24"]).unwrap();
        let ChunkUnits(extent) = args.chunk_extent();
        assert_eq!(extent.minimum, IVec2::new(-2, -1));
        assert_eq!(extent.least_upper_bound(), IVec2::new(1, 2));
    }

    #[test]
    fn level_outside_the_tree_is_rejected() {
        assert!(Args::try_parse_from(["pregen", "--level", "3"]).is_err());
        assert!(Args::try_parse_from(["pregen", "--level", "10"]).is_err());
    }

    #[test]
    fn only_one_chunk_source() {
        assert!(Args::try_parse_from(["pregen", "--regions", "a", "--sled", "b"]).is_err());
        let args = Args::try_parse_from(["pregen", "--sled", "b", "--world", "nether"]).unwrap();
        assert_eq!(args.sled, Some(PathBuf::from("b")));
        assert_eq!(args.world, "nether");
    }
}
