use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use image::{ImageBuffer, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use road_generator::network::topology::PRIORITY_TABLE;
use road_generator::network::{PointOfInterest, RoadNetworkGenerator, StaticLocations};
use road_generator::road::save_index;
use road_generator::terrain::procedural::SEA_LEVEL;
use road_generator::terrain::NoiseTerrain;
use road_generator::{RoadConfig, RoadSpatialIndex, TerrainOracle, WorldPoint};

#[derive(Parser, Debug)]
#[command(name = "road_generator")]
#[command(about = "Generate a road network over procedural terrain")]
struct Args {
    /// World seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// World radius in world units
    #[arg(short, long, default_value = "3000")]
    radius: f32,

    /// Road width (overrides the config file)
    #[arg(short, long)]
    width: Option<f32>,

    /// Number of scattered locations besides the start temple
    #[arg(short, long, default_value = "24")]
    locations: usize,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the road index in binary form
    #[arg(long, default_value = "roads.bin")]
    output: PathBuf,

    /// Write a PNG preview of terrain and roads
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Preview size in pixels
    #[arg(long, default_value = "1024")]
    preview_size: u32,
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => RoadConfig::load(path)?,
        None => RoadConfig::default(),
    };
    if let Some(width) = args.width {
        config.road_width = width;
    }
    config.islands.world_radius = args.radius;
    config.pathfinder.max_search_radius = args.radius * 1.05;
    config.validate()?;

    println!("Generating roads with seed: {}", seed);
    println!("World radius: {}, road width: {}", args.radius, config.road_width);

    let terrain = NoiseTerrain::new(seed, args.radius);

    println!("Placing locations...");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let locations = scatter_locations(&terrain, args.radius, args.locations, &mut rng);
    println!("Placed {} locations", locations.len());

    let mut generator = RoadNetworkGenerator::new(terrain, StaticLocations::new(locations), config)?;

    println!("Building road network...");
    let report = generator.generate()?;
    for landmass in &report.landmasses {
        println!(
            "  Landmass {}: {:.2} km², {} destinations, {} ({}/{} roads), anchor {}",
            landmass.landmass_id,
            landmass.area / 1_000_000.0,
            landmass.destinations,
            landmass.topology.display_name(),
            landmass.edges_built,
            landmass.edges_attempted,
            landmass.anchor,
        );
    }
    println!(
        "Built {} of {} roads ({} not found, {} over iteration limit, {} too short, {} bad terrain)",
        report.edges_built,
        report.edges_attempted,
        report.skipped_path_not_found,
        report.skipped_iteration_limit,
        report.skipped_too_short,
        report.skipped_invalid_height,
    );

    let index = generator.index();
    println!(
        "Road index: {} points in {} cells ({} blended at junctions)",
        index.point_count(),
        index.cell_count(),
        report.points_blended,
    );

    save_index(&index, &args.output)?;
    println!("Saved road index to {}", args.output.display());

    if let Some(path) = &args.preview {
        println!("Rendering preview...");
        export_preview(generator.oracle(), &index, args.radius, args.preview_size, path)?;
        println!("Saved preview to {}", path.display());
    }

    Ok(())
}

/// Scatter named locations over dry land, plus a start temple near the
/// world centre.
fn scatter_locations(
    terrain: &NoiseTerrain,
    radius: f32,
    count: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<PointOfInterest> {
    let is_dry = |p: WorldPoint| {
        terrain.base_height(p.x, p.z) > SEA_LEVEL + 2.0 && terrain.river_weight(p.x, p.z).weight == 0.0
    };
    let mut locations = Vec::with_capacity(count + 1);

    // Spiral outwards from the centre for the temple
    let temple = (0..2000)
        .map(|i| {
            let angle = i as f32 * 0.5;
            let r = i as f32 * 4.0;
            WorldPoint::new(angle.cos() * r, angle.sin() * r)
        })
        .find(|p| is_dry(*p));
    if let Some(position) = temple {
        locations.push(PointOfInterest::new("StartTemple", position, 30.0));
    }

    let names: Vec<&str> = PRIORITY_TABLE
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| *name != "StartTemple")
        .collect();

    let mut attempts = 0;
    while locations.len() < count + 1 && attempts < count * 200 {
        attempts += 1;
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let r = radius * 0.9 * rng.gen::<f32>().sqrt();
        let p = WorldPoint::new(angle.cos() * r, angle.sin() * r);
        if !is_dry(p) || locations.iter().any(|l: &PointOfInterest| l.position.distance(p) < 150.0) {
            continue;
        }
        let name = names[locations.len() % names.len()];
        let exterior = rng.gen_range(8.0..25.0);
        locations.push(PointOfInterest::new(name, p, exterior));
    }

    locations
}

/// Render land, water and road influence as a top-down PNG.
fn export_preview(
    terrain: &NoiseTerrain,
    index: &RoadSpatialIndex,
    radius: f32,
    size: u32,
    path: &std::path::Path,
) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(size, size);
    let scale = 2.0 * radius / size as f32;

    for py in 0..size {
        for px in 0..size {
            let x = -radius + (px as f32 + 0.5) * scale;
            let z = radius - (py as f32 + 0.5) * scale;
            let h = terrain.height(x, z);

            let base = if h < SEA_LEVEL {
                let depth = (-h / 60.0).clamp(0.0, 1.0);
                [20.0, 70.0 - 40.0 * depth, 140.0 - 60.0 * depth]
            } else {
                let t = (h / 150.0).clamp(0.0, 1.0);
                [70.0 + 150.0 * t, 130.0 + 90.0 * t, 60.0 + 160.0 * t]
            };

            let river = terrain.river_weight(x, z).weight;
            let water = [40.0, 90.0, 200.0];
            let mut color = mix(base, water, river);

            let road = index.query_influence(WorldPoint::new(x, z)).weight;
            color = mix(color, [150.0, 110.0, 70.0], road);

            img.put_pixel(px, py, Rgb([color[0] as u8, color[1] as u8, color[2] as u8]));
        }
    }

    img.save(path)
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
