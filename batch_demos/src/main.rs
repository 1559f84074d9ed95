//! Starfield batching demo
//!
//! Fills an unbounded billboard batch with random stars, an unbounded line
//! batch with orbit rings and a reference grid, and a triangle batch list
//! with a few planets and a floor. A handful of frames are rendered into a
//! recording device and the per-frame statistics are logged.
//!
//! Usage: `starfield [config.toml|config.ron]`

use std::rc::Rc;

use batch_engine::config::ConfigError;
use batch_engine::foundation::logging;
use batch_engine::foundation::math::constants::TAU;
use batch_engine::prelude::*;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STAR_COUNT: usize = 20_000;
const STAR_FIELD_RADIUS: f32 = 500.0;
const ORBIT_COUNT: usize = 8;
const PLANET_COUNT: usize = 6;
const FRAMES: usize = 3;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("batch: {0}")]
    Batch(#[from] BatchError),

    #[error("render: {0}")]
    Render(#[from] RenderError),
}

struct Scene {
    stars: UnboundedBillboardBatch,
    orbits: UnboundedLineBatch,
    planets: TriangleBatchList,
}

impl Scene {
    fn build(device: &DeviceRef, config: &BatchConfig, rng: &mut StdRng) -> Result<Self, DemoError> {
        let mut stars = UnboundedBillboardBatch::from_config(device.clone(), config)?;
        for _ in 0..STAR_COUNT {
            let position = Vec3::new(
                rng.gen_range(-STAR_FIELD_RADIUS..STAR_FIELD_RADIUS),
                rng.gen_range(-STAR_FIELD_RADIUS..STAR_FIELD_RADIUS),
                rng.gen_range(-STAR_FIELD_RADIUS..STAR_FIELD_RADIUS),
            );
            let brightness = rng.gen_range(96..=255u8);
            let color = Color::rgb(brightness, brightness, rng.gen_range(brightness / 2..=brightness));
            stars.add_object(position, color, rng.gen_range(0.5..3.0))?;
        }

        let mut orbits = UnboundedLineBatch::from_config(device.clone(), config)?;
        orbits.add_grid(Vec3::zeros(), 200.0, 20, Color::rgba(64, 64, 64, 255))?;
        for ring in 1..=ORBIT_COUNT {
            let radius = ring as f32 * 20.0;
            let tilt = Quat::from_euler_angles(rng.gen_range(-0.2..0.2), 0.0, rng.gen_range(-0.2..0.2));
            orbits.add_circle_transformed(Vec3::zeros(), radius, 64, &tilt, Color::BLUE)?;
        }
        orbits.add_circle_gradient(Vec3::zeros(), 5.0, 48, Color::YELLOW, Color::RED)?;
        orbits.add_box_outline(Vec3::new(-200.0, -50.0, -200.0), Vec3::new(200.0, 50.0, 200.0), Color::GREEN)?;

        let mut planets = TriangleBatchList::from_config(device.clone(), config)?;
        planets.add_plane(&Plane::new(
            Vec3::new(0.0, -50.0, 0.0),
            Vec3::new(0.0, 0.0, 400.0),
            Vec3::new(400.0, 0.0, 0.0),
            (16, 16),
            Color::rgb(32, 32, 48),
        ))?;
        for planet in 0..PLANET_COUNT {
            let orbit = (planet + 1) as f32 * 20.0;
            let angle = rng.gen_range(0.0..TAU);
            let center = Vec3::new(orbit * angle.cos(), 0.0, orbit * angle.sin());
            let color = Color::rgb(rng.gen(), rng.gen(), rng.gen());
            planets.add_sphere(&Sphere::new(center, rng.gen_range(1.0..6.0), 32, 16, color))?;
        }
        planets.add_box(&BoxShape::new(Vec3::new(0.0, 60.0, 0.0), Vec3::new(10.0, 10.0, 10.0), 4, Color::WHITE))?;

        info!(
            "Scene built: {} stars in {} batches, {} lines in {} batches, {} triangles in {} batches",
            stars.number_of_objects(),
            stars.batch_count(),
            orbits.lines(),
            orbits.batch_count(),
            planets.number_of_triangles(),
            planets.batch_count()
        );

        Ok(Self { stars, orbits, planets })
    }

    fn render(&mut self) -> Result<BatchStats, DemoError> {
        let mut stats = self.stars.render()?;
        stats.accumulate(&self.orbits.render()?);
        stats.accumulate(&self.planets.render()?);
        Ok(stats)
    }
}

fn load_config() -> Result<BatchConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => BatchConfig::load_from_file(&path)?,
        None => BatchConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_from_config(&config.logging);
    info!("Starting starfield demo ({:?} submission)", config.submit_mode);

    let recorder = Rc::new(RecordingDevice::new());
    let device: DeviceRef = recorder.clone();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut scene = Scene::build(&device, &config, &mut rng)?;

    for frame in 0..FRAMES {
        let stats = scene.render()?;
        let draws = recorder.take_draws();
        info!(
            "Frame {}: {} draws, {} primitives ({:.1}/draw), {} vertices uploaded, {} rebuilds",
            frame,
            stats.draw_calls,
            stats.primitives,
            stats.avg_primitives_per_draw(),
            stats.vertices_uploaded,
            stats.buffers_rebuilt
        );
        debug!("Frame {}: device recorded {} draws", frame, draws.len());
    }

    // Swap submission paths mid-run; cached buffers are rebuilt once
    let flipped = !scene.stars.use_vertex_buffer();
    scene.stars.set_use_vertex_buffer(flipped);
    scene.orbits.set_use_vertex_buffer(flipped);
    scene
        .planets
        .set_submit_mode(SubmitMode::from_use_vertex_buffer(flipped));
    let stats = scene.render()?;
    info!(
        "After switching to {:?}: {} draws, {} vertices uploaded, {} live device buffers",
        SubmitMode::from_use_vertex_buffer(flipped),
        stats.draw_calls,
        stats.vertices_uploaded,
        recorder.live_buffers()
    );

    drop(scene);
    info!("Scene dropped, {} live device buffers remain", recorder.live_buffers());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Starfield demo failed: {}", e);
        eprintln!("starfield: {e}");
        std::process::exit(1);
    }
}
