use std::path::PathBuf;

use clap::Parser;
use formats::{FileBoundarySource, load_boundaries};
use foundation::math::Vec2;
use foundation::time::Time;
use globe::{BoundaryOutcome, GlobeConfig, GlobeScene, HeadlessViewport, Marker};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the wireframe globe")]
struct Args {
    /// JSON config file; fields left out take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// GeoJSON FeatureCollection with landmass polygons
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// JSON array of markers: {id, lat, lon, color, size, opacity?, info?}
    #[arg(long)]
    markers: Option<PathBuf>,

    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    color: Option<String>,

    /// Auto-rotation in radians per frame
    #[arg(long)]
    speed: Option<f64>,

    #[arg(long)]
    dot_size_multiplier: Option<f64>,

    /// Draw latitude/longitude lines
    #[arg(long)]
    graticule: bool,

    /// Number of animation frames to run
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Simulated frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Click at pixel X Y after the last frame
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    click: Option<Vec<f64>>,

    /// Print engine events as JSON lines on stdout
    #[arg(long)]
    events: bool,
}

impl Args {
    fn load_config(&self) -> Result<GlobeConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => GlobeConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            None => GlobeConfig::default(),
        };
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(color) = &self.color {
            config.color = color.clone();
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        if let Some(m) = self.dot_size_multiplier {
            config.dot_size_multiplier = m;
        }
        config.graticule |= self.graticule;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = args.load_config()?;

    let markers: Vec<Marker> = match &args.markers {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let viewport = HeadlessViewport::new(config.device_pixel_ratio);
    let probe = viewport.probe();
    let mut scene = GlobeScene::new(viewport, config);
    scene.set_click_handler(|marker: &Marker| {
        info!(
            id = marker.id,
            info = marker.descriptive_text.as_deref().unwrap_or_default(),
            "marker clicked"
        );
    });
    scene.mount();
    scene.sync_markers(markers);

    if let Some(path) = &args.boundaries {
        if let Some(ticket) = scene.boundary_ticket() {
            let loaded = pollster::block_on(load_boundaries(&FileBoundarySource::new(path)));
            match scene.apply_boundaries(ticket, loaded) {
                BoundaryOutcome::Applied { outlines, fills } => {
                    info!(outlines, fills, "continents drawn")
                }
                other => warn!(?other, "continents not drawn"),
            }
        }
    }

    let fps = if args.fps > 0.0 { args.fps } else { 60.0 };
    let mut last = None;
    for i in 0..args.frames {
        last = scene.frame(Time(f64::from(i) / fps));
    }

    if let Some(&[x, y]) = args.click.as_deref() {
        match scene.click(Vec2::new(x, y)) {
            Some(marker) => info!(id = marker.id, "click hit a marker"),
            None => info!(x, y, "click hit nothing"),
        }
    }

    if let Some(frame) = &last {
        let stats = frame.stats();
        info!(
            frames = probe.state().frames_presented,
            spheres = stats.spheres,
            line_segments = stats.line_segments,
            triangles = stats.triangles,
            spin = scene.globe_spin().unwrap_or_default(),
            "render summary"
        );
    }

    scene.unmount();
    if args.events {
        for event in scene.drain_events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
