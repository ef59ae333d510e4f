mod app_dir;
mod config;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use mandelmaps_core::{
    julia_parameter_for_pixel, CoreError, FractalKernel, IterationPolicy, ViewportState,
};
use mandelmaps_render::{
    export_png, ExportMetadata, JobStatus, LogObserver, RenderCoordinator,
};

use crate::config::AppConfig;

/// Render `viewport` and block until the job settles.
fn render(
    coordinator: &mut RenderCoordinator,
    viewport: ViewportState,
    show_progress: bool,
) -> Result<JobStatus, Box<dyn Error>> {
    let handle = coordinator.start(viewport, show_progress)?;
    Ok(handle.wait())
}

/// Export the coordinator's buffer if the render that filled it completed.
fn export(
    coordinator: &RenderCoordinator,
    viewport: &ViewportState,
    status: JobStatus,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    if status != JobStatus::Cancelled {
        let scheme = coordinator.mapper_for(viewport.fractal().family());
        let meta = ExportMetadata::from_viewport(viewport, scheme.name());
        export_png(coordinator.buffer(), path, &meta)?;
        info!("Saved {}", path.display());
    } else {
        warn!("Render cancelled; skipping {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting MandelMaps");

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(app_dir::config_path);
    let config = AppConfig::load(&config_path);
    let (width, height) = (config.width, config.height);

    let mut coordinator =
        RenderCoordinator::new(width, height, config.render.clone(), Arc::new(LogObserver))?;
    coordinator.set_color_mapper(config.color_scheme.mapper());

    let images = app_dir::images_directory();
    std::fs::create_dir_all(&images)?;

    // Mandelbrot home view.
    let mandelbrot_policy = IterationPolicy::MANDELBROT.with_contrast(config.contrast);
    let home = ViewportState::home(FractalKernel::Mandelbrot, width, height)?
        .with_budget(&mandelbrot_policy)?;
    let status = render(&mut coordinator, home, config.show_progress)?;
    export(&coordinator, &home, status, &images.join("mandelbrot.png"))?;

    // Drag: only the exposed strips are computed.
    let status = coordinator
        .pan(config.pan_dx, config.pan_dy, config.show_progress)?
        .wait();
    let dragged = home.panned(config.pan_dx, config.pan_dy);
    export(&coordinator, &dragged, status, &images.join("mandelbrot_dragged.png"))?;

    // Julia set seeded from a pixel of the dragged view.
    let (cx, cy) = julia_parameter_for_pixel(config.julia_pick_x, config.julia_pick_y, &dragged);
    info!(cx, cy, "Julia parameter picked");
    let julia_policy = IterationPolicy::JULIA.with_contrast(config.contrast);
    let julia = ViewportState::home(FractalKernel::julia(cx, cy), width, height)?
        .with_budget(&julia_policy)?;
    let status = render(&mut coordinator, julia, config.show_progress)?;
    export(&coordinator, &julia, status, &images.join("julia.png"))?;

    // Close-up of the Mandelbrot set around the picked point.
    match dragged.zoomed(config.zoom_factor, config.julia_pick_x, config.julia_pick_y) {
        Ok(zoomed) => {
            let zoomed = zoomed.with_budget(&mandelbrot_policy)?;
            let status = render(&mut coordinator, zoomed, config.show_progress)?;
            export(&coordinator, &zoomed, status, &images.join("mandelbrot_zoomed.png"))?;
        }
        Err(e @ CoreError::ZoomLimit { .. }) => warn!("Skipping close-up: {e}"),
        Err(e) => return Err(e.into()),
    }

    coordinator.shutdown();
    info!("Done");
    Ok(())
}
