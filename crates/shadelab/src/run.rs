use anyhow::Result;
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    tracing::info!(
        shader = %cli.shader.display(),
        width = cli.size.0,
        height = cli.size.1,
        fps = cli.fps,
        "starting shadelab"
    );

    let config = RendererConfig {
        surface_size: cli.size,
        shader_base: cli.shader,
        target_fps: cli.fps,
    };

    let mut renderer = Renderer::new(config);
    renderer.run()
}
