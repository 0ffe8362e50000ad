mod app;
mod boid;
mod config;
mod debug;
mod render;
mod sim;

use clap::Parser;

use crate::config::Cli;
use crate::sim::Simulation;

fn main() {
    env_logger::init();
    log::info!("boidflock starting up");

    if let Err(e) = run(Cli::parse()) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.world_config();
    let mode = cli.update_mode()?;
    let seed = cli.seed.unwrap_or_else(|| fastrand::u64(..));

    log::info!("World config: {config:?}");
    log::info!("Seed: {seed}");

    let sim = Simulation::seeded(&config, seed, mode)?;
    log::info!(
        "Spawned {} boids ({} right scouts, {} left scouts), update: {}",
        sim.flock().len(),
        config.right_scouts,
        config.left_scouts,
        sim.mode().label(),
    );

    app::run(sim, config.width, config.height)
}
