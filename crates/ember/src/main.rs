//! Ember host binary.
//!
//! Loads configuration, sets up logging, loads mods and then drives them
//! from a fixed tick loop. Input arrives as console commands on stdin;
//! SIGINT/SIGTERM or `quit` shut the host down.

mod cli;
mod config;
mod console;
mod logging;
mod signals;

use anyhow::{anyhow, Context, Result};
use cli::CliArgs;
use config::AppConfig;
use console::{ConsoleCommand, HELP};
use ember_host::{create_mod_manager, ModManager};
use hell_mod::HellMod;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub struct Application {
    config: AppConfig,
    manager: ModManager,
    max_ticks: Option<u64>,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        // Configuration comes first so logging can honour it.
        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .with_context(|| format!("failed to load {}", args.config_path.display()))?;

        if let Some(mods_dir) = args.mods_dir {
            config.mods.directory = mods_dir.to_string_lossy().to_string();
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        logging::setup_logging(&config.logging, args.json_logs)?;

        let mut manager = create_mod_manager(config.to_host_config()?);
        if args.example_mod {
            manager
                .register(Box::new(HellMod::new()))
                .context("failed to register the example mod")?;
        }

        info!(
            "Ember v{} | Config: {} | Mods: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display(),
            config.mods.directory
        );

        Ok(Self {
            config,
            manager,
            max_ticks: args.ticks,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        if self.config.mods.auto_load {
            self.manager.load_all_mods().await?;
        }

        info!("Configuration Summary:");
        info!("  Tick interval: {}ms", self.config.host.tick_interval_ms);
        info!("  Zoom: {} ({:?})", self.manager.zoom(), self.config.zoom_policy()?);
        info!("  Mods loaded: {}", self.manager.mod_count());
        info!("Type `help` for console commands, Ctrl+C to shut down");

        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.host.tick_interval_ms));
        let mut last_tick = Instant::now();
        let mut ticks = 0u64;

        let mut lines = console::spawn_reader();
        let mut console_open = true;

        let shutdown = signals::wait_for_shutdown();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Instant::now();
                    let delta = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    let summary = self.manager.update(delta);
                    if summary.failed > 0 {
                        warn!("{} of {} callbacks failed on tick {}", summary.failed, summary.delivered, ticks);
                    }

                    ticks += 1;
                    if self.max_ticks.is_some_and(|max| ticks >= max) {
                        info!("Reached {} ticks", ticks);
                        break;
                    }
                }
                line = lines.recv(), if console_open => {
                    match line {
                        Some(line) => {
                            if !self.handle_line(&line)? {
                                break;
                            }
                        }
                        None => {
                            info!("Console input closed");
                            console_open = false;
                        }
                    }
                }
                result = &mut shutdown => {
                    result?;
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.manager.shutdown_all();
        info!("Ember shutdown complete after {} ticks", ticks);
        Ok(())
    }

    /// Runs one console line. Returns `false` when the host should stop.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = match ConsoleCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(true),
            Err(e) => {
                println!("{}", e);
                return Ok(true);
            }
        };

        match command {
            ConsoleCommand::Scroll(delta) => {
                self.manager.scroll(delta);
                println!("zoom: {}", self.manager.zoom());
            }
            ConsoleCommand::Key(key) => {
                let summary = self.manager.key_event(key);
                println!("delivered to {} mods", summary.delivered);
            }
            ConsoleCommand::Press(key) => {
                let summary = self.manager.press_key(key);
                println!("delivered to {} mods", summary.delivered);
            }
            ConsoleCommand::Release(key) => self.manager.release_key(key),
            ConsoleCommand::Mouse(position) => {
                self.manager.state_mut().set_mouse_position(position);
            }
            ConsoleCommand::Emit { name, data } => {
                let queued = self.manager.emit_event(&name, data);
                println!("queued for {} mods", queued);
            }
            ConsoleCommand::Zoom => println!("zoom: {}", self.manager.zoom()),
            ConsoleCommand::Camera => {
                let camera = &self.manager.state().camera;
                println!("camera: {} zoom: {}", camera.position(), camera.zoom());
            }
            ConsoleCommand::ClearLog => {
                self.manager.state_mut().clear_log();
                println!("log cleared");
            }
            ConsoleCommand::Mods => {
                println!("{}", serde_json::to_string_pretty(&self.manager.loaded_mods())?);
            }
            ConsoleCommand::Stats => {
                println!("{}", serde_json::to_string_pretty(&self.manager.stats())?);
            }
            ConsoleCommand::Reload(Some(handle)) => match self.manager.reload(handle) {
                Ok(()) => println!("reloaded {}", handle),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Reload(None) => {
                let reloaded = self.manager.reload_all();
                println!("reloaded {} mods", reloaded.len());
            }
            ConsoleCommand::Unload(handle) => match self.manager.unload(handle) {
                Ok(()) => println!("unloaded {}", handle),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }
}
