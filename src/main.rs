// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod canvas;
mod catalog;
mod cli;
mod config;
mod layer;
mod providers;

use std::error::Error;
use std::path::Path;

use clap::Parser;
use layer_toggle::{Category, ControllerConfig, KeyState, LayerKey, ToggleController};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use canvas::HeadlessCanvas;
use cli::{Cli, Command};
use config::AppConfig;
use providers::DataClient;

type Controller = ToggleController<HeadlessCanvas>;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    if let Command::Config { write } = cli.command {
        return show_config(&config, cli.config.as_deref(), write);
    }

    let client = DataClient::new(config.http_timeout())?;
    let registry = catalog::build_registry(&config, client);
    let controller = ToggleController::with_config(
        registry,
        HeadlessCanvas::new(),
        ControllerConfig {
            action_timeout: config.action_timeout(),
        },
    );
    info!("Map session started with {} layer action(s)", controller.registry().len());

    match cli.command {
        Command::List => print_toolbar(&controller),
        Command::Toggle { keys } => {
            for key in keys {
                let outcome = controller.toggle(&key).await;
                println!("{key}: {outcome}");
            }
            print_map(&controller);
        }
        Command::Repl => repl(&controller).await?,
        Command::Config { .. } => {}
    }

    if let Some(path) = &cli.export {
        export(&controller, path).await?;
    }

    controller.shutdown();
    Ok(())
}

fn show_config(config: &AppConfig, path: Option<&Path>, write: bool) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: {}", AppConfig::get_config_path()?.display()),
    }

    let mut shown = config.clone();
    shown.cwa_api_key = config.cwa_api_key().map(|_| "********".to_string());
    shown.ncdr_api_key = config.ncdr_api_key().map(|_| "********".to_string());
    println!("{}", serde_json::to_string_pretty(&shown)?);

    if write {
        config.save(path)?;
        println!("Configuration written");
    }
    Ok(())
}

fn state_marker(state: KeyState) -> &'static str {
    match state {
        KeyState::Idle => "[ ]",
        KeyState::Pending => "[~]",
        KeyState::Active => "[x]",
    }
}

fn print_toolbar(controller: &Controller) {
    for category in Category::ALL {
        let (label, icon) = catalog::category_label(category);
        println!("{label} ({icon})");

        let actions = controller.registry().actions(category);
        if actions.is_empty() {
            println!("    (no layers yet)");
        }
        for (index, action) in actions.iter().enumerate() {
            let key = category.key(index);
            let loading = controller
                .pending_for(&key)
                .map(|age| format!(" loading {:.1}s", age.as_secs_f64()))
                .unwrap_or_default();
            println!(
                "  {} {:<24} {} ({}){}",
                state_marker(controller.state(&key)),
                key.to_string(),
                action.title(),
                action.icon(),
                loading
            );
        }
    }
}

fn print_map(controller: &Controller) {
    let layers = controller.canvas().layers();
    if layers.is_empty() {
        println!("Map: no overlays");
        return;
    }
    println!("Map: {} overlay(s)", layers.len());
    for layer in layers {
        println!("  {}", layer.summary());
    }
}

async fn export(controller: &Controller, path: &Path) -> Result<(), Box<dyn Error>> {
    let document = serde_json::to_string_pretty(&controller.canvas().to_feature_collection())?;
    tokio::fs::write(path, document).await?;
    info!("Exported {} layer(s) to {}", controller.canvas().len(), path.display());
    Ok(())
}

fn print_repl_help() {
    println!("Enter a key (e.g. weather-2) to toggle it.");
    println!("Commands: list, map, wait, help, quit");
}

async fn wait_all(in_flight: &mut Vec<JoinHandle<()>>) {
    for handle in in_flight.drain(..) {
        if let Err(e) = handle.await {
            error!("Toggle task failed: {}", e);
        }
    }
}

/// Toggle keys as they are typed, without waiting for slow layers.
async fn repl(controller: &Controller) -> Result<(), Box<dyn Error>> {
    print_repl_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "quit" | "exit" => break,
            "list" | "ls" => print_toolbar(controller),
            "map" => print_map(controller),
            "wait" => wait_all(&mut in_flight).await,
            "help" => print_repl_help(),
            input => match input.parse::<LayerKey>() {
                Ok(key) => {
                    let toggle = controller.spawn_toggle(key);
                    in_flight.push(tokio::spawn(async move {
                        match toggle.await {
                            Ok(outcome) => println!("{key}: {outcome}"),
                            Err(e) => error!("Toggle of {} failed: {}", key, e),
                        }
                    }));
                }
                Err(e) => eprintln!("{e}"),
            },
        }
        in_flight.retain(|handle| !handle.is_finished());
    }

    wait_all(&mut in_flight).await;
    print_map(controller);
    Ok(())
}
