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

//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use layer_toggle::LayerKey;

#[derive(Parser, Debug)]
#[command(
    name = "hazard-map",
    version,
    about = "Toggle weather and hazard overlays on a headless map"
)]
pub struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the attached layers as GeoJSON when done
    #[arg(long, global = true, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every toolbar button and its key
    List,

    /// Toggle keys in order, waiting for each, then show the map
    Toggle {
        /// Keys such as `weather-2` or `traffic-0`
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<LayerKey>,
    },

    /// Read keys from stdin and toggle them as they arrive
    Repl,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to disk
        #[arg(long)]
        write: bool,
    },
}
