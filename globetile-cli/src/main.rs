//! GlobeTile CLI - Command-line interface
//!
//! Runs tile selection for a globe camera, renders the flat map view to a
//! PNG, samples elevation and manages `~/.globetile/config.ini`.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::altitude::AltitudeArgs;
use commands::common::{CameraArgs, GlobeKind, SourceArgs, ViewportArgs};
use commands::config::ConfigCommands;
use commands::plane::{parse_color, PlaneArgs};
use commands::select::SelectArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "globetile", version, about = "Multi-resolution globe tiles from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update the configuration file
    Init {
        /// Base picture source to record
        #[arg(long)]
        picture: Option<String>,

        /// Elevation source to record
        #[arg(long)]
        dem: Option<String>,
    },

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Select the tiles a globe camera would draw
    Select {
        #[command(flatten)]
        camera: CameraArgs,

        #[command(flatten)]
        viewport: ViewportArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// Frames to run while waiting for tiles to load
        #[arg(long, default_value_t = 10)]
        frames: u32,

        /// Print the tile list as JSON
        #[arg(long)]
        json: bool,

        /// Write each tile's composed texture into this directory
        #[arg(long)]
        textures: Option<PathBuf>,
    },

    /// Render the flat map view to a PNG
    Plane {
        /// Center latitude in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        lat: f64,

        /// Center longitude in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        lon: f64,

        /// Meters spanned by the image width
        #[arg(long)]
        scale: Option<f64>,

        #[command(flatten)]
        viewport: ViewportArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// Globe model
        #[arg(long, value_enum, default_value_t = GlobeKind::Wgs84)]
        globe: GlobeKind,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Background color as RRGGBB or RRGGBBAA
        #[arg(long, default_value = "000000", value_parser = parse_color)]
        background: [u8; 4],
    },

    /// Sample terrain altitude from the elevation model
    Altitude {
        /// Points as lat,lon
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,

        #[command(flatten)]
        sources: SourceArgs,

        /// Globe model
        #[arg(long, value_enum, default_value_t = GlobeKind::Wgs84)]
        globe: GlobeKind,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Init { picture, dem } => commands::init::run(picture, dem),
        Commands::Config { command } => commands::config::run(command),
        Commands::Select {
            camera,
            viewport,
            sources,
            frames,
            json,
            textures,
        } => commands::select::run(SelectArgs {
            camera,
            viewport,
            sources,
            frames,
            json,
            textures,
        }),
        Commands::Plane {
            lat,
            lon,
            scale,
            viewport,
            sources,
            globe,
            output,
            background,
        } => commands::plane::run(PlaneArgs {
            lat,
            lon,
            scale,
            viewport,
            sources,
            globe,
            output,
            background,
        }),
        Commands::Altitude {
            points,
            sources,
            globe,
        } => commands::altitude::run(AltitudeArgs {
            points,
            sources,
            globe,
        }),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
