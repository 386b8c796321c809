//! Shared command setup: configuration, logging, loader and surface.

use tracing::info;

use globetile::config::ConfigFile;
use globetile::geo::Globe;
use globetile::loader::TileLoader;
use globetile::logging::{init_logging, WorkerGuard};
use globetile::surface::{MapSurface, LAYER_COUNT};

use crate::commands::common::{open_source, SourceArgs};
use crate::error::CliError;

/// Loaded configuration plus the logging guard for one command.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// Loads the configuration file and starts logging.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let guard = init_logging(&config.logging)?;
        Ok(Self {
            config,
            _log_guard: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = globetile::VERSION,
            command,
            config = %globetile::config::config_file_path().display(),
            "globetile starting"
        );
    }

    /// Creates a loader from the `[loader]` section.
    pub fn create_loader(&self) -> TileLoader {
        TileLoader::new(self.config.loader_config())
    }

    /// Creates a surface from the configuration, with command-line sources
    /// taking precedence over configured ones.
    pub fn create_surface(&self, globe: Globe, sources: &SourceArgs) -> Result<MapSurface, CliError> {
        let config = &self.config;
        let surface_config = config.surface_configuration()?;
        let dem_encoding = surface_config.dem_encoding;
        let flip_dem_y = surface_config.flip_dem_y;

        let mut surface = MapSurface::new(surface_config, globe)?
            .with_cache_config(config.cache_config())
            .with_timeout(config.timeout);

        let picture = sources.picture.as_ref().or(config.sources.picture.as_ref());
        if let Some(picture) = picture {
            let pattern = sources.pattern.as_deref().unwrap_or(&config.sources.pattern);
            surface.set_picture_reader(open_source(picture, pattern)?);
        }

        let dem = sources.dem.as_ref().or(config.sources.dem.as_ref());
        if let Some(dem) = dem {
            let pattern = sources
                .dem_pattern
                .as_deref()
                .unwrap_or(&config.sources.dem_pattern);
            surface.set_dem_reader(open_source(dem, pattern)?, dem_encoding, flip_dem_y);
        }

        if sources.layers.len() > LAYER_COUNT {
            return Err(CliError::Usage(format!(
                "At most {} layers are supported",
                LAYER_COUNT
            )));
        }
        for (index, layer) in sources.layers.iter().enumerate() {
            let pattern = sources.pattern.as_deref().unwrap_or(&config.sources.pattern);
            surface.set_layer_reader(index, open_source(layer, pattern)?);
            surface.set_layer_opacity(index, sources.layer_opacity);
        }

        Ok(surface)
    }
}
