//! Init command - initialize configuration file.

use std::io::{self, Write};
use std::path::Path;

use globetile::config::config_file_path;

use super::config::load_at;
use crate::error::CliError;

/// Run the init command.
///
/// Keeps an existing configuration and only fills in sources that are not
/// set yet. A configuration that fails to load is reported, not overwritten.
pub fn run(picture: Option<String>, dem: Option<String>) -> Result<(), CliError> {
    let path = config_file_path();
    let existed = init_at(&path, picture, dem, prompt)?;

    if existed {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Run 'globetile config show' to see the effective settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Fills unset sources from the arguments or `ask`, then saves `path`.
///
/// Returns whether the file existed before.
fn init_at(
    path: &Path,
    picture: Option<String>,
    dem: Option<String>,
    mut ask: impl FnMut(&str) -> Option<String>,
) -> Result<bool, CliError> {
    let existed = path.exists();
    let mut config = load_at(path)?;

    if config.sources.picture.is_none() {
        config.sources.picture = picture.or_else(|| ask("Picture source (directory or URL)"));
    }
    if config.sources.dem.is_none() {
        config.sources.dem = dem.or_else(|| ask("Elevation source (directory or URL)"));
    }
    config.save_to(path)?;
    Ok(existed)
}

/// Reads one line from stdin; empty input skips.
fn prompt(label: &str) -> Option<String> {
    print!("{}, or press Enter to skip: ", label);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return None;
    }
    let input = input.trim();
    if input.is_empty() {
        println!("Skipped.");
        return None;
    }
    Some(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn never_asked(label: &str) -> Option<String> {
        panic!("unexpected prompt: {}", label)
    }

    #[test]
    fn test_creates_file_with_given_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        let existed = init_at(
            &path,
            Some("/data/tiles".into()),
            Some("https://dem.example.org".into()),
            never_asked,
        )
        .unwrap();

        assert!(!existed);
        let config = load_at(&path).unwrap();
        assert_eq!(config.sources.picture.as_deref(), Some("/data/tiles"));
        assert_eq!(config.sources.dem.as_deref(), Some("https://dem.example.org"));
    }

    #[test]
    fn test_keeps_existing_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        init_at(&path, Some("/first".into()), None, |_| None).unwrap();

        let mut asked = Vec::new();
        let existed = init_at(&path, Some("/second".into()), None, |label| {
            asked.push(label.to_string());
            Some("/dem".into())
        })
        .unwrap();

        assert!(existed);
        assert_eq!(asked.len(), 1);
        let config = load_at(&path).unwrap();
        assert_eq!(config.sources.picture.as_deref(), Some("/first"));
        assert_eq!(config.sources.dem.as_deref(), Some("/dem"));
    }

    #[test]
    fn test_invalid_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        let contents = "[sources]\npicture=/data/tiles\n\n[surface]\nminimum_level=5\nmaximum_level=2\n";
        std::fs::write(&path, contents).unwrap();

        assert!(init_at(&path, None, None, never_asked).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }
}
