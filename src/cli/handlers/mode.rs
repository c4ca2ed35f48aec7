use std::path::Path;

use crate::cli::commands::ModeArgs;
use crate::cli::output::ModeJson;
use crate::io::config_io;
use crate::model::config::ConfigError;
use crate::model::format::CaptureMode;

/// Print the default capture mode, or persist a new one.
///
/// Only `capture.default_mode` is touched; the rest of the file, comments
/// included, is written back as it was.
pub fn cmd_mode(args: ModeArgs, config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut doc) = config_io::read_config(config_path)?;

    let mode = match args.mode {
        Some(ref requested) => {
            let mode: CaptureMode = requested.parse().map_err(|m| {
                format!("unknown mode '{}' (expected inline-task or document)", m)
            })?;
            config_io::set_default_mode(&mut doc, mode);
            config_io::write_config(config_path, &doc)?;
            mode
        }
        None => config
            .capture
            .default_mode
            .parse()
            .map_err(ConfigError::InvalidMode)?,
    };

    if json {
        let out = ModeJson {
            mode,
            config: config_path.display().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if args.mode.is_some() {
        println!("default mode set to {}", mode);
    } else {
        println!("{}", mode);
    }
    Ok(())
}
