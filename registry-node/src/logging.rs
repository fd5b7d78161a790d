// Logging setup (spec "Ambient stack"): colored stdout plus a date-rotated
// log file, mirroring the fern configuration daemons elsewhere in this
// workspace use.

use anyhow::Context;
use fern::colors::{Color, ColoredLevelConfig};
use std::path::Path;

pub fn init(log_dir: impl AsRef<Path>, level: log::LevelFilter) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .debug(Color::Green)
        .info(Color::Cyan)
        .warn(Color::Yellow)
        .error(Color::Red);

    std::fs::create_dir_all(log_dir.as_ref()).context("creating log directory")?;

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(fern::DateBased::new(log_dir.as_ref().join("registryd."), "%Y-%m-%d.log"))
        .apply()
        .context("installing global logger")?;

    Ok(())
}
