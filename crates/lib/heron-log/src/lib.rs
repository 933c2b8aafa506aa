use fern::colors::{Color, ColoredLevelConfig};

/// Route the `log` facade to stdout with timestamps and colored levels.
pub fn setup(level: log::LevelFilter) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::Cyan)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

/// Logger setup for tests. Safe to call from every test, only the first call
/// installs the logger.
pub fn setup_for_test() {
    let _ = setup(log::LevelFilter::Debug);
}
