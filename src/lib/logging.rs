use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::str::FromStr;

use crate::errors::*;

const DEFAULT_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Parses `"info"`, `"DEBUG"`, etc.; `None` means `Info`.
pub fn parse_level(level: Option<&str>) -> Result<LevelFilter> {
    match level {
        None => Ok(LevelFilter::Info),
        Some(s) => LevelFilter::from_str(s).map_err(
            |_| Error::Logging(format!("unknown log level {:?}", s))
        ),
    }
}

/// Sends log output to stderr, so stdout stays free for results.
pub fn init_logging(level: LevelFilter) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(DEFAULT_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| Error::Logging(format!("{}", e)))?;

    log4rs::init_config(config).map_err(|e| Error::Logging(format!("{}", e)))?;
    Ok(())
}
