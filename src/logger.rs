use log::LevelFilter;
use simplelog::{ConfigBuilder, SimpleLogger};

pub fn setup_simple_logger(level: LevelFilter) -> anyhow::Result<()> {
    let logger_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("pet_care")
        .build();

    Ok(SimpleLogger::init(level, logger_config)?)
}

/// Sends spans and logs to logfire. Keep the handler alive until exit and
/// call `shutdown` on it to flush.
pub fn setup_logfire(token: &str) -> anyhow::Result<logfire::ShutdownHandler> {
    Ok(logfire::configure()
        .install_panic_handler()
        .send_to_logfire(logfire::config::SendToLogfire::Yes)
        .with_token(token)
        .finish()?)
}
