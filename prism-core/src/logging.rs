use std::sync::Once;

/// Filter used when neither the settings file nor `RUST_LOG` provide one.
/// Keeps wgpu's HAL quiet and only surfaces naga warnings.
pub const DEFAULT_FILTER: &str = "info,wgpu_hal=off,naga=warn";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig
{
  /// `env_logger` filter syntax, e.g. "info" or "prism_core=debug,wgpu=warn".
  pub filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initialises the global logger. Later calls are ignored.
///
/// Precedence: explicit filter, then `RUST_LOG`, then [`DEFAULT_FILTER`].
pub fn init_logging(config: LoggingConfig)
{
  INIT.call_once(|| {
    let filter = config
      .filter
      .or_else(|| std::env::var("RUST_LOG").ok())
      .unwrap_or_else(|| DEFAULT_FILTER.to_owned());

    env_logger::Builder::new().parse_filters(&filter).init();

    log::debug!("logging initialised with filter `{}`", filter);
  });
}
