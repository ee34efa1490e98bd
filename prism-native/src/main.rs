mod app;
mod input;
mod renderer;

use std::path::PathBuf;
use std::process::ExitCode;

use prism_core::logging::{init_logging, LoggingConfig};
use prism_core::Settings;

fn main() -> ExitCode
{
  // Optional first argument: path to a JSON settings file.
  let settings_path = std::env::args_os().nth(1).map(PathBuf::from);

  let settings = match Settings::load_or_default(settings_path.as_deref())
  {
    Ok(settings) => settings,
    Err(err) =>
    {
      init_logging(LoggingConfig::default());
      log::error!("{:#}", anyhow::Error::new(err));
      return ExitCode::FAILURE;
    }
  };

  init_logging(LoggingConfig { filter: settings.log_filter.clone() });

  match app::run(settings)
  {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) =>
    {
      log::error!("{:#}", err);
      ExitCode::FAILURE
    }
  }
}
