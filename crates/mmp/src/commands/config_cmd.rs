//! `mmp config`: inspect and bootstrap the config file.

use mmp_config::Config;

use super::apply_overrides;
use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = mmp_config::config_path();
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = apply_overrides(mmp_config::load_config()?, global);
            // Surface invalid values the same way backend commands would.
            cfg.backend_config()?;
            let rendered = if global.output == OutputFormat::Plain {
                toml::to_string_pretty(&cfg).map_err(|e| CliError::Render(e.to_string()))?
            } else {
                output::render_single(global.output, &cfg, |_| String::new())?
            };
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { backend, force } => {
            let path = mmp_config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            if let Some(url) = backend.or_else(|| global.backend.clone()) {
                cfg.backend.url = url;
            }
            cfg.backend_config()?;

            let path = mmp_config::save_config(&cfg)?;
            tracing::info!(path = %path.display(), "wrote config");
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }
    }
}
