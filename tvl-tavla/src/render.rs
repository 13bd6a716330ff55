//! Render drivers: the seam between the scheduler and whatever actually
//! puts pixels on the panel.
//!
//! The browser-screenshot and e-ink plumbing live outside this process;
//! a driver's whole job is to hand them a fully assembled view model.

use std::fs::File;
use std::process::Command;
use log::*;
use failure::err_msg;

use crate::config::Config;
use crate::errors::{RenderError, RenderResult, Result};
use crate::types::ViewModel;

/// Default path for the serialized view model.
static OUTPUT_PATH: &str = "./tavla.json";

/// Consumes an assembled view model once per cycle.
///
/// Implementations own whatever external resources they need, and give
/// them back in `shutdown`.
pub trait RenderTrigger {
    /// Produce output for one cycle.
    fn render(&mut self, vm: &ViewModel) -> RenderResult<()>;
    /// The scheduler just entered night mode; park the panel if there is
    /// one.
    fn night(&mut self) {}
    /// Orderly shutdown.
    fn shutdown(&mut self) {}
}

/// Writes the view model as JSON and leaves it at that: the simulation
/// mode for a dev machine with no panel attached.
pub struct SimRenderer {
    path: String,
}

impl SimRenderer {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl RenderTrigger for SimRenderer {
    fn render(&mut self, vm: &ViewModel) -> RenderResult<()> {
        write_view_model(&self.path, vm)?;
        info!("simulated render: {} board rows, {} written", vm.board.len(), self.path);
        Ok(())
    }
}

/// Writes the view model as JSON, then runs an external command with the
/// path as its final argument. The command is expected to template,
/// screenshot, and push to the panel, and to exit nonzero if it
/// couldn't.
pub struct CommandRenderer {
    path: String,
    command: String,
}

impl CommandRenderer {
    pub fn new(path: String, command: String) -> Self {
        Self { path, command }
    }
}

impl RenderTrigger for CommandRenderer {
    fn render(&mut self, vm: &ViewModel) -> RenderResult<()> {
        write_view_model(&self.path, vm)?;
        let mut parts = self.command.split_whitespace();
        let program = parts.next().unwrap_or("");
        let status = Command::new(program)
            .args(parts)
            .arg(&self.path)
            .status()?;
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(RenderError::CommandFailed(code)),
            None => Err(RenderError::CommandKilled),
        }
    }
    fn night(&mut self) {
        // The panel keeps its last image overnight; there is nothing to
        // push.
        debug!("night mode: leaving the panel as-is");
    }
    fn shutdown(&mut self) {
        info!("render driver shutting down");
    }
}

fn write_view_model(path: &str, vm: &ViewModel) -> RenderResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, vm)?;
    Ok(())
}

/// Picks a driver from configuration. An unknown name or a missing
/// render command is a startup error.
pub fn driver_from_config(cfg: &Config) -> Result<Box<dyn RenderTrigger>> {
    let path = cfg.output_path.clone().unwrap_or_else(|| OUTPUT_PATH.into());
    let name = cfg.driver.as_ref().map(|s| s as &str).unwrap_or("sim");
    match name {
        "sim" => Ok(Box::new(SimRenderer::new(path))),
        "command" => {
            let command = match cfg.render_command {
                Some(ref c) if !c.trim().is_empty() => c.clone(),
                _ => return Err(err_msg("the \"command\" driver needs render_command set")),
            };
            Ok(Box::new(CommandRenderer::new(path, command)))
        },
        other => Err(err_msg(format!("unknown render driver {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(driver: Option<&str>, command: Option<&str>) -> Config {
        let mut cfg = crate::config::test_config();
        cfg.driver = driver.map(|s| s.to_string());
        cfg.render_command = command.map(|s| s.to_string());
        cfg
    }

    #[test]
    fn defaults_to_sim_driver() {
        assert!(driver_from_config(&test_config(None, None)).is_ok());
    }

    #[test]
    fn command_driver_requires_a_command() {
        assert!(driver_from_config(&test_config(Some("command"), None)).is_err());
        assert!(driver_from_config(&test_config(Some("command"), Some("  "))).is_err());
        assert!(driver_from_config(&test_config(Some("command"), Some("render.sh --mono"))).is_ok());
    }

    #[test]
    fn unknown_driver_is_a_startup_error() {
        assert!(driver_from_config(&test_config(Some("hologram"), None)).is_err());
    }
}
