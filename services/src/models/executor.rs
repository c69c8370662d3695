use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Map, Value, json};
use snafu::{ResultExt, ensure};
use tracing::{debug, info, instrument};

use super::InvestModel;
use crate::error::{self, Result};

/// Runs a model with prepared arguments and returns the path of its main result.
pub trait ModelExecutor: Send + Sync {
    fn execute(
        &self,
        model: InvestModel,
        args: &Map<String, Value>,
        workspace: &Path,
    ) -> Result<PathBuf>;
}

/// Runs models through the command line interface of the model suite.
///
/// The arguments are passed as datastack file. The last line that the command prints to stdout
/// is taken as the result path if it names an existing file, otherwise the workspace is the
/// result.
#[derive(Debug, Clone)]
pub struct CommandModelExecutor {
    program: String,
    leading_args: Vec<String>,
}

impl CommandModelExecutor {
    /// `command_line` is split at whitespace into the program and its first arguments,
    /// e.g., `invest` or `micromamba run -n invest invest`.
    pub fn new(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(ToOwned::to_owned);

        Self {
            program: parts.next().unwrap_or_else(|| "invest".to_owned()),
            leading_args: parts.collect(),
        }
    }

    fn write_datastack(
        model: InvestModel,
        args: &Map<String, Value>,
        workspace: &Path,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(workspace).context(error::WorkspaceCreationSnafu {
            path: workspace.to_path_buf(),
        })?;

        let datastack_path = workspace.join(format!("{model}_datastack.json"));
        let datastack = json!({
            "args": args,
            "model_name": model.module_name(),
        });
        std::fs::write(&datastack_path, serde_json::to_vec_pretty(&datastack)?)?;

        Ok(datastack_path)
    }
}

impl ModelExecutor for CommandModelExecutor {
    #[instrument(skip(self, args))]
    fn execute(
        &self,
        model: InvestModel,
        args: &Map<String, Value>,
        workspace: &Path,
    ) -> Result<PathBuf> {
        let datastack_path = Self::write_datastack(model, args, workspace)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("run")
            .arg(model.to_string())
            .arg("--headless")
            .arg("--datastack")
            .arg(&datastack_path)
            .arg("--workspace")
            .arg(workspace);

        debug!(?command, "running model");

        let output = command.output().context(error::ModelCommandSnafu {
            command: self.program.clone(),
        })?;

        ensure!(
            output.status.success(),
            error::ModelExecutionSnafu {
                model: model.to_string(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result_path = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .unwrap_or_else(|| workspace.to_path_buf());

        info!(%model, result = %result_path.display(), "model finished");

        Ok(result_path)
    }
}
