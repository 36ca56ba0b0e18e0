use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tokio::task::JoinHandle;

use super::models::ResolverKind;
use super::traits::Upgrader;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub kind: ResolverKind,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    pub fn get_tool_info(&self, kind: ResolverKind) -> ToolInfo {
        let (path, version) = self.detect_tool(kind);

        ToolInfo {
            name: kind.as_str().to_string(),
            kind,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ResolverKind::Ykdl),
            self.get_tool_info(ResolverKind::YouGet),
        ]
    }

    /// Path of an installed tool, or the bare binary name for PATH lookup at spawn time
    pub fn locate(&self, kind: ResolverKind) -> String {
        self.find_path(kind).unwrap_or_else(|| kind.as_str().to_string())
    }

    fn detect_tool(&self, kind: ResolverKind) -> (Option<String>, Option<String>) {
        match self.find_path(kind) {
            Some(path) => {
                let version = self.get_version(&path);
                (Some(path), version)
            }
            None => (None, None),
        }
    }

    fn find_path(&self, kind: ResolverKind) -> Option<String> {
        let binary_name = kind.as_str();

        // 1. Try common paths first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        if let Some(path) = common_paths.into_iter().find(|p| Path::new(p).exists()) {
            return Some(path);
        }

        // 2. Try PATH
        if let Ok(output) = Command::new("which").arg(binary_name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }

        None
    }

    fn get_version(&self, path: &str) -> Option<String> {
        match Command::new(path).arg("--version").output() {
            Ok(output) if output.status.success() => {
                // you-get prints its banner on stderr
                let out = if output.stdout.is_empty() {
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                } else {
                    String::from_utf8_lossy(&output.stdout).trim().to_string()
                };
                out.lines().next().map(str::to_string)
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the configured upgrade command in the background
pub struct ToolUpgrader {
    command: Vec<String>,
    spawned: Mutex<Vec<JoinHandle<()>>>,
}

impl ToolUpgrader {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            spawned: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every upgrade started through `run_upgrade`
    pub async fn wait(&self) {
        let handles: Vec<_> = self.spawned.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("upgrade task failed: {}", e);
            }
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Run the upgrade to completion, returning its combined output on failure
    pub async fn run(&self) -> Result<(), String> {
        let Some((program, args)) = self.command.split_first() else {
            return Err("upgrade command is empty".to_string());
        };

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        super::utils::apply_utf8_env(&mut cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| format!("Failed to run upgrade command {}: {}", program, e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "Upgrade failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

impl Upgrader for ToolUpgrader {
    fn run_upgrade(&self) {
        let upgrader = ToolUpgrader::new(self.command.clone());
        tracing::info!("upgrading resolvers: {}", self.command.join(" "));
        let handle = tokio::spawn(async move {
            match upgrader.run().await {
                Ok(()) => tracing::info!("resolver upgrade finished"),
                Err(e) => tracing::warn!("{}", e),
            }
        });
        self.spawned.lock().push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_falls_back_to_binary_name() {
        let manager = ToolManager::new();
        let located = manager.locate(ResolverKind::Ykdl);
        assert!(located.ends_with("ykdl"));
    }

    #[tokio::test]
    async fn upgrade_command_success_and_failure() {
        assert!(ToolUpgrader::new(vec!["true".to_string()]).run().await.is_ok());

        let err = ToolUpgrader::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo nope >&2; exit 3".to_string(),
        ])
        .run()
        .await
        .unwrap_err();
        assert!(err.contains("nope"));
    }

    #[tokio::test]
    async fn run_upgrade_launches_command_in_background() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("upgraded");
        let upgrader = ToolUpgrader::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("touch '{}'", marker.display()),
        ]);

        upgrader.run_upgrade();
        upgrader.wait().await;

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn wait_without_upgrade_returns() {
        ToolUpgrader::new(vec!["true".to_string()]).wait().await;
    }

    #[tokio::test]
    async fn empty_upgrade_command_is_rejected() {
        let err = ToolUpgrader::new(Vec::new()).run().await.unwrap_err();
        assert!(err.contains("empty"));
    }
}
