//! Desktop integration: application launcher, file finder and URL opener.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::SystemControl;
use crate::error::{AssistantError, Result};

/// How an application will be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Run this executable directly.
    Executable(PathBuf),
    /// macOS application bundle name, started with `open -a`.
    MacApp(String),
}

/// Launcher and finder for the local machine.
#[derive(Debug, Clone)]
pub struct DesktopSystem {
    applications: BTreeMap<String, String>,
    search_root: PathBuf,
}

impl DesktopSystem {
    /// `applications` maps lower-case spoken names to executables.
    pub fn new(applications: BTreeMap<String, String>, search_root: PathBuf) -> Self {
        let applications = applications
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        Self {
            applications,
            search_root,
        }
    }

    /// Work out how to start `app_name`, or the message explaining why not.
    pub fn resolve(&self, app_name: &str) -> std::result::Result<Launch, String> {
        let name = app_name.trim();
        let Some(target) = self.applications.get(&name.to_lowercase()) else {
            return Err(format!("Sorry, I don't have the path for '{name}' configured."));
        };
        let target_path = Path::new(target);

        if target_path.components().count() > 1 {
            return if target_path.exists() {
                Ok(Launch::Executable(target_path.to_path_buf()))
            } else {
                Err(format!(
                    "I found a path for '{name}', but it seems incorrect. Please check the [apps] section of your config."
                ))
            };
        }
        if let Ok(found) = which::which(target) {
            return Ok(Launch::Executable(found));
        }
        if cfg!(target_os = "macos") {
            return Ok(Launch::MacApp(target.clone()));
        }
        Err(format!(
            "Sorry, I couldn't find the application at the path: '{target}'."
        ))
    }
}

#[async_trait]
impl SystemControl for DesktopSystem {
    fn open_application(&self, app_name: &str) -> Result<String> {
        let launch = match self.resolve(app_name) {
            Ok(launch) => launch,
            Err(message) => return Ok(message),
        };
        debug!(?launch, "launching application");
        match &launch {
            Launch::Executable(path) => spawn_detached(path, std::iter::empty::<&OsStr>())?,
            Launch::MacApp(bundle) => spawn_detached("open", ["-a", bundle.as_str()])?,
        }
        info!(app = app_name.trim(), "application launched");
        Ok(format!("I've launched {} for you.", display_name(app_name)))
    }

    async fn find_file(&self, file_name: &str, search_directory: Option<&str>) -> Result<String> {
        let file_name = file_name.trim().to_owned();
        let root = search_directory
            .map(|d| PathBuf::from(d.trim()))
            .unwrap_or_else(|| self.search_root.clone());
        info!(%file_name, root = %root.display(), "searching for file");

        let (name, dir) = (file_name.clone(), root.clone());
        let found = tokio::task::spawn_blocking(move || find_first(&dir, &name))
            .await
            .map_err(|e| AssistantError::System(format!("file search failed: {e}")))?;

        Ok(match found {
            Some(path) => format!("I found the file. It is located at: {}", path.display()),
            None => format!(
                "Sorry, I could not find the file '{file_name}' within the directory '{}'.",
                root.display()
            ),
        })
    }
}

/// First regular file under `root` named exactly `file_name`. Unreadable
/// directories are skipped.
pub fn find_first(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == OsStr::new(file_name))
        .map(walkdir::DirEntry::into_path)
}

/// Open `url` in the system browser.
///
/// # Errors
///
/// Returns an error if the platform opener cannot be started.
pub fn open_url(url: &str) -> Result<()> {
    if cfg!(target_os = "windows") {
        spawn_detached("cmd", ["/C", "start", "", url])
    } else if cfg!(target_os = "macos") {
        spawn_detached("open", [url])
    } else {
        spawn_detached("xdg-open", [url])
    }
}

/// Start a process without waiting for it or inheriting stdio.
fn spawn_detached<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
        .map_err(|e| {
            AssistantError::System(format!("cannot start {}: {e}", program.to_string_lossy()))
        })
}

fn display_name(app_name: &str) -> String {
    app_name
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
