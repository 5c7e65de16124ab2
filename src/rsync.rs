use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::domain::Accession;
use crate::error::CryoError;
use crate::probe::{AttemptRequest, FetchOutcome, Payload, ProbeClient};
use crate::store::archive_dir;

/// Mirrors a bulk archive with an external `rsync` process. Only the exit
/// status is observed, so a missing entry and a broken connection both come
/// back as `TransientError`. Files land in a hidden staging directory and
/// reach `<root>/<accession>/` only after a clean exit.
#[derive(Clone)]
pub struct RsyncMirrorClient {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl RsyncMirrorClient {
    pub fn new(program: &str, timeout: Duration) -> Self {
        let candidate = Path::new(program);
        let program = if candidate.components().count() > 1 {
            candidate.exists().then(|| candidate.to_path_buf())
        } else {
            find_in_path(program)
        };
        Self { program, timeout }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn run_sync(&self, program: &Path, source: &str, target: &str) -> Result<(), String> {
        let seconds = self.timeout.as_secs().max(1);
        let args = vec![
            "-avz".to_string(),
            format!("--timeout={seconds}"),
            format!("--contimeout={seconds}"),
            source.to_string(),
            target.to_string(),
        ];
        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|err| format!("failed to start {}: {err}", program.display()))?;
        debug!(
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "rsync finished"
        );
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output
            .status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if stderr.is_empty() {
            Err(format!("rsync exited with {code}"))
        } else {
            Err(format!("rsync exited with {code}: {stderr}"))
        }
    }
}

impl ProbeClient for RsyncMirrorClient {
    fn attempt(&self, request: &AttemptRequest<'_>) -> Result<FetchOutcome, CryoError> {
        let Some(program) = self.program.as_deref() else {
            return Ok(FetchOutcome::TransientError {
                cause: "required tool not found: rsync".to_string(),
            });
        };

        let staging = staging_dir(request.workspace, request.accession);
        fs::create_dir_all(staging.as_std_path())
            .map_err(|err| CryoError::Filesystem(format!("create {staging}: {err}")))?;

        if let Err(cause) = self.run_sync(program, &request.url, &format!("{staging}/")) {
            let _ = fs::remove_dir_all(staging.as_std_path());
            return Ok(FetchOutcome::TransientError { cause });
        }

        let target = archive_dir(request.workspace, request.accession);
        if target.as_std_path().exists() {
            fs::remove_dir_all(target.as_std_path())
                .map_err(|err| CryoError::Filesystem(format!("replace {target}: {err}")))?;
        }
        fs::rename(staging.as_std_path(), target.as_std_path())
            .map_err(|err| CryoError::Filesystem(format!("rename {staging}: {err}")))?;

        Ok(FetchOutcome::Success {
            payload: Payload::Synced(target),
            source: request.template.clone(),
        })
    }
}

/// Hidden directory a sync runs into before it is renamed to its final name.
pub fn staging_dir(workspace: &Utf8Path, accession: &Accession) -> Utf8PathBuf {
    workspace.join(format!(".cryofetch-{}.partial", accession.as_str()))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
