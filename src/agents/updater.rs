use crate::agents::decision_engine::UpdatePlan;
use crate::error::{FwGateError, Result};
use crate::utils::verbose_enabled;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long output is drained once the update tool has exited
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs the firmware update for a resolved plan
pub trait UpdateLauncher {
    fn launch(&self, plan: &UpdatePlan) -> Result<()>;
}

/// UpdaterProcess executes the external update tool as `<updater> -f <image>`
pub struct UpdaterProcess {
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl UpdaterProcess {
    pub fn new<P: AsRef<Path>>(working_dir: P, timeout: Option<Duration>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout,
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child
                .wait()
                .map_err(|e| FwGateError::Updater(format!("Failed to wait for process: {}", e)));
        };

        let started = Instant::now();
        loop {
            let polled = child
                .try_wait()
                .map_err(|e| FwGateError::Updater(format!("Failed to wait for process: {}", e)))?;
            if let Some(status) = polled {
                return Ok(status);
            }

            if started.elapsed() >= timeout {
                // kill can fail if the process exited in between; the error below still holds
                let _ = child.kill();
                let _ = child.wait();
                return Err(FwGateError::Updater(format!(
                    "Update tool did not finish within {:?}",
                    timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl UpdateLauncher for UpdaterProcess {
    fn launch(&self, plan: &UpdatePlan) -> Result<()> {
        let args = plan.args();
        println!(
            "Executing: {} {}",
            plan.updater.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&plan.updater)
            .current_dir(&self.working_dir)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| FwGateError::Updater(format!("Failed to spawn process: {}", e)))?;

        // Stream stdout while the main thread waits so a timeout can still fire
        let streamer = child.stdout.take().map(|stdout| {
            thread::spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines().map_while(std::result::Result::ok) {
                    println!("{}", line);
                }
            })
        });

        let status = self.wait(&mut child)?;

        if let Some(handle) = streamer {
            finish_streaming(handle);
        }

        if !status.success() {
            return Err(FwGateError::Updater(match status.code() {
                Some(code) => format!("Update tool failed with exit code: {}", code),
                None => "Update tool was terminated by a signal".to_string(),
            }));
        }

        Ok(())
    }
}

/// Join the output thread unless a helper forked by the tool still holds the
/// pipe open; in that case the thread is left to end on its own.
fn finish_streaming(handle: JoinHandle<()>) {
    let deadline = Instant::now() + OUTPUT_DRAIN_GRACE;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            if verbose_enabled() {
                eprintln!("[VERBOSE] Update tool output still open after exit, not waiting for it");
            }
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if handle.join().is_err() && verbose_enabled() {
        eprintln!("[VERBOSE] Output streaming thread panicked");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn plan(updater: PathBuf, image: PathBuf) -> UpdatePlan {
        UpdatePlan { updater, image }
    }

    #[test]
    fn test_launch_passes_image_argument() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("D4XX_FW_Image-5.13.0.bin");
        fs::write(&image, b"").unwrap();
        let record = dir.path().join("args.txt");
        let updater = script(
            dir.path(),
            "rs-fw-update",
            &format!("echo \"$@\" > '{}'", record.display()),
        );

        UpdaterProcess::new(dir.path(), None)
            .launch(&plan(updater, image.clone()))
            .unwrap();

        let recorded = fs::read_to_string(record).unwrap();
        assert_eq!(recorded.trim(), format!("-f {}", image.display()));
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let dir = tempdir().unwrap();
        let updater = script(dir.path(), "rs-fw-update", "exit 3");
        let err = UpdaterProcess::new(dir.path(), None)
            .launch(&plan(updater, dir.path().join("image.bin")))
            .unwrap_err();
        assert!(matches!(err, FwGateError::Updater(ref msg) if msg.contains('3')));
    }

    #[test]
    fn test_spawn_failure() {
        let dir = tempdir().unwrap();
        let err = UpdaterProcess::new(dir.path(), None)
            .launch(&plan(
                dir.path().join("missing-tool"),
                dir.path().join("image.bin"),
            ))
            .unwrap_err();
        assert!(matches!(err, FwGateError::Updater(_)));
    }

    #[test]
    fn test_timeout_kills_updater() {
        let dir = tempdir().unwrap();
        let updater = script(dir.path(), "rs-fw-update", "exec sleep 30");
        let started = Instant::now();
        let err = UpdaterProcess::new(dir.path(), Some(Duration::from_millis(300)))
            .launch(&plan(updater, dir.path().join("image.bin")))
            .unwrap_err();
        assert!(matches!(err, FwGateError::Updater(ref msg) if msg.contains("300ms")));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_exit_not_blocked_by_forked_helper() {
        let dir = tempdir().unwrap();
        let updater = script(dir.path(), "rs-fw-update", "sleep 15 &\necho flashed");
        let started = Instant::now();
        UpdaterProcess::new(dir.path(), None)
            .launch(&plan(updater, dir.path().join("image.bin")))
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
