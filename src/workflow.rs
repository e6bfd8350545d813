use crate::agents::{
    DeviceInfo, DeviceInventory, DeviceProvider, EngineConfig, FixedDevice, UpdateDecision,
    UpdateDecisionEngine, UpdateLauncher, UpdatePlan, UpdaterProcess, select_single_device,
};
use crate::cli::DeviceArgs;
use crate::config::Config;
use crate::error::{FwGateError, Result};
use crate::utils::search_root::resolve_search_root;
use crate::utils::verbose_enabled;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Device already runs the bundled firmware or newer
    UpToDate,
    /// Update needed, tool and image resolved, nothing launched
    DryRun(UpdatePlan),
    /// Update tool ran to completion
    Launched(UpdatePlan),
}

/// Machine readable result of `check --json`
#[derive(Debug, Serialize)]
pub struct DecisionReport {
    pub generated_at: String,
    pub device: DeviceInfo,
    pub decision: UpdateDecision,
}

impl DecisionReport {
    pub fn new(device: DeviceInfo, decision: UpdateDecision) -> Self {
        Self {
            generated_at: jiff::Timestamp::now().to_string(),
            device,
            decision,
        }
    }
}

/// Coloured step output; silent when stdout carries JSON
struct Console {
    quiet: bool,
}

impl Console {
    fn title(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.cyan().bold());
        }
    }

    fn step(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", message.yellow());
        }
    }

    fn ok(&self, message: &str) {
        if !self.quiet {
            println!("{}", format!("✓ {}", message).green());
        }
    }

    fn detail(&self, message: &str) {
        if !self.quiet {
            println!("   {}", message);
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if self.quiet {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Everything a run needs, resolved from the CLI and config file
struct RunContext {
    root: PathBuf,
    config: Config,
    engine: UpdateDecisionEngine,
}

impl RunContext {
    fn prepare(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let root = resolve_search_root(root)?;
        let config = Config::load(&root, config_path)?;
        let engine = UpdateDecisionEngine::new(EngineConfig {
            manifest_path: config.manifest_path(&root),
            search_root: root.clone(),
            updater_name: config.updater_name.clone(),
        });
        Ok(Self {
            root,
            config,
            engine,
        })
    }
}

/// Execute the update workflow
pub fn execute_update(
    root: &Path,
    config_path: Option<&Path>,
    device: &DeviceArgs,
    dry_run: bool,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let mut ctx = RunContext::prepare(root, config_path)?;
    if let Some(secs) = timeout_secs {
        if secs == 0 {
            return Err(FwGateError::Config("--timeout must be positive".into()));
        }
        ctx.config.timeout_secs = Some(secs);
    }

    let provider = device_provider(device)?;
    let launcher = UpdaterProcess::new(&ctx.root, ctx.config.timeout());
    let console = Console { quiet: false };

    console.title("Starting firmware update check...");
    let outcome = run_with_console(
        &ctx.engine,
        provider.as_ref(),
        &launcher,
        &ctx.config.supported_product_lines,
        dry_run,
        &console,
    )?;

    match outcome {
        RunOutcome::UpToDate => {}
        RunOutcome::DryRun(plan) => {
            println!("\n{}", "Dry run, the update tool was not started:".yellow());
            println!("  {}", format_command(&plan).cyan());
        }
        RunOutcome::Launched(_) => {
            println!("\n{}", "✨ Firmware update completed successfully!".green().bold());
        }
    }

    Ok(())
}

/// Execute the check workflow (never flashes)
pub fn execute_check(
    root: &Path,
    config_path: Option<&Path>,
    device: &DeviceArgs,
    json: bool,
) -> Result<()> {
    let ctx = RunContext::prepare(root, config_path)?;
    let provider = device_provider(device)?;
    let console = Console { quiet: json };

    console.title("Checking device firmware...");
    let (device, decision) = decide(
        &ctx.engine,
        provider.as_ref(),
        &ctx.config.supported_product_lines,
        &console,
    )?;

    if json {
        let report = DecisionReport::new(device, decision);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(plan) = &decision.plan {
        println!("\n{}", "To apply this update, run:".dimmed());
        println!("  {}", format_command(plan).cyan());
    }
    Ok(())
}

/// List every file a lookup for `name` would consider, marking the one chosen
pub fn execute_locate(root: &Path, name: &str) -> Result<()> {
    let root = resolve_search_root(root)?;
    let engine = UpdateDecisionEngine::new(EngineConfig {
        manifest_path: PathBuf::new(),
        search_root: root.clone(),
        updater_name: name.to_string(),
    });

    let console = Console { quiet: false };
    let pb = console.spinner(&format!("Searching {}", root.display()));
    let candidates = engine.candidates(name)?;
    pb.finish_and_clear();

    if candidates.is_empty() {
        println!("{}", format!("No file named '{}' below {}", name, root.display()).red());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} file(s) named '{}':", candidates.len(), name).cyan().bold()
    );
    let last = candidates.len() - 1;
    for (idx, candidate) in candidates.iter().enumerate() {
        if idx == last {
            println!("  • {} {}", candidate.green().bold(), "(selected)".dimmed());
        } else {
            println!("  • {}", candidate);
        }
    }
    Ok(())
}

/// Preflight, pick the device, decide, and launch the update tool on GO.
///
/// Device selection happens after the manifest and update tool are known to
/// exist; a device count error stops the run before any further lookup.
fn run_with_console(
    engine: &UpdateDecisionEngine,
    devices: &dyn DeviceProvider,
    launcher: &dyn UpdateLauncher,
    supported_product_lines: &[String],
    dry_run: bool,
    console: &Console,
) -> Result<RunOutcome> {
    let (_, decision) = decide(engine, devices, supported_product_lines, console)?;

    let Some(plan) = decision.plan else {
        return Ok(RunOutcome::UpToDate);
    };

    if dry_run {
        return Ok(RunOutcome::DryRun(plan));
    }

    console.step("5. Running update tool...");
    launcher.launch(&plan)?;
    console.ok("Update tool finished");
    Ok(RunOutcome::Launched(plan))
}

fn decide(
    engine: &UpdateDecisionEngine,
    devices: &dyn DeviceProvider,
    supported_product_lines: &[String],
    console: &Console,
) -> Result<(DeviceInfo, UpdateDecision)> {
    console.step("1. Validating build tree...");
    let pb = console.spinner("Searching for the update tool");
    let preflight = engine.preflight();
    pb.finish_and_clear();
    let preflight = preflight?;
    console.detail(&format!(
        "Manifest: {}",
        engine.config().manifest_path.display()
    ));
    console.detail(&format!("Update tool: {}", preflight.updater.display()));
    console.ok("Build tree is valid");

    console.step("2. Querying attached device...");
    let device = select_single_device(devices, supported_product_lines)?;
    console.detail(&format!(
        "{} running FW {}",
        device.display_name().bright_cyan(),
        device.firmware_version
    ));

    console.step("3. Comparing with bundled firmware...");
    let pb = console.spinner("Resolving firmware image");
    let decision = engine.decide(&preflight, &device);
    pb.finish_and_clear();
    let decision = decision?;

    if verbose_enabled() {
        eprintln!("[VERBOSE] Decision: {:?}", decision);
    }

    if decision.is_up_to_date() {
        console.ok(&format!(
            "No update needed: FW version is already {} (bundled {})",
            decision.device_version, decision.bundled_version
        ));
        return Ok((device, decision));
    }

    console.detail(&format!(
        "{} → {}",
        decision.device_version.red(),
        decision.bundled_version.green().bold()
    ));
    if let Some(plan) = &decision.plan {
        console.step("4. Firmware image resolved");
        console.detail(&plan.image.display().to_string());
    }
    Ok((device, decision))
}

fn device_provider(args: &DeviceArgs) -> Result<Box<dyn DeviceProvider>> {
    match (&args.devices, &args.firmware_version, &args.product_line) {
        (Some(path), None, None) => Ok(Box::new(DeviceInventory::new(path))),
        (None, Some(version), Some(product_line)) => Ok(Box::new(FixedDevice::new(
            DeviceInfo::new(version.as_str(), product_line.as_str()),
        ))),
        _ => Err(FwGateError::Config(
            "Pass either --devices <FILE> or both --firmware-version and --product-line".into(),
        )),
    }
}

fn format_command(plan: &UpdatePlan) -> String {
    let args: Vec<String> = plan
        .args()
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    format!("{} {}", plan.updater.display(), args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const MANIFEST: &str = "#pragma once\n#define D4XX_FW_VERSION \"5.13.0\"\n";

    struct StubDevices {
        devices: Vec<DeviceInfo>,
        queried: Cell<bool>,
    }

    impl StubDevices {
        fn new(devices: Vec<DeviceInfo>) -> Self {
            Self {
                devices,
                queried: Cell::new(false),
            }
        }
    }

    impl DeviceProvider for StubDevices {
        fn query(&self) -> Result<Vec<DeviceInfo>> {
            self.queried.set(true);
            Ok(self.devices.clone())
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        launched: RefCell<Vec<UpdatePlan>>,
        fail: bool,
    }

    impl UpdateLauncher for RecordingLauncher {
        fn launch(&self, plan: &UpdatePlan) -> Result<()> {
            self.launched.borrow_mut().push(plan.clone());
            if self.fail {
                return Err(FwGateError::Updater("Failed to spawn process".into()));
            }
            Ok(())
        }
    }

    fn build_tree() -> (TempDir, UpdateDecisionEngine) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("common/fw")).unwrap();
        fs::write(root.join("common/fw/firmware-version.h"), MANIFEST).unwrap();
        fs::create_dir_all(root.join("build/Release")).unwrap();
        fs::write(root.join("build/Release/rs-fw-update.exe"), b"").unwrap();
        fs::create_dir_all(root.join("build/common/fw")).unwrap();
        fs::write(root.join("build/common/fw/D4XX_FW_Image-5.13.0.bin"), b"").unwrap();

        let engine = UpdateDecisionEngine::new(EngineConfig {
            manifest_path: root.join("common/fw/firmware-version.h"),
            search_root: root.to_path_buf(),
            updater_name: "rs-fw-update.exe".to_string(),
        });
        (dir, engine)
    }

    fn run(
        engine: &UpdateDecisionEngine,
        devices: &dyn DeviceProvider,
        launcher: &dyn UpdateLauncher,
        supported_product_lines: &[String],
        dry_run: bool,
    ) -> Result<RunOutcome> {
        let console = Console { quiet: true };
        run_with_console(
            engine,
            devices,
            launcher,
            supported_product_lines,
            dry_run,
            &console,
        )
    }

    fn masks() -> Vec<String> {
        Config::default().supported_product_lines
    }

    #[test]
    fn test_outdated_device_launches_update() {
        let (dir, engine) = build_tree();
        let devices = StubDevices::new(vec![DeviceInfo::new("5.12.1", "D400")]);
        let launcher = RecordingLauncher::default();

        let outcome = run(&engine, &devices, &launcher, &masks(), false).unwrap();

        let launched = launcher.launched.borrow();
        assert_eq!(launched.len(), 1);
        assert_eq!(outcome, RunOutcome::Launched(launched[0].clone()));
        assert!(
            launched[0]
                .image
                .ends_with("build/common/fw/D4XX_FW_Image-5.13.0.bin")
        );
        assert!(launched[0].image.starts_with(dir.path()));
    }

    #[test]
    fn test_up_to_date_device_is_noop() {
        let (_dir, engine) = build_tree();
        let devices = StubDevices::new(vec![DeviceInfo::new("5.13.0", "D400")]);
        let launcher = RecordingLauncher::default();

        let outcome = run(&engine, &devices, &launcher, &masks(), false).unwrap();

        assert_eq!(outcome, RunOutcome::UpToDate);
        assert!(launcher.launched.borrow().is_empty());
    }

    #[test]
    fn test_zero_devices_fails_before_lookups() {
        let (_dir, engine) = build_tree();
        let devices = StubDevices::new(Vec::new());
        let launcher = RecordingLauncher::default();

        let err = run(&engine, &devices, &launcher, &masks(), false).unwrap_err();

        assert!(matches!(err, FwGateError::DeviceCount { found: 0 }));
        assert_eq!(err.exit_code(), 1);
        assert!(launcher.launched.borrow().is_empty());
    }

    #[test]
    fn test_missing_updater_fails_before_device_query() {
        let (dir, _) = build_tree();
        fs::remove_file(dir.path().join("build/Release/rs-fw-update.exe")).unwrap();
        let engine = UpdateDecisionEngine::new(EngineConfig {
            manifest_path: dir.path().join("common/fw/firmware-version.h"),
            search_root: dir.path().to_path_buf(),
            updater_name: "rs-fw-update.exe".to_string(),
        });
        let devices = StubDevices::new(vec![DeviceInfo::new("5.12.1", "D400")]);
        let launcher = RecordingLauncher::default();

        let err = run(&engine, &devices, &launcher, &masks(), false).unwrap_err();

        assert!(matches!(err, FwGateError::UpdaterNotFound { .. }));
        assert!(!devices.queried.get());
    }

    #[test]
    fn test_dry_run_does_not_launch() {
        let (_dir, engine) = build_tree();
        let devices = StubDevices::new(vec![DeviceInfo::new("5.12.1", "D400")]);
        let launcher = RecordingLauncher::default();

        let outcome = run(&engine, &devices, &launcher, &masks(), true).unwrap();

        match outcome {
            RunOutcome::DryRun(plan) => {
                assert!(plan.image.ends_with("D4XX_FW_Image-5.13.0.bin"));
                assert!(plan.updater.ends_with("build/Release/rs-fw-update.exe"));
            }
            other => panic!("expected a dry run, got {other:?}"),
        }
        assert!(launcher.launched.borrow().is_empty());
    }

    #[test]
    fn test_launcher_failure_is_reported() {
        let (_dir, engine) = build_tree();
        let devices = StubDevices::new(vec![DeviceInfo::new("5.12.1", "D400")]);
        let launcher = RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        };

        let err = run(&engine, &devices, &launcher, &masks(), false).unwrap_err();
        assert!(matches!(err, FwGateError::Updater(_)));
    }

    #[test]
    fn test_device_provider_requires_one_source() {
        let none = DeviceArgs {
            firmware_version: None,
            product_line: None,
            devices: None,
        };
        assert!(device_provider(&none).is_err());

        let fixed = DeviceArgs {
            firmware_version: Some("5.12.1".into()),
            product_line: Some("D400".into()),
            devices: None,
        };
        let devices = device_provider(&fixed).unwrap().query().unwrap();
        assert_eq!(devices, vec![DeviceInfo::new("5.12.1", "D400")]);
    }

    #[test]
    fn test_decision_report_json_shape() {
        let (_dir, engine) = build_tree();
        let device = DeviceInfo::new("5.12.1", "D400");
        let preflight = engine.preflight().unwrap();
        let decision = engine.decide(&preflight, &device).unwrap();

        let json = serde_json::to_value(DecisionReport::new(device, decision)).unwrap();

        let generated_at = json["generated_at"].as_str().unwrap();
        assert!(generated_at.parse::<jiff::Timestamp>().is_ok());
        assert_eq!(json["device"]["firmware_version"], "5.12.1");
        assert_eq!(json["device"]["product_line"], "D400");
        assert!(json["device"]["serial"].is_null());
        assert_eq!(json["decision"]["should_update"], true);
        assert_eq!(json["decision"]["bundled_version"], "5.13.0");
        assert_eq!(json["decision"]["image_name"], "D4XX_FW_Image-5.13.0.bin");
        assert!(
            json["decision"]["plan"]["image"]
                .as_str()
                .unwrap()
                .ends_with("D4XX_FW_Image-5.13.0.bin")
        );
    }

    #[test]
    fn test_decision_report_json_up_to_date() {
        let (_dir, engine) = build_tree();
        let device = DeviceInfo::new("5.13.0", "D400");
        let preflight = engine.preflight().unwrap();
        let decision = engine.decide(&preflight, &device).unwrap();

        let json = serde_json::to_value(DecisionReport::new(device, decision)).unwrap();

        assert_eq!(json["decision"]["should_update"], false);
        assert!(json["decision"]["image_name"].is_null());
        assert!(json["decision"]["plan"].is_null());
    }

    #[test]
    fn test_format_command() {
        let plan = UpdatePlan {
            updater: PathBuf::from("/b/rs-fw-update"),
            image: PathBuf::from("/b/D4XX_FW_Image-5.13.0.bin"),
        };
        assert_eq!(
            format_command(&plan),
            "/b/rs-fw-update -f /b/D4XX_FW_Image-5.13.0.bin"
        );
    }
}
