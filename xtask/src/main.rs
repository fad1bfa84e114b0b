use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Install py-spy into `bin/` next to the pystacker binary
    SetupSampler {
        /// Install next to the release build instead of the debug build
        #[arg(long)]
        release: bool,
        /// Install into this directory instead
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Python used to create the throwaway venv
        #[arg(long, default_value = default_python())]
        python: String,
        /// Reinstall even if py-spy is already there
        #[arg(long)]
        force: bool,
    },
}

const fn default_python() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::SetupSampler { release, dest, python, force } => {
            let profile = if release { "release" } else { "debug" };
            let dest =
                dest.unwrap_or_else(|| workspace_root().join("target").join(profile).join("bin"));
            setup_sampler(&dest, &python, force)?;
        }
    }

    Ok(())
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn sampler_name() -> &'static str {
    if cfg!(windows) {
        "py-spy.exe"
    } else {
        "py-spy"
    }
}

fn run(cmd: &mut Command) -> Result<()> {
    println!("Running: {cmd:?}");
    let status = cmd.status().with_context(|| format!("Failed to run {cmd:?}"))?;
    if !status.success() {
        bail!("{cmd:?} exited with {status}");
    }
    Ok(())
}

fn setup_sampler(dest: &Path, python: &str, force: bool) -> Result<()> {
    let target = dest.join(sampler_name());
    if target.exists() && !force {
        println!("py-spy already installed at {}", target.display());
        println!("  Use --force to reinstall");
        return Ok(());
    }

    let venv = workspace_root().join("target").join("py-spy-venv");
    let result = install_into(&venv, &target, python);

    // The venv is only a vehicle for pip; drop it either way.
    if venv.exists() {
        fs::remove_dir_all(&venv)
            .with_context(|| format!("Failed to remove {}", venv.display()))?;
    }

    if let Err(e) = result {
        eprintln!("Please ensure Python 3.7+ is installed and on your PATH ({python} --version).");
        return Err(e);
    }

    println!("✓ py-spy installed");
    println!("  Path: {}", target.display());
    Ok(())
}

fn install_into(venv: &Path, target: &Path, python: &str) -> Result<()> {
    run(Command::new(python).arg("-m").arg("venv").arg(venv))?;

    let scripts = if cfg!(windows) { venv.join("Scripts") } else { venv.join("bin") };
    let pip = scripts.join(if cfg!(windows) { "pip.exe" } else { "pip" });
    run(Command::new(&pip).arg("install").arg("py-spy"))?;

    let source = scripts.join(sampler_name());
    if !source.is_file() {
        bail!("py-spy executable not found at {}", source.display());
    }

    let dest = target.parent().context("Install path has no parent directory")?;
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    fs::copy(&source, target)
        .with_context(|| format!("Failed to copy py-spy to {}", target.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", target.display()))?;
    }

    Ok(())
}
