use anyhow::{Context, Result};
use std::process::Stdio;

fn opener() -> (&'static str, Vec<&'static str>) {
    if cfg!(target_os = "macos") {
        ("open", vec![])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", ""])
    } else {
        ("xdg-open", vec![])
    }
}

/// Open `url` in the default browser.
pub async fn open(url: &str) -> Result<()> {
    let (program, args) = opener();
    let status = tokio::process::Command::new(program)
        .args(&args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("Failed to run {program}"))?;

    if !status.success() {
        anyhow::bail!("{program} exited with {status}");
    }
    Ok(())
}
