use anyhow::Result;
#[cfg(not(windows))]
use anyhow::{bail, Context};
use focuslog_core::Observation;

#[cfg(target_os = "linux")]
mod x11;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod windows;

/// Reports the focused window and how long the user has been idle.
///
/// Never fails per poll: a focus query that goes wrong reports the `Unknown` sentinel,
/// an idle query that goes wrong reports zero seconds.
pub trait ObservationSource {
    fn name(&self) -> &'static str;
    fn observe(&mut self) -> Observation;
}

#[cfg(target_os = "linux")]
pub fn platform_source() -> Result<Box<dyn ObservationSource>> {
    Ok(Box::new(x11::X11Source::new()?))
}

#[cfg(target_os = "macos")]
pub fn platform_source() -> Result<Box<dyn ObservationSource>> {
    Ok(Box::new(macos::MacSource::new()?))
}

#[cfg(windows)]
pub fn platform_source() -> Result<Box<dyn ObservationSource>> {
    Ok(Box::new(windows::WindowsSource::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub fn platform_source() -> Result<Box<dyn ObservationSource>> {
    anyhow::bail!("no focus observation support for this platform")
}

/// Runs a helper program and returns its trimmed stdout.
#[cfg(not(windows))]
fn command_stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !output.status.success() {
        bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}
