//! Optional pre-run process configuration

#[cfg(unix)]
use tracing::info;
use tracing::warn;

/// Niceness requested by `raise_priority`
const HIGH_PRIORITY_NICE: i32 = -10;

/// Best-effort scheduling priority raise; returns whether it took effect
///
/// Failure (usually missing privileges) is logged and otherwise ignored.
#[cfg(unix)]
pub fn raise_priority() -> bool {
    // Safety: setpriority only reads its integer arguments.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, HIGH_PRIORITY_NICE) };
    if rc == 0 {
        info!("Process priority raised (nice {})", HIGH_PRIORITY_NICE);
        true
    } else {
        warn!(
            "Could not raise process priority: {}",
            std::io::Error::last_os_error()
        );
        false
    }
}

#[cfg(not(unix))]
pub fn raise_priority() -> bool {
    warn!(
        "Raising process priority to nice {} is not supported on this platform",
        HIGH_PRIORITY_NICE
    );
    false
}
