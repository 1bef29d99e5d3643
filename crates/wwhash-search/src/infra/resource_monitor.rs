//! CPU / RAM sampling for soft backpressure
//!
//! A background thread samples `/proc/stat` and `/proc/meminfo` and raises a
//! shared throttle flag while usage is above the configured limits. Workers
//! only read the flag; they slow down, they never stop.

use crate::constants::{DEFAULT_MAX_CPU_PERCENT, DEFAULT_MAX_RAM_PERCENT, MONITOR_INTERVAL_MS};
use std::fs;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";

/// Granularity of stop checks inside the sampling loop
const POLL_STEP: Duration = Duration::from_millis(100);

/// Throttle thresholds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorOptions {
    pub max_ram_percent: f32,
    pub max_cpu_percent: f32,
    pub interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            max_ram_percent: DEFAULT_MAX_RAM_PERCENT,
            max_cpu_percent: DEFAULT_MAX_CPU_PERCENT,
            interval: Duration::from_millis(MONITOR_INTERVAL_MS),
        }
    }
}

impl MonitorOptions {
    pub fn with_max_ram_percent(mut self, percent: f32) -> Self {
        self.max_ram_percent = percent;
        self
    }

    pub fn with_max_cpu_percent(mut self, percent: f32) -> Self {
        self.max_cpu_percent = percent;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether a sample exceeds either limit
    pub fn should_throttle(&self, ram_percent: f32, cpu_percent: f32) -> bool {
        ram_percent > self.max_ram_percent || cpu_percent > self.max_cpu_percent
    }
}

// =============================================================================
// /proc parsing
// =============================================================================

/// Aggregate CPU jiffies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`
pub fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    if fields.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

/// CPU usage between two samples
pub fn cpu_percent(prev: CpuTimes, cur: CpuTimes) -> f32 {
    let total = cur.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let idle = cur.idle.saturating_sub(prev.idle).min(total);
    (total - idle) as f32 * 100.0 / total as f32
}

/// RAM usage from `/proc/meminfo` (MemTotal vs MemAvailable)
pub fn parse_ram_percent(meminfo: &str) -> Option<f32> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some(total.saturating_sub(available) as f32 * 100.0 / total as f32)
}

fn sample_cpu() -> io::Result<CpuTimes> {
    parse_cpu_times(&fs::read_to_string(PROC_STAT)?)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognized /proc/stat"))
}

fn sample_ram() -> io::Result<f32> {
    parse_ram_percent(&fs::read_to_string(PROC_MEMINFO)?)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognized /proc/meminfo"))
}

// =============================================================================
// Monitor thread
// =============================================================================

/// Background sampler owning the throttle flag
pub struct ResourceMonitor {
    throttle: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    /// Start sampling; fails when `/proc` is not readable on this platform
    pub fn spawn(options: MonitorOptions) -> io::Result<Self> {
        let mut prev = sample_cpu()?;
        sample_ram()?;

        let throttle = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&throttle);
        let stopping = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("resource-monitor".into())
            .spawn(move || {
                while sleep_unless_stopped(&stopping, options.interval) {
                    let (Ok(cur), Ok(ram)) = (sample_cpu(), sample_ram()) else {
                        continue;
                    };
                    let cpu = cpu_percent(prev, cur);
                    prev = cur;

                    let throttled = options.should_throttle(ram, cpu);
                    let was = flag.swap(throttled, Ordering::Relaxed);
                    if throttled && !was {
                        warn!("Throttling workers (RAM {:.0}%, CPU {:.0}%)", ram, cpu);
                    } else if !throttled && was {
                        info!("Throttle released (RAM {:.0}%, CPU {:.0}%)", ram, cpu);
                    } else {
                        debug!("Resources: RAM {:.1}%, CPU {:.1}%", ram, cpu);
                    }
                }
            })?;

        Ok(Self {
            throttle,
            stop,
            handle: Some(handle),
        })
    }

    /// Flag shared with workers
    pub fn throttle_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.throttle)
    }

    pub fn is_throttled(&self) -> bool {
        self.throttle.load(Ordering::Relaxed)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.throttle.store(false, Ordering::Relaxed);
    }
}

/// Sleep for `duration`; returns false as soon as `stop` is set
fn sleep_unless_stopped(stop: &AtomicBool, duration: Duration) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(POLL_STEP);
        thread::sleep(step);
        remaining -= step;
    }
    !stop.load(Ordering::Relaxed)
}
