#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub phase_time: Duration,
    pub elapsed_time: Duration,
}

/// 記錄索引建立、分析、輸出各階段的耗時與記憶體
#[cfg(feature = "cli")]
pub struct PhaseMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    last_phase: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if enabled && pid.is_none() {
            tracing::warn!("Unable to resolve current PID, memory figures will be zero");
        }

        let now = Instant::now();
        Self {
            system: Mutex::new(System::new()),
            pid,
            start_time: now,
            last_phase: Mutex::new(now),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn stats(&self) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let memory_mb = {
            let mut system = self.system.lock().ok()?;
            system.refresh_all();
            self.pid
                .and_then(|pid| system.process(pid))
                .map(|process| process.memory() / 1024 / 1024)
                .unwrap_or(0)
        };

        let mut peak = self.peak_memory.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        let mut last = self.last_phase.lock().ok()?;
        let phase_time = last.elapsed();
        *last = Instant::now();

        Some(PhaseStats {
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            phase_time,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} - took {:?}, Memory: {}MB, Peak: {}MB",
                phase,
                stats.phase_time,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct PhaseMonitor;

#[cfg(not(feature = "cli"))]
impl PhaseMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_phase(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
