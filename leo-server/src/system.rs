use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use sysinfo::{Disks, System};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub active_connections: usize,
}

/// Host metrics. CPU usage is measured between two consecutive snapshots,
/// so the first one reports 0.
pub struct SystemProbe {
    system: Mutex<System>,
    in_flight: Arc<AtomicUsize>,
}

impl SystemProbe {
    pub fn new(in_flight: Arc<AtomicUsize>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
            in_flight,
        }
    }

    pub fn snapshot(&self) -> SystemStats {
        let (cpu_percent, memory_percent) = {
            let mut system = self
                .system
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            system.refresh_cpu_usage();
            system.refresh_memory();
            let memory = percent(system.used_memory(), system.total_memory());
            (f64::from(system.global_cpu_usage()), memory)
        };

        SystemStats {
            cpu_percent: round1(cpu_percent),
            memory_percent: round1(memory_percent),
            disk_percent: round1(root_disk_percent()),
            active_connections: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Usage of the disk mounted at `/`, or of all disks when there is none.
fn root_disk_percent() -> f64 {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"));
    let (total, available) = match root {
        Some(disk) => (disk.total_space(), disk.available_space()),
        None => disks.list().iter().fold((0, 0), |(total, available), disk| {
            (total + disk.total_space(), available + disk.available_space())
        }),
    };
    percent(total.saturating_sub(available), total)
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
