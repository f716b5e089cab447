//! Host resource snapshot attached to each run.
//!
//! Collected once at the end of the battery; values are reported as an
//! opaque string map in the result document.

use std::collections::BTreeMap;

use sysinfo::System;

const MIB: u64 = 1024 * 1024;

/// Capture memory, CPU count and load figures for the host running the
/// harness. Failures degrade to placeholder entries, never a crash.
pub fn collect() -> BTreeMap<String, String> {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu_usage();

    let mut usage = BTreeMap::new();
    usage.insert(
        "memory_total_mb".to_string(),
        format!("{:.1}", system.total_memory() as f64 / MIB as f64),
    );
    usage.insert(
        "memory_used_mb".to_string(),
        format!("{:.1}", system.used_memory() as f64 / MIB as f64),
    );
    usage.insert(
        "cpu_count".to_string(),
        system.cpus().len().to_string(),
    );

    let load = System::load_average();
    usage.insert("load_average_1m".to_string(), format!("{:.2}", load.one));

    usage
}
