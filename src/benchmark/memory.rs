//! Process memory probing for benchmark rows.

/// Resident and virtual memory of this process in MB (VmRSS / VmSize).
///
/// Returns `None` off Linux or when `/proc` is unavailable; rows then report
/// zeros rather than failing the run.
#[cfg(target_os = "linux")]
pub fn rss_virt_mb() -> Option<(f32, f32)> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let mut rss_kb = None;
    let mut virt_kb = None;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss_kb = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("VmSize:") {
            virt_kb = parse_kb(rest);
        }
    }
    Some((rss_kb? / 1024.0, virt_kb? / 1024.0))
}

#[cfg(not(target_os = "linux"))]
pub fn rss_virt_mb() -> Option<(f32, f32)> {
    None
}

#[cfg(target_os = "linux")]
fn parse_kb(rest: &str) -> Option<f32> {
    rest.split_whitespace().next()?.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_memory_probe_reports_positive_values() {
        let (res, virt) = rss_virt_mb().expect("proc status readable on linux");
        assert!(res > 0.0);
        assert!(virt >= res);
    }
}
