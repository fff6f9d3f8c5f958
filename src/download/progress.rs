use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    Started {
        uri: String,
        total_bytes: Option<u64>,
    },
    Progress {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
        speed_bps: u64,
    },
    Completed {
        bytes_downloaded: u64,
    },
    Failed {
        error: String,
    },
}

pub struct ProgressTracker;

impl ProgressTracker {
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }

    pub fn format_speed(bytes_per_second: u64) -> String {
        format!("{}/s", Self::format_bytes(bytes_per_second))
    }

    pub fn calculate_eta(
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
        speed_bps: u64,
    ) -> Option<Duration> {
        let total_bytes = total_bytes?;
        if speed_bps == 0 || bytes_downloaded >= total_bytes {
            return None;
        }
        Some(Duration::from_secs((total_bytes - bytes_downloaded) / speed_bps))
    }

    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
