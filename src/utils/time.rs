//! Human-readable time intervals for status reporting.

use std::time::Duration;

/// Formats an interval the way the sync status line reports ETAs:
/// seconds below a minute, whole minutes below an hour, hours and minutes
/// beyond that.
pub fn format_time_interval(interval: Duration) -> String {
	let seconds = interval.as_secs();
	if seconds < 60 {
		return format!("{}s", seconds);
	}
	let minutes = seconds.div_ceil(60);
	if minutes < 60 {
		return format!("{}m", minutes);
	}
	let hours = minutes / 60;
	let minutes = minutes - hours * 60;
	format!("{}h {}m", hours, minutes)
}
