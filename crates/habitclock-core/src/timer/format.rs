//! Display formatting for durations.

/// Clock-style rendering: `MM:SS`, or `H:MM:SS` from one hour on.
///
/// With `show_centis`, a `.cc` centisecond suffix is appended. Negative input
/// renders as zero.
pub fn format_clock(ms: i64, show_centis: bool) -> String {
    let ms = ms.max(0);
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let centis = (ms % 1000) / 10;

    let mut out = if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    };
    if show_centis {
        out.push_str(&format!(".{centis:02}"));
    }
    out
}

/// Coarse rendering for totals: `"{h}h {m}m"`, or `"{m}m"` under an hour.
pub fn format_duration_long(ms: i64) -> String {
    let total_min = ms.max(0) / 60_000;
    let hours = total_min / 60;
    let minutes = total_min % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
