/// Prefix printed by yt-dlp for every progress line (set via `--progress-template`)
pub const PROGRESS_PREFIX: &str = "downloaded_bytes:";

/// Progress template passed to yt-dlp so that each update is one parseable line
pub fn progress_template() -> String {
    format!("{PROGRESS_PREFIX}%(progress._percent_str)s")
}

/// Parses a yt-dlp progress line into a fraction between 0.0 and 1.0
pub fn parse_progress_from_line(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix(PROGRESS_PREFIX)?;
    let number = rest.trim().strip_suffix('%')?;
    let v = number.trim().parse::<f32>().ok()?;
    Some((v / 100.0).clamp(0.0, 1.0))
}
