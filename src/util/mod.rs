//! Utility functions and helpers

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "tether", "tether").map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Formats an elapsed duration at 100ms resolution, e.g. `3.2s` or `1m 4.0s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let tenths = elapsed.as_millis() / 100;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    if minutes > 0 {
        format!("{}m {}.{}s", minutes, rest / 10, rest % 10)
    } else {
        format!("{}.{}s", rest / 10, rest % 10)
    }
}

/// Formats a token count with thousands separators, e.g. `12,345`.
pub fn format_tokens(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a USD cost with four decimals, e.g. `$0.0123`.
pub fn format_cost(cost: f64) -> String {
    format!("${:.4}", cost.max(0.0))
}
