//! Text rendering of progress snapshots. Pure functions, no terminal I/O.

use super::{ProgressSnapshot, TransferSnapshot, TransferStatus};

const OVERALL_BAR_WIDTH: usize = 30;
const TRANSFER_BAR_WIDTH: usize = 30;
const LABEL_WIDTH: usize = 25;

/// Human-readable byte count, binary units.
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

/// `[=====>----]` for a fraction in 0..=1.
pub fn bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = ((fraction * width as f64) as usize).min(width);
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    if filled == width {
        s.push_str(&"=".repeat(width));
    } else {
        s.push_str(&"=".repeat(filled));
        s.push('>');
        s.push_str(&"-".repeat(width - filled - 1));
    }
    s.push(']');
    s
}

/// Bar for unsized transfers: a `<=>` marker that moves with the byte count.
pub fn indeterminate_bar(done: u64, width: usize) -> String {
    let marker = "<=>";
    let span = width.saturating_sub(marker.len()).max(1);
    let step = (done / (64 * 1024)) as usize % (2 * span);
    let pos = if step < span { step } else { 2 * span - step };
    let pos = pos.min(width.saturating_sub(marker.len()));
    format!(
        "[{}{}{}]",
        " ".repeat(pos),
        marker,
        " ".repeat(width.saturating_sub(pos + marker.len()))
    )
}

/// Fixed-width label: long names are cut and end in `...`.
pub fn fit_label(label: &str, width: usize) -> String {
    let count = label.chars().count();
    if count <= width {
        return format!("{:<width$}", label, width = width);
    }
    let cut: String = label.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub(super) fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        (part.min(whole) * 100) / whole
    }
}

/// `[====>----] 40% 4/10 done | 2 running, 4 waiting, 0 failed, 1 skipped | 3.2 MiB/s`
pub fn overall_line(s: &ProgressSnapshot) -> String {
    let c = &s.counters;
    let resolved = c.resolved();
    let fraction = if c.total == 0 {
        0.0
    } else {
        resolved as f64 / c.total as f64
    };
    format!(
        "{} {:>3}% {}/{} done | {} running, {} waiting, {} failed, {} skipped | {}",
        bar(fraction, OVERALL_BAR_WIDTH),
        percent(resolved, c.total),
        resolved,
        c.total,
        c.running,
        c.waiting(),
        c.failed,
        c.skipped,
        format_rate(s.throughput),
    )
}

pub fn transfer_line(t: &TransferSnapshot) -> String {
    let label = fit_label(&t.label, LABEL_WIDTH);
    let tail = match t.status {
        Some(TransferStatus::Completed) => "done".to_string(),
        Some(TransferStatus::Failed) => "failed".to_string(),
        None => format_rate(t.rate),
    };
    match t.total {
        Some(total) => format!(
            "{} {} {:>3}% {}/{} {}",
            label,
            bar(t.done as f64 / total.max(1) as f64, TRANSFER_BAR_WIDTH),
            percent(t.done, total),
            format_bytes(t.done),
            format_bytes(total),
            tail
        ),
        None => format!(
            "{} {}   ?% {}/? {}",
            label,
            indeterminate_bar(t.done, TRANSFER_BAR_WIDTH),
            format_bytes(t.done),
            tail
        ),
    }
}
