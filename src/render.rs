use crate::history::Symbol;
use crate::state::{Endpoint, Probe};
use chrono::Local;
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

/// Immutable presentation settings, built once at startup and passed
/// down; nothing here mutates after construction.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub label_width: usize,
    pub status_width: usize,
    pub service_width: usize,
    /// Visible width of the history column (= configured ring length).
    pub history_width: usize,
}

impl Theme {
    pub fn new(history_width: usize) -> Self {
        Self {
            label_width: 15,
            status_width: 10,
            service_width: 7,
            history_width,
        }
    }

    fn symbol(&self, symbol: Symbol) -> ColoredString {
        let glyph = symbol.glyph().to_string();
        match symbol {
            Symbol::Blank | Symbol::Slow => glyph.normal(),
            Symbol::Fast => glyph.green(),
            Symbol::Medium => glyph.yellow().bold(),
            Symbol::Down => glyph.red(),
        }
    }

    /// `slot` is the position the tick just wrote. The slot after it is
    /// the next to be overwritten and so holds the oldest sample;
    /// charting from there reads oldest to newest.
    fn history(&self, probe: &Probe, slot: usize) -> String {
        debug_assert_eq!(probe.history.len(), self.history_width);
        let n = probe.history.len();
        probe
            .history
            .chart((slot + n - 1) % n)
            .into_iter()
            .map(|s| self.symbol(s).to_string())
            .collect()
    }

    /// Right-align by the plain text width; the styled string carries
    /// escape codes that would throw off a format-width pad.
    fn status(&self, probe: &Probe) -> String {
        let plain = probe.status_text();
        let pad = " ".repeat(self.status_width.saturating_sub(plain.len()));
        if probe.latency_ms.is_none() {
            format!("{pad}{}", plain.red().bold())
        } else {
            format!("{pad}{plain}")
        }
    }
}

pub fn draw(endpoints: &[Endpoint], slot: usize, theme: &Theme, hostname: Option<&str>) {
    let mut out = String::new();
    // Home the cursor and clear to the end of the screen.
    out.push_str("\x1b[H\x1b[J");
    out.push_str(&format!(
        "{} {}\n\n",
        "multiping".bold(),
        Local::now().format("%c")
    ));
    if let Some(name) = hostname {
        out.push_str(&format!("Running on {name}\n\n"));
    }

    for endpoint in endpoints {
        out.push_str(&format!(
            "{} ({})\n",
            endpoint.description.bold(),
            endpoint.ip
        ));
        out.push_str(&format!(
            "    {:<lw$} {:>sw$}   {:<hw$}  {:<vw$}  {}\n",
            "Test",
            "Status",
            "History",
            "Service",
            "Last seen",
            lw = theme.label_width,
            sw = theme.status_width,
            hw = theme.history_width,
            vw = theme.service_width,
        ));
        for probe in &endpoint.probes {
            out.push_str(&format!(
                "    {:<lw$} {}   {}  {:<vw$}  {}\n",
                probe.label(),
                theme.status(probe),
                theme.history(probe, slot),
                probe.service.map(|s| s.as_str()).unwrap_or(""),
                probe.last_seen.as_deref().unwrap_or(""),
                lw = theme.label_width,
                vw = theme.service_width,
            ));
        }
        out.push('\n');
    }

    print!("{out}");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;

    #[test]
    fn history_column_has_one_glyph_per_slot() {
        colored::control::set_override(false);
        let theme = Theme::new(5);
        let probe = Probe::new(Protocol::Icmp, None, 5);
        assert_eq!(theme.history(&probe, 4), ".....");
    }

    #[test]
    fn history_reads_oldest_to_newest_across_ticks() {
        colored::control::set_override(false);
        let theme = Theme::new(3);
        let mut probe = Probe::new(Protocol::Icmp, None, 3);
        // Three ticks at the driver's decrementing slots: fast, then
        // medium, then slow.
        for (slot, latency_ms) in [(2, 5.0), (1, 50.0), (0, 500.0)] {
            probe.premark(slot);
            probe.record(
                slot,
                crate::state::ProbeOutcome {
                    alive: true,
                    latency_ms: Some(latency_ms),
                },
            );
        }
        assert_eq!(theme.history(&probe, 0), ".oO");
    }

    #[test]
    fn status_is_right_aligned_to_width() {
        colored::control::set_override(false);
        let theme = Theme::new(5);
        let mut probe = Probe::new(Protocol::Tcp, Some(80), 5);
        assert_eq!(theme.status(&probe), "      DOWN");
        probe.latency_ms = Some(12.34);
        assert_eq!(theme.status(&probe), "    12.3ms");
    }
}
