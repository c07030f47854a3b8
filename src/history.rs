/// One tick's outcome as it appears in the history chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// No measurement yet (initial buffer fill).
    Blank,
    /// Response under 10ms.
    Fast,
    /// Response under 100ms.
    Medium,
    /// Response at 100ms or above.
    Slow,
    /// No response.
    Down,
}

impl Symbol {
    pub fn glyph(self) -> char {
        match self {
            Symbol::Blank | Symbol::Fast => '.',
            Symbol::Medium => 'o',
            Symbol::Slow => 'O',
            Symbol::Down => 'X',
        }
    }
}

/// Classify a latency measurement in milliseconds. `None` means no
/// response and maps to `Down`.
pub fn symbol_for(latency_ms: Option<f64>) -> Symbol {
    match latency_ms {
        None => Symbol::Down,
        Some(ms) if ms < 10.0 => Symbol::Fast,
        Some(ms) if ms < 100.0 => Symbol::Medium,
        Some(_) => Symbol::Slow,
    }
}

/// Fixed-length circular history of tick symbols. The write position is
/// shared across all probes and owned by the tick driver; the ring only
/// hides the wraparound arithmetic.
#[derive(Debug, Clone)]
pub struct Ring {
    slots: Vec<Symbol>,
}

impl Ring {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Symbol::Blank; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn write(&mut self, index: usize, symbol: Symbol) {
        self.slots[index] = symbol;
    }

    /// Chart symbols starting at `current` and walking backward through
    /// the ring: `(current - i + len) mod len` for `i` in `0..len`.
    pub fn chart(&self, current: usize) -> Vec<Symbol> {
        let n = self.slots.len();
        (0..n).map(|i| self.slots[(current + n - i) % n]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_covers_all_thresholds() {
        assert_eq!(symbol_for(None), Symbol::Down);
        assert_eq!(symbol_for(Some(0.0)), Symbol::Fast);
        assert_eq!(symbol_for(Some(9.999)), Symbol::Fast);
        assert_eq!(symbol_for(Some(10.0)), Symbol::Medium);
        assert_eq!(symbol_for(Some(99.999)), Symbol::Medium);
        assert_eq!(symbol_for(Some(100.0)), Symbol::Slow);
        assert_eq!(symbol_for(Some(12_000.0)), Symbol::Slow);
    }

    #[test]
    fn classifier_is_deterministic() {
        for input in [None, Some(5.0), Some(50.0), Some(500.0)] {
            assert_eq!(symbol_for(input), symbol_for(input));
        }
    }

    #[test]
    fn new_ring_is_blank_with_fixed_length() {
        let ring = Ring::new(35);
        assert_eq!(ring.len(), 35);
        assert!(ring.chart(34).iter().all(|s| *s == Symbol::Blank));
    }

    #[test]
    fn chart_walks_backward_from_current() {
        // Slots [A,B,C,D,E] as Fast..Down at indices 0..4; with current=4
        // the chart reads E,D,C,B,A.
        let mut ring = Ring::new(5);
        let fill = [
            Symbol::Fast,
            Symbol::Medium,
            Symbol::Slow,
            Symbol::Down,
            Symbol::Blank,
        ];
        for (i, symbol) in fill.iter().enumerate() {
            ring.write(i, *symbol);
        }
        let chart = ring.chart(4);
        assert_eq!(
            chart,
            vec![
                Symbol::Blank,
                Symbol::Down,
                Symbol::Slow,
                Symbol::Medium,
                Symbol::Fast,
            ]
        );
    }

    #[test]
    fn chart_wraps_below_zero() {
        let mut ring = Ring::new(3);
        ring.write(0, Symbol::Fast);
        ring.write(2, Symbol::Down);
        assert_eq!(
            ring.chart(0),
            vec![Symbol::Fast, Symbol::Down, Symbol::Blank]
        );
    }

    #[test]
    fn glyphs_match_chart_alphabet() {
        assert_eq!(Symbol::Blank.glyph(), '.');
        assert_eq!(Symbol::Fast.glyph(), '.');
        assert_eq!(Symbol::Medium.glyph(), 'o');
        assert_eq!(Symbol::Slow.glyph(), 'O');
        assert_eq!(Symbol::Down.glyph(), 'X');
    }
}
