use std::io::Write;

use crate::app::ports::Progress;

const DISPLAY_COLS: usize = 80;

/// Text progress bar redrawn in place on stderr: `[*****     ] 50%`.
pub struct ConsoleProgressMeter<W: Write = std::io::Stderr> {
    out: W,
    total: usize,
}

impl ConsoleProgressMeter {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write> ConsoleProgressMeter<W> {
    pub fn new(out: W) -> Self {
        Self { out, total: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&self, done: usize) -> String {
        let percent = if self.total == 0 {
            100
        } else {
            (done.min(self.total) * 100) / self.total
        };
        let bar_width = DISPLAY_COLS - 7;
        let filled = percent * bar_width / 100;
        format!(
            "\r[{}{}] {:>3}%",
            "*".repeat(filled),
            " ".repeat(bar_width - filled),
            percent
        )
    }
}

impl<W: Write> Progress for ConsoleProgressMeter<W> {
    fn begin(&mut self, total: usize) {
        self.total = total;
        let line = self.render(0);
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }

    fn advance(&mut self, done: usize) {
        let line = self.render(done);
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }

    fn finish(&mut self) {
        let _ = self.out.write_all(b"\n\n");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_tracks_completion() {
        let mut meter = ConsoleProgressMeter::new(Vec::new());
        meter.begin(4);
        meter.advance(2);
        meter.finish();
        let out = String::from_utf8(meter.into_inner()).unwrap();
        let frames: Vec<&str> = out.split('\r').filter(|s| !s.is_empty()).collect();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].ends_with("  0%"));
        assert!(frames[1].starts_with("[****"));
        assert!(frames[1].contains(" 50%"));
        assert_eq!(frames[1].trim_end().len(), DISPLAY_COLS);
    }

    #[test]
    fn overshoot_is_clamped() {
        let mut meter = ConsoleProgressMeter::new(Vec::new());
        meter.begin(2);
        assert!(meter.render(5).ends_with("100%"));
    }
}
