//! Stderr progress ticker and structured warn events.

use std::io::Write;

/// Dot-per-1000 ticker, count every 64000, matching the feed's scale.
pub struct Progress {
    count: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn tick(&mut self) {
        self.count += 1;
        if self.count % 1000 == 0 {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, ".");
            if self.count % 64000 == 0 {
                let _ = writeln!(err, " {}", self.count);
            }
            let _ = err.flush();
        }
    }

    pub fn finish(self) -> u64 {
        eprintln!(" {}", self.count);
        self.count
    }
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

/// One-line machine-greppable warning, used by skip-malformed mode.
pub fn warn(code: &str, stage: &str, detail: &str) {
    eprintln!(
        "STARCAT_WARN code={} stage={} detail={}",
        sanitize_value(code),
        sanitize_value(stage),
        sanitize_value(detail),
    );
}
