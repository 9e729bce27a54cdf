// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

use crate::config::LogConfig;

/// Install the global logger. Respects `RUST_LOG` if set; otherwise
/// defaults to `info`, raised to `debug` when `log.debug` is set. When
/// `log.json_logs` is set, each record is written as a single JSON line
/// instead of `env_logger`'s default human-readable format.
pub fn init(config: &LogConfig) {
    let mut builder = Builder::new();
    let default_level = if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    builder.filter_level(default_level);
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        builder.parse_filters(&rust_log);
    }

    if config.json_logs {
        builder.format(|buf, record| {
            let timestamp = buf.timestamp_millis();
            writeln!(
                buf,
                "{{\"timestamp\":\"{timestamp}\",\"level\":\"{}\",\"target\":\"{}\",\"message\":{}}}",
                record.level(),
                record.target(),
                escape_json(&record.args().to_string()),
            )
        });
    }

    // Fails only when a logger is already installed, e.g. a second call in
    // the same process (common in tests); ignore rather than panic.
    let _ = builder.try_init();
}

fn escape_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_control_chars() {
        assert_eq!(escape_json("hello \"world\"\n"), "\"hello \\\"world\\\"\\n\"");
    }
}
