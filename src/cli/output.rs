//! Output helpers shared by the command implementations.
//!
//! Human-readable reporting goes to stderr, keeping stdout clean for
//! `--json` payloads. The global output flags arrive as `CAMPANILE_*`
//! environment variables set by `main` before dispatch.

use std::io::IsTerminal;

fn flag(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

/// True when `--quiet` suppresses routine reporting.
pub fn is_quiet() -> bool {
    flag("CAMPANILE_QUIET")
}

/// True when `--verbose` asks for per-item detail.
pub fn is_verbose() -> bool {
    flag("CAMPANILE_VERBOSE")
}

/// True when `--json` reserves stdout for a machine-readable result.
pub fn is_json() -> bool {
    flag("CAMPANILE_JSON")
}

fn color_enabled() -> bool {
    // NO_COLOR (https://no-color.org/) and the global --no-color flag
    // both win over terminal detection.
    if std::env::var_os("NO_COLOR").is_some() || flag("CAMPANILE_NO_COLOR") {
        return false;
    }
    // Human reporting goes to stderr; detect on that stream.
    std::io::stderr().is_terminal()
}

/// ANSI styling for status lines, with plain-ASCII fallbacks when color
/// is off.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            color: color_enabled(),
        }
    }

    pub fn ok_sym(&self) -> &'static str {
        self.pick("\x1b[32m\u{2713}\x1b[0m", "OK")
    }

    pub fn fail_sym(&self) -> &'static str {
        self.pick("\x1b[31m\u{2717}\x1b[0m", "!!")
    }

    pub fn warn_sym(&self) -> &'static str {
        self.pick("\x1b[33m\u{26a0}\x1b[0m", "??")
    }

    pub fn info_sym(&self) -> &'static str {
        self.pick("\x1b[34m\u{25cb}\x1b[0m", "--")
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint("36", text)
    }

    fn pick(&self, styled: &'static str, plain: &'static str) -> &'static str {
        if self.color {
            styled
        } else {
            plain
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

/// One aligned status line under a command's report.
pub fn print_check(symbol: &str, label: &str, value: &str) {
    eprintln!("{}", check_line(symbol, label, value));
}

fn check_line(symbol: &str, label: &str, value: &str) -> String {
    format!("    {symbol} {label:<16} {value}")
}

/// Machine-readable result on stdout.
pub fn print_json(value: &serde_json::Value) {
    // Value's alternate Display is its pretty form.
    println!("{value:#}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_only_when_colored() {
        let plain = Styled { color: false };
        let colored = Styled { color: true };
        assert_eq!(plain.bold("x"), "x");
        assert_eq!(colored.bold("x"), "\x1b[1mx\x1b[0m");
        assert_eq!(colored.dim("raw"), "\x1b[2mraw\x1b[0m");
        assert_eq!(colored.cyan("302"), "\x1b[36m302\x1b[0m");
    }

    #[test]
    fn test_symbols_fall_back_to_ascii() {
        let plain = Styled { color: false };
        assert_eq!(plain.ok_sym(), "OK");
        assert_eq!(plain.fail_sym(), "!!");
        assert_eq!(plain.warn_sym(), "??");
        assert_eq!(plain.info_sym(), "--");
        assert_eq!(
            Styled { color: true }.ok_sym(),
            "\x1b[32m\u{2713}\x1b[0m"
        );
    }

    #[test]
    fn test_check_line_aligns_values() {
        assert_eq!(
            check_line("OK", "seat id", "302"),
            "    OK seat id          302"
        );
    }
}
