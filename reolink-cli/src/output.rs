//! Human and JSON output formatting

use std::io::Write;

use serde_json::Value;

/// Output flags shared by every subcommand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

impl OutputMode {
    /// Print `value` as pretty JSON
    pub fn json(&self, value: &Value) {
        if !self.quiet {
            println!("{}", format_json(value));
        }
    }

    /// Print a titled key/value table
    pub fn table(&self, title: &str, rows: &[(String, String)]) {
        if !self.quiet {
            println!("{}", format_table(Some(title), rows));
        }
    }

    /// Print a plain status line
    pub fn line(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Whether streamed lines are printed; JSON lines ignore `quiet`
    pub fn shows_stream(&self) -> bool {
        self.json || !self.quiet
    }

    /// Print one line and flush, for streaming output
    pub fn stream_line(&self, message: &str) {
        if self.shows_stream() {
            let mut stdout = std::io::stdout().lock();
            // A closed pipe is not worth failing a watch over
            let _ = writeln!(stdout, "{}", message);
            let _ = stdout.flush();
        }
    }
}

/// Aligned `key  value` rows under an optional underlined title
pub fn format_table(title: Option<&str>, rows: &[(String, String)]) -> String {
    let mut lines = Vec::new();
    if let Some(title) = title {
        lines.push(title.to_string());
        lines.push("-".repeat(title.chars().count()));
    }

    let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    for (key, value) in rows {
        lines.push(format!("  {:<width$}  {}", key, value, width = width));
    }
    lines.join("\n")
}

pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Render a scalar JSON value without quotes
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

pub fn print_error(message: &str) {
    eprintln!("Error: {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_format_table_aligns_keys() {
        let rows = vec![
            ("Model".to_string(), "RLC-810A".to_string()),
            ("Firmware".to_string(), "v3.1.0".to_string()),
        ];
        let text = format_table(Some("Device Info"), &rows);
        assert_eq!(
            text,
            "Device Info\n-----------\n  Model     RLC-810A\n  Firmware  v3.1.0"
        );
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(None, &[]), "");
        assert_eq!(format_table(Some("Empty"), &[]), "Empty\n-----");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("RLC-810A")), "RLC-810A");
        assert_eq!(display_value(&json!(4)), "4");
        assert_eq!(display_value(&Value::Null), "-");
    }

    #[rstest]
    #[case(false, false, true)]
    #[case(false, true, false)]
    #[case(true, false, true)]
    #[case(true, true, true)]
    fn test_shows_stream(#[case] json: bool, #[case] quiet: bool, #[case] expected: bool) {
        assert_eq!(OutputMode { json, quiet }.shows_stream(), expected);
    }

    #[test]
    fn test_format_json_is_pretty() {
        assert_eq!(format_json(&json!({"a": 1})), "{\n  \"a\": 1\n}");
    }
}
