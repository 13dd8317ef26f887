use chrono::NaiveDateTime;

use crate::progress_log::{ResultRecord, TIMESTAMP_FORMAT};
use crate::util::{format_decimal, mean, round_to};

const DISPLAY_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Aggregate figures shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub total_tests: usize,
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
    pub best_wpm: f64,
}

impl Summary {
    pub fn from_entries(entries: &[ResultRecord]) -> Self {
        let wpms: Vec<f64> = entries.iter().map(|e| e.wpm).collect();
        let accuracies: Vec<f64> = entries.iter().map(|e| e.accuracy).collect();

        match (mean(&wpms), mean(&accuracies)) {
            (Some(avg_wpm), Some(avg_accuracy)) => Self {
                total_tests: entries.len(),
                avg_wpm: round_to(avg_wpm, 2),
                avg_accuracy: round_to(avg_accuracy, 2),
                best_wpm: wpms.iter().copied().fold(f64::MIN, f64::max),
            },
            _ => Self::default(),
        }
    }
}

/// A history row ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub when: String,
    pub wpm: f64,
    pub accuracy: f64,
}

/// Reformats a log timestamp for humans, keeping the raw text if it does not parse.
pub fn display_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|t| t.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// History rows, most recent first.
pub fn display_rows(entries: &[ResultRecord]) -> Vec<DisplayRow> {
    entries
        .iter()
        .rev()
        .map(|e| DisplayRow {
            when: display_timestamp(&e.timestamp),
            wpm: e.wpm,
            accuracy: e.accuracy,
        })
        .collect()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_dashboard(summary: &Summary, rows: &[DisplayRow]) -> String {
    let mut body = String::new();
    if rows.is_empty() {
        body.push_str(
            "<tr><td colspan=\"3\" class=\"empty\">No tests yet. Finish a typing test to see it here.</td></tr>\n",
        );
    }
    for row in rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}%</td></tr>\n",
            escape_html(&row.when),
            format_decimal(row.wpm),
            format_decimal(row.accuracy)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Typing Progress Dashboard</title>
<style>
body {{ font-family: Helvetica, Arial, sans-serif; background: #f0f0f0; color: #333; margin: 2em; }}
.cards {{ display: flex; gap: 1em; margin-bottom: 2em; }}
.card {{ background: #fff; border-radius: 8px; padding: 1em 1.5em; flex: 1; }}
.card .value {{ font-size: 2em; font-weight: bold; }}
table {{ border-collapse: collapse; width: 100%; background: #fff; }}
th, td {{ padding: 0.5em 1em; border-bottom: 1px solid #ddd; text-align: left; }}
.empty {{ color: #888; font-style: italic; }}
</style>
</head>
<body>
<h1>Typing Progress Dashboard</h1>
<div class="cards">
<div class="card"><div>Total Tests</div><div class="value">{total}</div></div>
<div class="card"><div>Average WPM</div><div class="value">{avg_wpm}</div></div>
<div class="card"><div>Average Accuracy</div><div class="value">{avg_acc}%</div></div>
<div class="card"><div>Best WPM</div><div class="value">{best}</div></div>
</div>
<table>
<thead><tr><th>Date</th><th>WPM</th><th>Accuracy</th></tr></thead>
<tbody>
{body}</tbody>
</table>
</body>
</html>
"#,
        total = summary.total_tests,
        avg_wpm = format_decimal(summary.avg_wpm),
        avg_acc = format_decimal(summary.avg_accuracy),
        best = format_decimal(summary.best_wpm),
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str, wpm: f64, accuracy: f64) -> ResultRecord {
        ResultRecord {
            timestamp: ts.to_string(),
            wpm,
            accuracy,
        }
    }

    #[test]
    fn test_summary_of_empty_history() {
        assert_eq!(Summary::from_entries(&[]), Summary::default());
    }

    #[test]
    fn test_summary_averages_and_best() {
        let entries = vec![
            record("2024-05-01 10:00:00", 40.0, 90.0),
            record("2024-05-01 11:00:00", 55.55, 95.5),
            record("2024-05-01 12:00:00", 61.0, 99.0),
        ];
        let summary = Summary::from_entries(&entries);
        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.avg_wpm, 52.18);
        assert_eq!(summary.avg_accuracy, 94.83);
        assert_eq!(summary.best_wpm, 61.0);
    }

    #[test]
    fn test_display_timestamp() {
        assert_eq!(
            display_timestamp("2024-05-01 13:07:00"),
            "May 01, 2024 01:07 PM"
        );
        assert_eq!(display_timestamp("yesterday-ish"), "yesterday-ish");
    }

    #[test]
    fn test_rows_are_most_recent_first() {
        let entries = vec![
            record("2024-05-01 10:00:00", 40.0, 90.0),
            record("2024-05-02 10:00:00", 50.0, 91.0),
        ];
        let rows = display_rows(&entries);
        assert_eq!(rows[0].wpm, 50.0);
        assert_eq!(rows[1].wpm, 40.0);
    }

    #[test]
    fn test_render_escapes_log_text() {
        let rows = display_rows(&[record("<script>", 40.0, 90.0)]);
        let html = render_dashboard(&Summary::from_entries(&[]), &rows);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_summary_figures() {
        let entries = vec![record("2024-05-01 10:00:00", 65.43, 97.5)];
        let html = render_dashboard(&Summary::from_entries(&entries), &display_rows(&entries));
        assert!(html.contains("<div class=\"value\">1</div>"));
        assert!(html.contains("65.43"));
        assert!(html.contains("97.5%"));
        assert!(html.contains("May 01, 2024 10:00 AM"));
    }

    #[test]
    fn test_render_empty_state() {
        let html = render_dashboard(&Summary::default(), &[]);
        assert!(html.contains("No tests yet"));
    }
}
