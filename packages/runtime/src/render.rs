//! Text rendering for the `ui` capability. Everything here is a pure
//! function of its inputs.

use luawidget_bridge::{format_number, Value};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BAR_CELLS: usize = 20;

/// Text of one table cell or list entry.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One line per entry, prefixed with `title: ` where a title exists.
pub fn lines(lines: &[String], titles: Option<&[String]>) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| match titles.and_then(|t| t.get(i)) {
            Some(title) if !title.is_empty() => format!("{title}: {line}"),
            _ => line.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rows padded into columns two spaces apart.
///
/// `main_column` (1-based) is left-aligned and the others right-aligned,
/// unless `centering` is set, which centers every cell.
pub fn table(rows: &[Vec<String>], main_column: usize, centering: bool) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (i, text) in row.iter().enumerate() {
            widths[i] = widths[i].max(text.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let cells: Vec<String> = (0..columns)
                .map(|i| {
                    let text = row.get(i).map(String::as_str).unwrap_or("");
                    let width = widths[i];
                    if centering {
                        center(text, width)
                    } else if i + 1 == main_column {
                        format!("{text:<width$}")
                    } else {
                        format!("{text:>width$}")
                    }
                })
                .collect();
            cells.join("  ").trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// A one-line sparkline: `title ▁▄█ min..max`.
pub fn chart(points: &[f64], format: Option<&str>, title: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        parts.push(title.to_string());
    }

    if points.is_empty() {
        parts.push("(no data)".to_string());
        return parts.join(" ");
    }

    let min = points.iter().copied().fold(f64::INFINITY, f64::min);
    let max = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let spark: String = points
        .iter()
        .map(|p| {
            let level = if span > 0.0 {
                (((p - min) / span) * (SPARK_LEVELS.len() - 1) as f64).round() as usize
            } else {
                0
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect();

    parts.push(spark);
    parts.push(format!(
        "{}..{}",
        printf_number(format, min),
        printf_number(format, max)
    ));
    parts.join(" ")
}

/// `text [#####---------------] 25%`. A non-positive `max` renders 0%.
pub fn progress_bar(text: &str, current: f64, max: f64) -> String {
    let fraction = if max > 0.0 {
        (current / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * BAR_CELLS as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_CELLS - filled));
    let percent = (fraction * 100.0).round() as i64;
    format!("{text} [{bar}] {percent}%").trim_start().to_string()
}

/// `[ a ] [ b ]`.
pub fn buttons(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!("[ {label} ]"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format `n` with a printf-style template supporting `%d`, `%i`, `%f`,
/// `%.Nf`, `%g`, `%s` and `%%`. Without a template the number is printed
/// in shortest form. Unknown conversions are copied through.
pub fn printf_number(format: Option<&str>, n: f64) -> String {
    let Some(format) = format else {
        return format_number(n);
    };

    let mut out = String::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut precision: Option<usize> = None;
        let mut spec = String::from("%");
        if chars.peek() == Some(&'.') {
            spec.push('.');
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                spec.push(d);
                chars.next();
            }
            precision = Some(digits.parse().unwrap_or(0));
        }

        match chars.next() {
            Some('d') | Some('i') => out.push_str(&format!("{}", n.round() as i64)),
            Some('f') => {
                let p = precision.unwrap_or(6);
                out.push_str(&format!("{n:.p$}"));
            }
            Some('g') | Some('s') => out.push_str(&format_number(n)),
            Some(other) => {
                out.push_str(&spec);
                out.push(other);
            }
            None => out.push_str(&spec),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lines_with_and_without_titles() {
        let l = strings(&["up", "3 days"]);
        assert_eq!(lines(&l, None), "up\n3 days");
        let t = strings(&["Status", "Uptime"]);
        assert_eq!(lines(&l, Some(&t)), "Status: up\nUptime: 3 days");

        let short = strings(&["Status"]);
        assert_eq!(lines(&l, Some(&short)), "Status: up\n3 days");
    }

    #[test]
    fn table_alignment() {
        let rows = vec![strings(&["cpu", "5%"]), strings(&["memory", "50%"])];
        assert_eq!(table(&rows, 1, false), "cpu      5%\nmemory  50%");
    }

    #[test]
    fn table_centering_and_ragged_rows() {
        let rows = vec![strings(&["a", "bbb"]), strings(&["ccc"])];
        assert_eq!(table(&rows, 1, true), " a   bbb\nccc");
    }

    #[test]
    fn chart_scales_between_min_and_max() {
        assert_eq!(chart(&[0.0, 7.0, 14.0], None, Some("rx")), "rx ▁▅█ 0..14");
        assert_eq!(chart(&[3.0, 3.0], Some("%.1f"), None), "▁▁ 3.0..3.0");
        assert_eq!(chart(&[], None, Some("rx")), "rx (no data)");
    }

    #[test]
    fn progress_bar_cells() {
        assert_eq!(
            progress_bar("Memory", 512.0, 1024.0),
            "Memory [##########----------] 50%"
        );
        assert_eq!(progress_bar("x", 5.0, 0.0), "x [--------------------] 0%");
        assert_eq!(progress_bar("", 2.0, 1.0), "[####################] 100%");
    }

    #[test]
    fn buttons_render() {
        assert_eq!(buttons(&strings(&["On", "Off"])), "[ On ] [ Off ]");
    }

    #[test]
    fn printf_subset() {
        assert_eq!(printf_number(Some("%d MB"), 12.6), "13 MB");
        assert_eq!(printf_number(Some("%.2f"), 1.0 / 3.0), "0.33");
        assert_eq!(printf_number(Some("%d%%"), 50.0), "50%");
        assert_eq!(printf_number(Some("%x"), 1.0), "%x");
        assert_eq!(printf_number(None, 2.0), "2");
    }

    #[test]
    fn cells_render_numbers_like_the_guest() {
        assert_eq!(cell(&Value::Number(42.0)), "42");
        assert_eq!(cell(&Value::Nil), "");
        assert_eq!(cell(&Value::Bool(true)), "true");
    }
}
