//! Identifier extraction and rewriting for expression strings.
//!
//! The expression grammar is never parsed; expressions travel through the
//! pipeline as opaque text and land in the emitted source as a substring.
//! The compiler's only responsibility is the identifier rule:
//!
//! - A *bare identifier* is a letter-or-underscore-led word that is not
//!   preceded by `.` and not followed by `(` or `[`.
//! - Bare identifiers that are not whitelisted math functions must be catalog
//!   sensors (checked by the validator) and are rewritten to
//!   `inputs["identifier"]` by the emitter.
//! - Math function names are never wrapped and are case-normalized to
//!   lowercase wherever they appear.
//! - String literal spans, numeric literals and punctuation pass through
//!   verbatim.
//!
//! The scan is regex-driven: a coarse word pattern plus explicit byte guards
//! around each hit.

use std::collections::BTreeSet;

/// Function names an expression may call without naming a sensor.
///
/// `log` is the natural logarithm; `pow(base, exp)` is the only two-argument
/// member.
pub(crate) const MATH_FUNCTIONS: &[&str] =
    &["abs", "ceil", "cos", "exp", "floor", "log", "pow", "round", "sin", "sqrt", "tan"];

pub(crate) fn is_math_function(ident: &str) -> bool {
    MATH_FUNCTIONS.iter().any(|f| ident.eq_ignore_ascii_case(f))
}

/// How a scanned identifier occurrence should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentClass {
    /// Wrap into `inputs["…"]`; must be a catalog sensor.
    Sensor,
    /// Whitelisted math function; lowercase it, never wrap.
    MathFunction,
    /// Function call or indexing target; leave verbatim.
    Verbatim,
}

fn classify(expr: &str, start: usize, end: usize) -> IdentClass {
    let bytes = expr.as_bytes();
    let ident = &expr[start..end];

    // Math functions are exempt wherever they appear, call position or not.
    if is_math_function(ident) {
        return IdentClass::MathFunction;
    }
    // Followed by `(` → a call; followed by `[` → indexing. Both are the
    // target language's business, not ours.
    match bytes.get(end) {
        Some(b'(') | Some(b'[') => IdentClass::Verbatim,
        _ => IdentClass::Sensor,
    }
}

/// Byte ranges of single- or double-quoted literal spans.
///
/// Escapes are not interpreted; a quote span simply runs to the next matching
/// quote character (or the end of the expression when unterminated).
fn literal_spans(expr: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<(u8, usize)> = None;
    for (i, b) in expr.bytes().enumerate() {
        match open {
            None if b == b'"' || b == b'\'' => open = Some((b, i)),
            Some((quote, start)) if b == quote => {
                spans.push((start, i + 1));
                open = None;
            }
            _ => {}
        }
    }
    if let Some((_, start)) = open {
        spans.push((start, expr.len()));
    }
    spans
}

fn in_literal(spans: &[(usize, usize)], pos: usize) -> bool {
    spans.iter().any(|&(s, e)| pos >= s && pos < e)
}

/// Walk every identifier-shaped word and hand classified occurrences to `f`.
fn scan(expr: &str, mut f: impl FnMut(usize, usize, IdentClass)) {
    let pattern = regex!(r"[A-Za-z_][A-Za-z0-9_]*");
    let spans = literal_spans(expr);
    let bytes = expr.as_bytes();

    for m in pattern.find_iter(expr) {
        let (start, end) = (m.start(), m.end());
        if in_literal(&spans, start) {
            continue;
        }
        // Mid-word hits ("e3" inside "5e3") and member accesses (".field")
        // are not bare identifiers.
        if start > 0 {
            let prev = bytes[start - 1];
            if prev == b'.' || prev.is_ascii_alphanumeric() || prev == b'_' {
                continue;
            }
        }
        f(start, end, classify(expr, start, end));
    }
}

/// Bare identifiers that must resolve to sensors, deduplicated and sorted.
pub(crate) fn extract_identifiers(expr: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    scan(expr, |start, end, class| {
        if class == IdentClass::Sensor {
            out.insert(expr[start..end].to_string());
        }
    });
    out
}

/// Rewrite an expression for emission: sensors become `inputs["…"]`, math
/// functions are lowercased, everything else is copied verbatim.
pub(crate) fn rewrite(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 16);
    let mut cursor = 0;
    scan(expr, |start, end, class| {
        out.push_str(&expr[cursor..start]);
        let ident = &expr[start..end];
        match class {
            IdentClass::Sensor => {
                out.push_str("inputs[\"");
                out.push_str(ident);
                out.push_str("\"]");
            }
            IdentClass::MathFunction => out.push_str(&ident.to_ascii_lowercase()),
            IdentClass::Verbatim => out.push_str(ident),
        }
        cursor = end;
    });
    out.push_str(&expr[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(expr: &str) -> Vec<String> {
        extract_identifiers(expr).into_iter().collect()
    }

    #[test]
    fn extracts_sensor_identifiers() {
        assert_eq!(idents("a + c > 0"), ["a", "c"]);
        assert_eq!(idents("temp_f > 32 && sqrt(temp_c) < 5"), ["temp_c", "temp_f"]);
        assert_eq!(idents("x * x"), ["x"]);
    }

    #[test]
    fn math_functions_are_not_sensors() {
        assert_eq!(idents("abs(x) + pow(y, 2)"), ["x", "y"]);
        // Exempt even outside call position.
        assert_eq!(idents("abs + x"), ["x"]);
    }

    #[test]
    fn call_and_index_targets_are_skipped() {
        assert_eq!(idents("custom_fn(a)"), ["a"]);
        assert_eq!(idents("arr[0] + b"), ["b"]);
    }

    #[test]
    fn numeric_exponents_are_not_identifiers() {
        assert_eq!(idents("5e3 + x"), ["x"]);
        assert_eq!(idents("1.5e-2 * rate"), ["rate"]);
    }

    #[test]
    fn member_accesses_are_skipped() {
        // `data` is bare (only `(`/`[` exempt a following token); `field` is not.
        assert_eq!(idents("data.field"), ["data"]);
    }

    #[test]
    fn string_literals_pass_through() {
        assert_eq!(idents("x > 0 && \"not a sensor\" != mode"), ["mode", "x"]);
        assert_eq!(rewrite("level + \"raw text\""), "inputs[\"level\"] + \"raw text\"");
    }

    #[test]
    fn rewrites_sensors_into_input_lookups() {
        assert_eq!(rewrite("(temperature_f - 32) * 5/9"), "(inputs[\"temperature_f\"] - 32) * 5/9");
        assert_eq!(rewrite("a + b"), "inputs[\"a\"] + inputs[\"b\"]");
    }

    #[test]
    fn rewrite_normalizes_math_function_case() {
        assert_eq!(rewrite("Abs(x) + SQRT(y)"), "abs(inputs[\"x\"]) + sqrt(inputs[\"y\"])");
    }

    #[test]
    fn rewrite_leaves_calls_and_indexing_alone() {
        assert_eq!(rewrite("custom_fn(a)"), "custom_fn(inputs[\"a\"])");
        assert_eq!(rewrite("arr[0]"), "arr[0]");
    }

    #[test]
    fn empty_and_literal_only_expressions() {
        assert_eq!(rewrite(""), "");
        assert_eq!(rewrite("1 + 2.5"), "1 + 2.5");
        assert!(idents("3 * 4").is_empty());
    }
}
