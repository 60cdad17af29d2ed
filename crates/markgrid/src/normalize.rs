//! Free-response answer normalization.
//!
//! OCR output for the restricted numeric alphabet is repaired and reduced to
//! a canonical string so grading is exact string equality. Two stages:
//!
//! 1. [`repair_artifacts`] – undo common OCR damage: letter/digit confusions,
//!    stray separators standing in for a fraction bar, and vertically stacked
//!    fractions read as two space-separated numerals.
//! 2. [`canonicalize`] – reduce integers, decimals, and fractions to a single
//!    canonical spelling (no leading zeros, no trailing fractional zeros,
//!    fractions in lowest terms).
//!
//! Input that does not match the integer/decimal/fraction grammar normalizes
//! to `None`; that is a non-match at grading time, never an error.

/// Greatest common divisor.
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Strip leading zeros but keep at least one digit.
fn strip_leading_zeros(s: &str) -> &str {
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Repair common OCR artifacts for the digits-and-separators alphabet.
///
/// Collapses all whitespace runs to single spaces, maps `O`→`0` and
/// `I`/`l`→`1`, turns stray `|`, `:`, `-` separators into `/`, and joins a
/// two-token digit pair (`"12 7"`) into a fraction (`"12/7"`), the shape a
/// vertically stacked fraction takes after line-based OCR.
pub fn repair_artifacts(raw: &str) -> String {
    let mut t: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            'O' => '0',
            'I' | 'l' => '1',
            '|' | ':' | '-' => '/',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect();

    // Collapse runs of spaces left by newline folding.
    while t.contains("  ") {
        t = t.replace("  ", " ");
    }

    let parts: Vec<&str> = t.split(' ').filter(|p| !p.is_empty()).collect();
    if parts.len() == 2
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
        && !parts[0].is_empty()
        && !parts[1].is_empty()
    {
        return format!("{}/{}", parts[0], parts[1]);
    }
    t
}

/// Canonicalize an already-repaired answer string.
///
/// Returns `None` when no digits survive filtering (format mismatch).
pub fn canonicalize(s: &str) -> Option<String> {
    let t: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '/')
        .collect();
    if t.is_empty() || !t.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if t.contains('/') {
        return Some(canonical_fraction(&t));
    }
    if t.contains('.') {
        return Some(canonical_decimal(&t));
    }
    Some(strip_leading_zeros(&t).to_string())
}

fn canonical_fraction(t: &str) -> String {
    let mut parts = t.split('/');
    let a_raw = parts.next().unwrap_or("");
    let b_raw = parts.next().unwrap_or("");
    if a_raw.is_empty() || b_raw.is_empty() {
        return t.to_string();
    }

    let a = strip_leading_zeros(a_raw);
    let b = strip_leading_zeros(b_raw);
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(ai), Ok(bi)) if bi != 0 => {
            let g = gcd(ai, bi);
            format!("{}/{}", ai / g, bi / g)
        }
        // Zero denominator (or overflow): left unreduced.
        _ => format!("{a}/{b}"),
    }
}

fn canonical_decimal(t: &str) -> String {
    let mut parts = t.split('.');
    let ip_raw = parts.next().unwrap_or("");
    let fp_raw = parts.next().unwrap_or("");

    let ip = if ip_raw.is_empty() {
        "0"
    } else {
        strip_leading_zeros(ip_raw)
    };
    let fp = fp_raw.trim_end_matches('0');
    if fp.is_empty() {
        ip.to_string()
    } else {
        format!("{ip}.{fp}")
    }
}

/// Full normalization: artifact repair followed by canonicalization.
pub fn normalize(raw: &str) -> Option<String> {
    canonicalize(&repair_artifacts(raw))
}

/// A canonical fraction with a zero denominator never matches anything.
pub fn is_zero_denominator(canonical: &str) -> bool {
    match canonical.split_once('/') {
        Some((_, den)) => den.chars().all(|c| c == '0') && !den.is_empty(),
        None => false,
    }
}

/// Grading comparison: canonical-string equality, with the zero-denominator
/// carve-out.
pub fn matches_key(got: &str, expected: &str) -> bool {
    got == expected && !is_zero_denominator(got)
}
