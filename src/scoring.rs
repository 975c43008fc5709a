//! Reliability scoring
//!
//! Pure functions only: sub-scores in, composite index out, no I/O.
//! The composite is a weighted sum over three 0-100 sub-scores with a
//! round-half-up to the nearest integer, so the output is itself 0-100
//! and totally ordered. Callers break ties by identity lexical order.

/// Weight of the availability sub-score
pub const WEIGHT_AVAILABILITY: f64 = 0.40;

/// Weight of the visibility sub-score
pub const WEIGHT_VISIBILITY: f64 = 0.30;

/// Weight of the compliance sub-score
pub const WEIGHT_COMPLIANCE: f64 = 0.30;

/// Sub-score ceiling
pub const MAX_SUB_SCORE: u8 = 100;

/// Combine the three sub-scores into the composite reliability index.
///
/// Inputs are clamped to 0..100; the weighted sum is rounded half-up.
pub fn composite_score(availability: u8, visibility: u8, compliance: u8) -> u8 {
    let a = f64::from(availability.min(MAX_SUB_SCORE));
    let v = f64::from(visibility.min(MAX_SUB_SCORE));
    let c = f64::from(compliance.min(MAX_SUB_SCORE));

    let weighted = a * WEIGHT_AVAILABILITY + v * WEIGHT_VISIBILITY + c * WEIGHT_COMPLIANCE;

    (weighted + 0.5).floor() as u8
}

/// Availability is binary: the latest probe either answered or it did not.
/// Latency is reported separately, not folded into the score.
pub fn availability_score(reachable: bool) -> u8 {
    if reachable {
        MAX_SUB_SCORE
    } else {
        0
    }
}

/// Visibility: the share of responding pods that announced this identity,
/// scaled to 0..100.
///
/// With fewer than two responders the fraction is meaningless (a pod never
/// announces itself), so the caller-supplied default applies. The default
/// is a policy knob; 100 avoids penalizing single-seed test networks.
pub fn visibility_score(mentions: usize, responders: usize, default: u8) -> u8 {
    if responders < 2 {
        return default.min(MAX_SUB_SCORE);
    }

    let fraction = mentions as f64 / responders as f64;
    let scaled = (fraction * 100.0 + 0.5).floor() as u64;
    scaled.min(MAX_SUB_SCORE as u64) as u8
}

/// Compliance is binary: reported version meets the configured latest or
/// it does not. Unparseable versions fail closed.
pub fn compliance_score(reported: Option<&str>, latest: &str) -> u8 {
    match reported {
        Some(v) if version_compliant(v, latest) => MAX_SUB_SCORE,
        _ => 0,
    }
}

/// Extract the leading `major.minor.patch` numeric triple from a possibly
/// decorated version string ("0.5.0-arcadia", "v0.5.0+build12").
///
/// Requires all three components; anything less is unparseable.
pub fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let trimmed = raw.trim().trim_start_matches('v');

    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = numeric.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;

    Some((major, minor, patch))
}

/// Compare a reported version against the configured latest.
///
/// Tuple comparison gives the lexicographic order over the three numeric
/// components; equal-or-greater is compliant. Either side failing to parse
/// means non-compliant.
pub fn version_compliant(reported: &str, latest: &str) -> bool {
    match (parse_version(reported), parse_version(latest)) {
        (Some(r), Some(l)) => r >= l,
        _ => false,
    }
}
