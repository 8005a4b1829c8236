/// Number of targets drawn from a stratum of `size` records.
///
/// Uses half-away-from-zero rounding and never exceeds `size`.
pub fn stratum_target_count(size: usize, ratio: f64) -> usize {
    let raw = ((size as f64) * ratio).round();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(size)
    }
}

/// Target count the ratio asks for before per-stratum rounding.
pub fn expected_target_count(total: usize, ratio: f64) -> f64 {
    (total as f64) * ratio
}

/// Whether a realized target count is within `num_strata` of `ratio * total`.
pub fn within_ratio_tolerance(
    selected: usize,
    ratio: f64,
    total: usize,
    num_strata: usize,
) -> bool {
    ((selected as f64) - expected_target_count(total, ratio)).abs() <= num_strata as f64
}

/// Ratio expressed as a whole percentage (`0.2 -> 20`).
pub fn ratio_to_percent(ratio: f64) -> u32 {
    (ratio * 100.0).round().max(0.0) as u32
}

/// Fraction `numerator / denominator`, or `0.0` when the denominator is zero.
pub fn share(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Render `value` with thousands separators.
pub fn format_u128_with_commas(value: u128) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}

/// Percentage with one decimal, or `n/a` for non-finite input.
pub fn format_percent(fraction: f64) -> String {
    if !fraction.is_finite() {
        return "n/a".to_string();
    }
    format!("{:.1}%", fraction * 100.0)
}

/// Human readable byte size (`1.5 KiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stratum_counts_round_half_away_from_zero() {
        assert_eq!(stratum_target_count(10, 0.2), 2);
        assert_eq!(stratum_target_count(5, 0.1), 1);
        assert_eq!(stratum_target_count(4, 0.1), 0);
        assert_eq!(stratum_target_count(1, 0.5), 1);
        assert_eq!(stratum_target_count(0, 0.9), 0);
        assert_eq!(stratum_target_count(7, 1.0), 7);
    }

    #[test]
    fn tolerance_bound_uses_strata_count() {
        assert!(within_ratio_tolerance(2, 0.2, 10, 1));
        assert!(within_ratio_tolerance(3, 0.2, 10, 1));
        assert!(!within_ratio_tolerance(4, 0.2, 10, 1));
        assert!(within_ratio_tolerance(4, 0.2, 10, 2));
    }

    #[test]
    fn formatting_helpers_are_stable() {
        assert_eq!(format_u128_with_commas(0), "0");
        assert_eq!(format_u128_with_commas(1_234_567), "1,234,567");
        assert_eq!(format_percent(0.2), "20.0%");
        assert_eq!(format_percent(f64::NAN), "n/a");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(ratio_to_percent(0.1), 10);
        assert_eq!(ratio_to_percent(0.333), 33);
        assert_eq!(share(1, 0), 0.0);
        assert_eq!(share(1, 4), 0.25);
    }
}
