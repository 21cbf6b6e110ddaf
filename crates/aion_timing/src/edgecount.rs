//! Edge-count constraint calculation for clock domain pairs with no common
//! integer period ratio.
//!
//! When two clocks are not integer multiples of each other (e.g. a 7ns and
//! an 11ns clock), there is no single worst-case launch/capture edge pair
//! that repeats every cycle — the pattern only repeats after
//! `lcm(period_src, period_snk)`. This module enumerates every launch edge
//! of the source clock and every capture edge of the sink clock within one
//! LCM period and returns the minimum positive gap between them, which is
//! the tightest timing requirement any path between the two domains must
//! meet.
//!
//! Internally everything is scaled to an integer picosecond-like unit
//! (`period_ns * 1000`, truncated) before taking the LCM, since floating
//! point LCM/GCD over `period_ns` directly accumulates rounding error over
//! many edges. The final budget is scaled back down by dividing by 1000.

const SCALE: f64 = 1000.0;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

/// Scales a period in nanoseconds to an integer unit, truncating.
fn scale_period(period_ns: f64) -> u64 {
    (period_ns * SCALE).trunc() as u64
}

/// Computes the worst-case (minimum positive) required-time budget in
/// nanoseconds between a source clock with period `src_period_ns` and a
/// sink clock with period `snk_period_ns`.
///
/// Returns `None` if either period is non-positive (malformed constraint —
/// the caller should have already rejected this during SDC parsing).
pub fn edge_count_budget_ns(src_period_ns: f64, snk_period_ns: f64) -> Option<f64> {
    if src_period_ns <= 0.0 || snk_period_ns <= 0.0 {
        return None;
    }

    let src_scaled = scale_period(src_period_ns);
    let snk_scaled = scale_period(snk_period_ns);
    if src_scaled == 0 || snk_scaled == 0 {
        return None;
    }

    let period_lcm = lcm(src_scaled, snk_scaled);

    // Enumerate every launch edge of src and every capture edge of snk
    // within one LCM period.
    let mut src_edges = Vec::new();
    let mut e = 0u64;
    while e < period_lcm {
        src_edges.push(e);
        e += src_scaled;
    }

    let mut snk_edges = Vec::new();
    let mut e = 0u64;
    while e < period_lcm {
        snk_edges.push(e);
        e += snk_scaled;
    }

    // For each src launch edge, find the minimum positive gap to the next
    // snk capture edge (wrapping around by one LCM period if necessary),
    // then take the overall minimum — that's the tightest requirement any
    // source-domain-to-sink-domain path must satisfy.
    let mut min_gap: Option<u64> = None;
    for &s in &src_edges {
        let mut best_for_s: Option<u64> = None;
        for &k in &snk_edges {
            let gap = if k > s {
                k - s
            } else {
                (k + period_lcm) - s
            };
            if gap > 0 && best_for_s.map_or(true, |b| gap < b) {
                best_for_s = Some(gap);
            }
        }
        if let Some(g) = best_for_s {
            if min_gap.map_or(true, |m| g < m) {
                min_gap = Some(g);
            }
        }
    }

    min_gap.map(|g| g as f64 / SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_periods_gap_is_period() {
        // Same-frequency clocks: every launch edge has a capture edge one
        // period later, and that's the tightest gap since 0-gap (same
        // edge) is excluded as non-positive.
        let budget = edge_count_budget_ns(10.0, 10.0).unwrap();
        assert!((budget - 10.0).abs() < 0.01);
    }

    #[test]
    fn integer_multiple_periods() {
        // src = 10ns, snk = 5ns (2x faster): tightest gap is 5ns.
        let budget = edge_count_budget_ns(10.0, 5.0).unwrap();
        assert!((budget - 5.0).abs() < 0.01);
    }

    #[test]
    fn non_integer_ratio_uses_lcm() {
        // 7ns and 11ns clocks: lcm = 77ns. The tightest gap must be found
        // by enumerating edges, not by naive period comparison.
        let budget = edge_count_budget_ns(7.0, 11.0).unwrap();
        assert!(budget > 0.0);
        assert!(budget <= 7.0);
    }

    #[test]
    fn symmetric_in_general_not_equal() {
        let a = edge_count_budget_ns(7.0, 11.0).unwrap();
        let b = edge_count_budget_ns(11.0, 7.0).unwrap();
        // Both directions are well-defined positive budgets, though not
        // necessarily numerically equal (launch/capture roles differ).
        assert!(a > 0.0 && b > 0.0);
    }

    #[test]
    fn non_positive_period_rejected() {
        assert_eq!(edge_count_budget_ns(0.0, 10.0), None);
        assert_eq!(edge_count_budget_ns(10.0, -1.0), None);
    }

    #[test]
    fn gcd_and_lcm_basic() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(lcm(4, 6), 12);
    }

    #[test]
    fn gcd_with_zero() {
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(lcm(0, 5), 0);
    }
}
