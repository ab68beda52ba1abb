//! Sportsbook price conversions.
//!
//! All simulated bets are flat one-unit stakes, so the only quantity the
//! engine needs from a price is the profit per unit risked on a win.
//!
//! # Usage
//!
//! ```rust
//! use heatcheck_core::utils::odds::{american_to_payout, implied_probability};
//!
//! let payout = american_to_payout(-110.0).unwrap();
//! assert!((payout - 0.9091).abs() < 1e-4);
//!
//! let breakeven = implied_probability(-110.0).unwrap();
//! assert!((breakeven - 0.5238).abs() < 1e-4);
//! ```

use crate::error::{EngineError, Result};

/// Validate an American price. Valid prices satisfy |odds| >= 100.
#[inline]
fn check(odds: f64) -> Result<()> {
    if !odds.is_finite() || odds.abs() < 100.0 {
        return Err(EngineError::InvalidOdds(odds));
    }
    Ok(())
}

/// Profit per 1 unit staked on a win (e.g. -110 -> 0.909, +150 -> 1.5)
pub fn american_to_payout(odds: f64) -> Result<f64> {
    check(odds)?;
    if odds > 0.0 {
        Ok(odds / 100.0)
    } else {
        Ok(100.0 / -odds)
    }
}

/// Decimal (European) odds: stake returned plus profit
pub fn american_to_decimal(odds: f64) -> Result<f64> {
    Ok(american_to_payout(odds)? + 1.0)
}

/// Break-even win probability implied by the price
pub fn implied_probability(odds: f64) -> Result<f64> {
    Ok(1.0 / american_to_decimal(odds)?)
}

/// Kelly criterion stake fraction for win probability `p` at net payout `b`.
///
/// Floored at zero: the engine never recommends taking the other side.
pub fn kelly_fraction(p: f64, payout: f64) -> f64 {
    if payout <= 0.0 || !p.is_finite() {
        return 0.0;
    }
    ((p * (payout + 1.0) - 1.0) / payout).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorite_and_underdog_payouts() {
        assert!((american_to_payout(-110.0).unwrap() - 100.0 / 110.0).abs() < 1e-12);
        assert!((american_to_payout(150.0).unwrap() - 1.5).abs() < 1e-12);
        assert!((american_to_decimal(-200.0).unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_odds_rejected() {
        assert!(matches!(american_to_payout(-99.0), Err(EngineError::InvalidOdds(_))));
        assert!(american_to_payout(f64::NAN).is_err());
        assert!(american_to_payout(0.0).is_err());
    }

    #[test]
    fn test_kelly_floors_at_zero() {
        let b = american_to_payout(-110.0).unwrap();
        // Breakeven at -110 is ~52.4%
        assert_eq!(kelly_fraction(0.50, b), 0.0);
        let k = kelly_fraction(0.60, b);
        assert!((k - (0.60 * (b + 1.0) - 1.0) / b).abs() < 1e-12);
        assert!(k > 0.15 && k < 0.17, "kelly at 60%: {:.4}", k);
    }
}
