//! Argument parsing and ride pricing.
//!
//! Money is `rust_decimal::Decimal` throughout; costs are rounded with
//! `RoundingStrategy::MidpointNearestEven`. Coordinates are the only
//! floating point values and are range-checked on entry.

use std::str::FromStr;

use bikeshare_records::GeoPoint;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::PricingConfig;
use crate::error::WorkflowError;

const SECONDS_PER_MINUTE: i64 = 60;

/// Parse a decimal balance such as `"25"`, `"-3.50"` or `"0.1"`.
pub fn parse_balance(text: &str) -> Result<Decimal, WorkflowError> {
    Decimal::from_str(text.trim())
        .map_err(|e| WorkflowError::Validation(format!("Invalid balance '{}': {}.", text, e)))
}

fn parse_coordinate(text: &str, name: &str, limit: f64) -> Result<f64, WorkflowError> {
    let value: f64 = text.trim().parse().map_err(|_| {
        WorkflowError::Validation(format!("Invalid {} '{}': not a number.", name, text))
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(WorkflowError::Validation(format!(
            "Invalid {} '{}': must be within [-{}, {}].",
            name, text, limit, limit
        )));
    }
    Ok(value)
}

/// Parse a `(longitude, latitude)` argument pair.
pub fn parse_location(longitude: &str, latitude: &str) -> Result<GeoPoint, WorkflowError> {
    Ok(GeoPoint::new(
        parse_coordinate(longitude, "longitude", 180.0)?,
        parse_coordinate(latitude, "latitude", 90.0)?,
    ))
}

/// Cost of a ride from `start` to `end` (Unix seconds).
///
/// `elapsed_seconds * rate_per_minute / 60`, rounded to `cost_scale` places.
/// An end before the start (clock skew) costs nothing.
pub fn ride_cost(start: i64, end: i64, pricing: &PricingConfig) -> Result<Decimal, WorkflowError> {
    let elapsed = end.saturating_sub(start).max(0);
    let cost = Decimal::from(elapsed)
        .checked_mul(pricing.rate_per_minute)
        .and_then(|c| c.checked_div(Decimal::from(SECONDS_PER_MINUTE)))
        .ok_or_else(|| {
            WorkflowError::Validation(format!("Ride cost overflows for {} seconds.", elapsed))
        })?;
    Ok(cost.round_dp_with_strategy(pricing.cost_scale, RoundingStrategy::MidpointNearestEven))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pricing() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn ten_minutes_at_reference_rate() {
        assert_eq!(ride_cost(1_000, 1_600, &pricing()).unwrap(), dec("1.00"));
    }

    #[test]
    fn partial_minutes_are_charged_pro_rata() {
        assert_eq!(ride_cost(0, 90, &pricing()).unwrap(), dec("0.15"));
    }

    #[test]
    fn midpoint_rounds_to_even() {
        // 75 s -> 0.125 -> 0.12; 45 s -> 0.075 -> 0.08
        assert_eq!(ride_cost(0, 75, &pricing()).unwrap(), dec("0.12"));
        assert_eq!(ride_cost(0, 45, &pricing()).unwrap(), dec("0.08"));
    }

    #[test]
    fn clock_skew_costs_nothing() {
        assert_eq!(ride_cost(500, 400, &pricing()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn custom_rate_and_scale() {
        let p = PricingConfig {
            rate_per_minute: dec("0.333"),
            cost_scale: 3,
        };
        // 60 s * 0.333 / 60 = 0.333
        assert_eq!(ride_cost(0, 60, &p).unwrap(), dec("0.333"));
        let p = PricingConfig {
            rate_per_minute: dec("1"),
            cost_scale: 0,
        };
        // 150 s -> 2.5 minutes -> 2
        assert_eq!(ride_cost(0, 150, &p).unwrap(), dec("2"));
    }

    #[test]
    fn balances_parse_exactly() {
        assert_eq!(parse_balance("10").unwrap(), dec("10"));
        assert_eq!(parse_balance("-3.50").unwrap(), dec("-3.50"));
        assert!(parse_balance("ten").is_err());
        assert!(parse_balance("").is_err());
    }

    #[test]
    fn locations_are_range_checked() {
        let p = parse_location("-122.42", "37.77").unwrap();
        assert_eq!(p, GeoPoint::new(-122.42, 37.77));
        assert!(parse_location("180.5", "0").is_err());
        assert!(parse_location("0", "-90.01").is_err());
        assert!(parse_location("NaN", "0").is_err());
        assert!(parse_location("inf", "0").is_err());
        assert!(parse_location("east", "0").is_err());
    }
}
