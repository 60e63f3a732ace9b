//! Amount and time codec.
//!
//! Converts the values a holder types in (decimal token amounts, local
//! date-times) into the integers carried by the authorization: base units
//! with six implied decimals and Unix seconds.

use crate::builder::parse_address;
use crate::RelayError;
use alloy_primitives::U256;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use relay_types::{format_token_amount, TransferIntent, TransferRequest};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimals of the supported stablecoin.
pub const TOKEN_DECIMALS: u32 = 6;

/// Accepted naive date-time layouts, tried in order.
const NAIVE_FORMATS: [&str; 4] = [
	"%Y-%m-%dT%H:%M",
	"%Y-%m-%dT%H:%M:%S",
	"%Y-%m-%d %H:%M",
	"%Y-%m-%d %H:%M:%S",
];

/// Converts a decimal token amount into base units.
///
/// Rounds half away from zero at the sixth decimal. Zero, negative and
/// non-numeric inputs are rejected, as are amounts that round to zero.
pub fn to_base_units(amount: &str) -> Result<U256, RelayError> {
	let trimmed = amount.trim();
	let value = Decimal::from_str(trimmed)
		.map_err(|_| RelayError::InvalidAmount(format!("'{}' is not a number", amount)))?;

	if value.is_sign_negative() && !value.is_zero() {
		return Err(RelayError::InvalidAmount(format!(
			"'{}' must not be negative",
			amount
		)));
	}

	let scaled = value
		.checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS)))
		.ok_or_else(|| RelayError::InvalidAmount(format!("'{}' is too large", amount)))?
		.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

	if scaled.is_zero() {
		return Err(RelayError::InvalidAmount(format!(
			"'{}' must be greater than zero",
			amount
		)));
	}

	scaled
		.to_u128()
		.map(U256::from)
		.ok_or_else(|| RelayError::InvalidAmount(format!("'{}' is out of range", amount)))
}

/// Renders base units as a decimal token amount, trailing zeros trimmed.
pub fn from_base_units(units: U256) -> String {
	format_token_amount(&units.to_string(), TOKEN_DECIMALS as u8)
}

/// Renders base units with exactly two decimals for listings.
pub fn format_display_amount(units: U256) -> String {
	let display = u128::try_from(units)
		.ok()
		.and_then(|v| i128::try_from(v).ok())
		.and_then(|v| Decimal::try_from_i128_with_scale(v, TOKEN_DECIMALS).ok())
		.map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero));

	match display {
		Some(value) => format!("{:.2}", value),
		None => from_base_units(units),
	}
}

/// Builds a fixed offset from minutes east of UTC.
pub fn local_offset(minutes: i32) -> Result<FixedOffset, RelayError> {
	minutes
		.checked_mul(60)
		.and_then(FixedOffset::east_opt)
		.ok_or_else(|| RelayError::InvalidTimestamp(format!("offset {} minutes", minutes)))
}

/// Converts a date-time string into Unix seconds.
///
/// Accepts epoch seconds, RFC 3339, and the naive layouts in
/// [`NAIVE_FORMATS`]; naive values are read in `offset`.
pub fn to_epoch_seconds(input: &str, offset: FixedOffset) -> Result<u64, RelayError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(RelayError::InvalidTimestamp("empty date-time".to_string()));
	}

	if trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return trimmed
			.parse::<u64>()
			.map_err(|e| RelayError::InvalidTimestamp(format!("'{}': {}", input, e)));
	}

	if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
		return non_negative(parsed.timestamp(), input);
	}

	for format in NAIVE_FORMATS {
		if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
			let local = offset.from_local_datetime(&naive).single().ok_or_else(|| {
				RelayError::InvalidTimestamp(format!("'{}' is ambiguous", input))
			})?;
			return non_negative(local.timestamp(), input);
		}
	}

	Err(RelayError::InvalidTimestamp(format!(
		"'{}' is not a recognised date-time",
		input
	)))
}

fn non_negative(timestamp: i64, input: &str) -> Result<u64, RelayError> {
	u64::try_from(timestamp)
		.map_err(|_| RelayError::InvalidTimestamp(format!("'{}' is before 1970", input)))
}

/// Normalizes a raw form submission into a [`TransferIntent`].
///
/// Only decoding happens here; window and amount invariants are checked by
/// [`crate::builder::validate_intent`].
pub fn decode_request(
	request: &TransferRequest,
	offset: FixedOffset,
) -> Result<TransferIntent, RelayError> {
	let valid_after = match (&request.valid_after, request.valid_immediately) {
		(_, true) | (None, false) => 0,
		(Some(raw), false) if raw.trim().is_empty() => 0,
		(Some(raw), false) => to_epoch_seconds(raw, offset)?,
	};

	Ok(TransferIntent {
		sender: parse_address(&request.sender)?,
		receiver: parse_address(&request.receiver)?,
		amount: to_base_units(&request.amount)?,
		valid_after,
		valid_before: to_epoch_seconds(&request.valid_before, offset)?,
		origin_chain: request.origin_chain,
		destination_chain: request.destination_chain,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_to_base_units() {
		assert_eq!(to_base_units("10.50").unwrap(), U256::from(10_500_000u64));
		assert_eq!(to_base_units(" 1 ").unwrap(), U256::from(1_000_000u64));
		assert_eq!(to_base_units("0.000001").unwrap(), U256::from(1u64));
		// Half rounds away from zero at the sixth decimal.
		assert_eq!(to_base_units("0.0000015").unwrap(), U256::from(2u64));
		assert_eq!(to_base_units("0.0000014").unwrap(), U256::from(1u64));
	}

	#[test]
	fn test_to_base_units_rejects() {
		for input in ["", "abc", "-1", "0", "0.00", "0.0000004"] {
			assert!(
				matches!(to_base_units(input), Err(RelayError::InvalidAmount(_))),
				"accepted {:?}",
				input
			);
		}
	}

	#[test]
	fn test_amounts_survive_display_and_back() {
		for amount in ["10.5", "0.01", "1234567.89", "7"] {
			let units = to_base_units(amount).unwrap();
			assert_eq!(from_base_units(units), amount);
			assert_eq!(to_base_units(&from_base_units(units)).unwrap(), units);
		}
	}

	#[test]
	fn test_format_display_amount() {
		assert_eq!(format_display_amount(U256::from(10_500_000u64)), "10.50");
		assert_eq!(format_display_amount(U256::from(1u64)), "0.00");
		assert_eq!(format_display_amount(U256::from(5_000u64)), "0.01");
		assert_eq!(format_display_amount(U256::MAX), from_base_units(U256::MAX));
	}

	#[test]
	fn test_to_epoch_seconds_formats() {
		let utc = local_offset(0).unwrap();
		assert_eq!(to_epoch_seconds("1700000000", utc).unwrap(), 1_700_000_000);
		assert_eq!(to_epoch_seconds("2024-01-01T00:00", utc).unwrap(), 1_704_067_200);
		assert_eq!(to_epoch_seconds("2024-01-01T00:00:30", utc).unwrap(), 1_704_067_230);
		assert_eq!(to_epoch_seconds("2024-01-01 00:01", utc).unwrap(), 1_704_067_260);
		assert_eq!(
			to_epoch_seconds("2024-01-01T02:00:00+02:00", utc).unwrap(),
			1_704_067_200
		);
	}

	#[test]
	fn test_to_epoch_seconds_uses_offset() {
		let cet = local_offset(60).unwrap();
		assert_eq!(to_epoch_seconds("2024-01-01T01:00", cet).unwrap(), 1_704_067_200);
		// Explicit offsets win over the local one.
		assert_eq!(to_epoch_seconds("2024-01-01T00:00:00Z", cet).unwrap(), 1_704_067_200);
	}

	#[test]
	fn test_to_epoch_seconds_rejects() {
		let utc = local_offset(0).unwrap();
		for input in ["", "tomorrow", "2024-13-01T00:00", "1969-12-31T23:59"] {
			assert!(matches!(
				to_epoch_seconds(input, utc),
				Err(RelayError::InvalidTimestamp(_))
			));
		}
		assert!(local_offset(24 * 60).is_err());
	}

	#[test]
	fn test_decode_request() {
		let request = TransferRequest {
			sender: "f39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
			receiver: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
			amount: "10.50".to_string(),
			valid_after: Some("2024-01-01T00:00".to_string()),
			valid_before: "2024-01-02T00:00".to_string(),
			valid_immediately: true,
			origin_chain: 1,
			destination_chain: 8453,
		};
		let intent = decode_request(&request, local_offset(0).unwrap()).unwrap();
		assert_eq!(intent.valid_after, 0);
		assert_eq!(intent.valid_before, 1_704_153_600);
		assert_eq!(intent.amount, U256::from(10_500_000u64));
		assert!(intent.is_cross_chain());

		let scheduled = TransferRequest {
			valid_immediately: false,
			..request.clone()
		};
		let intent = decode_request(&scheduled, local_offset(0).unwrap()).unwrap();
		assert_eq!(intent.valid_after, 1_704_067_200);

		let bad_receiver = TransferRequest {
			receiver: "0x1234".to_string(),
			..request
		};
		assert!(matches!(
			decode_request(&bad_receiver, local_offset(0).unwrap()),
			Err(RelayError::InvalidAddress(_))
		));
	}
}
