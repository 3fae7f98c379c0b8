/*!
# Reflib CNT: Quantisation

The original format stores every sample as a signed 32-bit integer; callers
work in real units (volts, typically) and each electrode carries the pair of
scale factors needed to convert between the two:

```text
stored = round(value / (iscale * rscale))
value  = stored * iscale * rscale
```

Rounding uses "round half to even" (banker's rounding) rather than the more
common "round half away from zero", matching the reference implementation's
use of a rounding mode that does not bias accumulated values upward over long
recordings.
*/



#[must_use]
/// # Round Half to Even.
///
/// Rust's [`f64::round`] rounds halves away from zero; this rounds halves to
/// the nearest even integer instead, then clamps to the signed 32-bit range
/// (samples outside it saturate rather than wrap).
pub(crate) fn round_half_even(x: f64) -> i32 {
	if ! x.is_finite() {
		return if x.is_sign_negative() { i32::MIN } else { i32::MAX };
	}

	let floor = x.floor();
	let diff = x - floor;

	#[allow(clippy::cast_possible_truncation)]
	let rounded =
		if diff < 0.5 { floor }
		else if diff > 0.5 { floor + 1.0 }
		else {
			// Exactly halfway: pick whichever neighbour is even.
			let floor_is_even = (floor.rem_euclid(2.0)) == 0.0;
			if floor_is_even { floor } else { floor + 1.0 }
		};

	if rounded >= f64::from(i32::MAX) { i32::MAX }
	else if rounded <= f64::from(i32::MIN) { i32::MIN }
	else { rounded as i32 }
}

#[must_use]
/// # Quantise a Real Value.
///
/// `round_half_even(value / (iscale * rscale))`.
pub(crate) fn quantise(value: f64, iscale: f64, rscale: f64) -> i32 {
	round_half_even(value / (iscale * rscale))
}

#[must_use]
/// # Dequantise a Stored Sample.
///
/// `stored as f64 * iscale * rscale`.
pub(crate) fn dequantise(stored: i32, iscale: f64, rscale: f64) -> f64 {
	f64::from(stored) * iscale * rscale
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_round_half_even() {
		assert_eq!(round_half_even(0.5), 0);
		assert_eq!(round_half_even(1.5), 2);
		assert_eq!(round_half_even(2.5), 2);
		assert_eq!(round_half_even(-0.5), 0);
		assert_eq!(round_half_even(-1.5), -2);
		assert_eq!(round_half_even(2.4), 2);
		assert_eq!(round_half_even(2.6), 3);
	}

	#[test]
	fn t_round_extremes() {
		assert_eq!(round_half_even(f64::INFINITY), i32::MAX);
		assert_eq!(round_half_even(f64::NEG_INFINITY), i32::MIN);
		assert_eq!(round_half_even(f64::NAN), i32::MAX);
		assert_eq!(round_half_even(1e30), i32::MAX);
		assert_eq!(round_half_even(-1e30), i32::MIN);
	}

	#[test]
	fn t_quantise_roundtrip() {
		let iscale = 1.0;
		let rscale = 1.0 / 256.0;
		let stored = quantise(1.0, iscale, rscale);
		assert_eq!(stored, 256);
		let back = dequantise(stored, iscale, rscale);
		assert!((back - 1.0).abs() < 1e-9);
	}
}
