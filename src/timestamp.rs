/*!
# Reflib CNT: Timestamp
*/

use std::time::{
	SystemTime,
	UNIX_EPOCH,
};



#[derive(Debug, Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
/// # Timestamp.
///
/// A UTC instant, represented as a signed count of microseconds since
/// `1970-01-01T00:00:00Z`. This performs no calendar math and carries no
/// timezone beyond "UTC"; it exists purely to give every "UTC instant" in
/// this crate (start times, trigger-free event stamps, dates of birth)
/// exact round-trip equality at the precision callers actually capture
/// timestamps with.
pub struct Timestamp(i64);

impl Timestamp {
	#[must_use]
	/// # Now.
	///
	/// Capture the current system time as a `Timestamp`. Falls back to the
	/// Unix epoch itself if the system clock is somehow set before 1970.
	pub fn now() -> Self {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(Self(0), |d| Self(d.as_micros().min(i64::MAX as u128) as i64))
	}

	#[must_use]
	/// # From Microseconds.
	///
	/// Build a `Timestamp` directly from a microsecond tick count since the
	/// Unix epoch. Negative values represent instants before 1970.
	pub const fn from_micros(micros: i64) -> Self { Self(micros) }

	#[must_use]
	/// # As Microseconds.
	///
	/// Return the underlying microsecond tick count since the Unix epoch.
	pub const fn as_micros(self) -> i64 { self.0 }
}

impl From<SystemTime> for Timestamp {
	fn from(src: SystemTime) -> Self {
		match src.duration_since(UNIX_EPOCH) {
			Ok(d) => Self(d.as_micros().min(i64::MAX as u128) as i64),
			// Time before the epoch; `duration_since` fails in that
			// direction, so invert it by hand.
			Err(e) => Self(-(e.duration().as_micros().min(i64::MAX as u128) as i64)),
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_roundtrip() {
		let t = Timestamp::from_micros(1_234_567_890);
		assert_eq!(t.as_micros(), 1_234_567_890);
	}

	#[test]
	fn t_ordering() {
		let a = Timestamp::from_micros(10);
		let b = Timestamp::from_micros(20);
		assert!(a < b);
	}

	#[test]
	fn t_pre_epoch() {
		let before = UNIX_EPOCH - std::time::Duration::from_secs(5);
		let t = Timestamp::from(before);
		assert_eq!(t.as_micros(), -5_000_000);
	}

	#[test]
	fn t_now_after_default() {
		assert!(Timestamp::now() >= Timestamp::default());
	}
}
