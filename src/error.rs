/*!
# Reflib CNT: Errors
*/

use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
///
/// One variant per failure mode a caller of this crate can actually hit.
/// Each variant carries whatever context is needed to produce an actionable
/// [`Display`](fmt::Display) message without a caller having to go digging.
pub enum CntError {
	/// # Sample matrix channel count didn't match the electrode count.
	ShapeMismatch {
		/// # Expected channel count.
		expected: usize,
		/// # Actual channel count.
		actual: usize,
	},

	/// # A range query fell outside `0..sample_count`.
	OutOfRange {
		/// # Requested first sample.
		first: u64,
		/// # Requested sample count.
		count: u64,
		/// # Total samples available.
		total: u64,
	},

	/// # A setter received a value violating §3's field constraints.
	InvalidField(&'static str),

	/// # A trigger code was longer than eight bytes.
	InvalidTrigger,

	/// # A `param` field was mutated after the first sample was appended.
	WriterLocked,

	/// # An append/event call arrived after `close`.
	WriterClosed,

	/// # The file's outer tag wasn't a recognised RIFF/RIFF64 magic.
	NotAContainer,

	/// # The file ended before its declared length.
	Truncated,

	/// # A named chunk failed header validation.
	CorruptHeader(&'static str),

	/// # A compressed epoch block failed internal consistency checks.
	CorruptBlock(&'static str),

	/// # Underlying I/O failure.
	Io(String),
}

impl Error for CntError {}

impl From<std::io::Error> for CntError {
	#[inline]
	fn from(err: std::io::Error) -> Self { Self::Io(err.to_string()) }
}

impl fmt::Display for CntError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ShapeMismatch { expected, actual } => write!(
				f,
				"Matrix has {actual} channel(s); expected {expected}.",
			),
			Self::OutOfRange { first, count, total } => write!(
				f,
				"Range {first}..{} is out of bounds for {total} sample(s).",
				first.saturating_add(*count),
			),
			Self::InvalidField(field) => write!(f, "Invalid value for field `{field}`."),
			Self::InvalidTrigger => f.write_str("Trigger codes are limited to eight bytes."),
			Self::WriterLocked => f.write_str("Recording parameters are frozen after the first append."),
			Self::WriterClosed => f.write_str("The writer has already been closed."),
			Self::NotAContainer => f.write_str("Not a RIFF/RIFF64 container."),
			Self::Truncated => f.write_str("The file ended before its declared length."),
			Self::CorruptHeader(field) => write!(f, "Corrupt header: invalid `{field}`."),
			Self::CorruptBlock(reason) => write!(f, "Corrupt compressed block: {reason}."),
			Self::Io(s) => write!(f, "I/O error: {s}."),
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_display() {
		assert_eq!(
			CntError::InvalidTrigger.to_string(),
			"Trigger codes are limited to eight bytes.",
		);
		assert_eq!(
			CntError::ShapeMismatch { expected: 4, actual: 2 }.to_string(),
			"Matrix has 2 channel(s); expected 4.",
		);
	}

	#[test]
	fn t_from_io() {
		let io = std::io::Error::new(std::io::ErrorKind::Other, "nope");
		let err: CntError = io.into();
		assert!(matches!(err, CntError::Io(_)));
	}
}
