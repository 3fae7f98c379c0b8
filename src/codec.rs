/*!
# Reflib CNT: Sample-Block Codec

This is the innermost hot path: a bespoke per-channel integer compression
scheme applied to one epoch (a fixed-size block of multi-channel signed
32-bit samples) at a time.

For each channel independently, the codec considers two candidate
representations — the raw sample stream, and its first difference along
time — and picks whichever fits in the smaller fixed bit width (`8`, `16`,
`24`, or `32` bits per sample), preferring the differenced stream on a tie.
Each channel is encoded with a tiny self-describing header (method + width),
so a corrupt or truncated block is caught before any value parsing begins.
*/

use crate::CntError;



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// # Matrix Orientation.
///
/// Every array-taking operation in this crate takes this as an explicit
/// parameter rather than trying to infer layout from a numeric-array type
/// (numeric array interop is out of scope for this crate).
pub enum Orientation {
	/// # Channels outer, samples inner.
	RowMajor,

	/// # Samples outer, channels inner.
	ColumnMajor,
}

impl Orientation {
	#[must_use]
	/// # Is Row-Major?
	pub const fn is_row_major(self) -> bool { matches!(self, Self::RowMajor) }

	#[must_use]
	/// # Is Column-Major?
	pub const fn is_column_major(self) -> bool { matches!(self, Self::ColumnMajor) }
}



#[derive(Debug, Clone, PartialEq)]
/// # Sample Matrix.
///
/// A minimal stand-in for a "real" numeric-array type: a flat `Vec<i32>`
/// plus a channel count, a sample count, and a tag recording which axis is
/// outer. This is the one array-like value this crate passes around; numeric
/// array interop of any kind is a deliberate non-goal.
pub struct SampleMatrix {
	channels: usize,
	samples: usize,
	orientation: Orientation,
	data: Vec<i32>,
}

impl SampleMatrix {
	/// # New.
	///
	/// Build a matrix from a flat buffer already laid out according to
	/// `orientation`. `channels` must evenly divide `data.len()`.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `channels` is zero or does not
	/// evenly divide the buffer length.
	pub fn new(data: Vec<i32>, channels: usize, orientation: Orientation) -> Result<Self, CntError> {
		if channels == 0 || data.len() % channels != 0 {
			return Err(CntError::ShapeMismatch { expected: channels, actual: data.len() });
		}
		let samples = data.len() / channels;
		Ok(Self { channels, samples, orientation, data })
	}

	#[must_use]
	/// # Channels.
	pub const fn channels(&self) -> usize { self.channels }

	#[must_use]
	/// # Samples.
	pub const fn samples(&self) -> usize { self.samples }

	#[must_use]
	/// # Orientation.
	pub const fn orientation(&self) -> Orientation { self.orientation }

	#[must_use]
	/// # Raw Data (As Stored).
	pub fn data(&self) -> &[i32] { &self.data }

	#[must_use]
	/// # Into Raw Data (As Stored).
	pub fn into_data(self) -> Vec<i32> { self.data }

	#[must_use]
	/// # Get Sample.
	///
	/// Return the value for a given `(sample, channel)` pair, regardless of
	/// the matrix's internal storage orientation.
	pub fn get(&self, sample: usize, channel: usize) -> i32 {
		match self.orientation {
			Orientation::ColumnMajor => self.data[sample * self.channels + channel],
			Orientation::RowMajor => self.data[channel * self.samples + sample],
		}
	}

	#[must_use]
	/// # To Orientation.
	///
	/// Return an equivalent matrix stored in `target` orientation,
	/// transposing only if necessary.
	pub fn to_orientation(&self, target: Orientation) -> Self {
		if target == self.orientation { return self.clone(); }

		let mut out = vec![0_i32; self.data.len()];
		for s in 0..self.samples {
			for ch in 0..self.channels {
				let v = self.get(s, ch);
				match target {
					Orientation::ColumnMajor => out[s * self.channels + ch] = v,
					Orientation::RowMajor => out[ch * self.samples + s] = v,
				}
			}
		}
		Self { channels: self.channels, samples: self.samples, orientation: target, data: out }
	}

	/// # From Canonical Column-Major Parts.
	///
	/// Used internally by the codec and reader, which always reconstruct
	/// column-major data.
	pub(crate) fn from_column_major(channels: usize, samples: usize, data: Vec<i32>) -> Self {
		debug_assert_eq!(data.len(), channels * samples);
		Self { channels, samples, orientation: Orientation::ColumnMajor, data }
	}
}



#[derive(Debug, Clone, PartialEq)]
/// # Real-Valued Sample Matrix.
///
/// The writer/reader-facing counterpart to [`SampleMatrix`]: the same flat
/// layout and orientation tag, but holding the caller's real-unit samples
/// (volts, typically) before quantisation on write, or after dequantisation
/// on read. The codec itself never sees this type — only already-quantised
/// signed 32-bit samples cross that boundary.
pub struct RealMatrix {
	channels: usize,
	samples: usize,
	orientation: Orientation,
	data: Vec<f64>,
}

impl RealMatrix {
	/// # New.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `channels` is zero or does not
	/// evenly divide `data.len()`.
	pub fn new(data: Vec<f64>, channels: usize, orientation: Orientation) -> Result<Self, CntError> {
		if channels == 0 || data.len() % channels != 0 {
			return Err(CntError::ShapeMismatch { expected: channels, actual: data.len() });
		}
		let samples = data.len() / channels;
		Ok(Self { channels, samples, orientation, data })
	}

	#[must_use]
	/// # Channels.
	pub const fn channels(&self) -> usize { self.channels }

	#[must_use]
	/// # Samples.
	pub const fn samples(&self) -> usize { self.samples }

	#[must_use]
	/// # Orientation.
	pub const fn orientation(&self) -> Orientation { self.orientation }

	#[must_use]
	/// # Raw Data (As Stored).
	pub fn data(&self) -> &[f64] { &self.data }

	#[must_use]
	/// # Get Sample.
	pub fn get(&self, sample: usize, channel: usize) -> f64 {
		match self.orientation {
			Orientation::ColumnMajor => self.data[sample * self.channels + channel],
			Orientation::RowMajor => self.data[channel * self.samples + sample],
		}
	}

	/// # From Canonical Column-Major Parts.
	pub(crate) fn from_column_major(channels: usize, samples: usize, data: Vec<f64>) -> Self {
		debug_assert_eq!(data.len(), channels * samples);
		Self { channels, samples, orientation: Orientation::ColumnMajor, data }
	}

	#[must_use]
	/// # To Orientation.
	pub fn to_orientation(&self, target: Orientation) -> Self {
		if target == self.orientation { return self.clone(); }

		let mut out = vec![0.0_f64; self.data.len()];
		for s in 0..self.samples {
			for ch in 0..self.channels {
				let v = self.get(s, ch);
				match target {
					Orientation::ColumnMajor => out[s * self.channels + ch] = v,
					Orientation::RowMajor => out[ch * self.samples + s] = v,
				}
			}
		}
		Self { channels: self.channels, samples: self.samples, orientation: target, data: out }
	}
}



/// # Fixed Bit Widths, Smallest First.
const WIDTHS: [u8; 4] = [8, 16, 24, 32];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Per-Channel Encoding Method.
enum Method {
	/// # Raw sample stream.
	Raw,
	/// # First-differenced sample stream.
	Diff,
}

/// # Minimum Fixed Width.
///
/// Return the smallest width in [`WIDTHS`] that represents every value in
/// `values` as a signed two's-complement integer of that width, or `None` if
/// none of them do (only possible for a differenced stream spanning more
/// than the full `i32` range).
fn min_width(values: &[i64]) -> Option<u8> {
	WIDTHS.into_iter().find(|&w| {
		let half = 1_i64 << (w - 1);
		let lo = -half;
		let hi = half - 1;
		values.iter().all(|&v| (lo..=hi).contains(&v))
	})
}

/// # Pack a Value Into `width` Bits (Byte-Aligned).
///
/// Every supported width is a whole number of bytes, so "packing" is just
/// truncating the value's little-endian two's-complement representation to
/// its low `width / 8` bytes.
fn pack_value(v: i64, width: u8, out: &mut Vec<u8>) {
	let nb = usize::from(width / 8);
	out.extend_from_slice(&v.to_le_bytes()[..nb]);
}

/// # Unpack a Sign-Extended Value From `width` Bits.
fn unpack_value(buf: &[u8], width: u8) -> i64 {
	let nb = usize::from(width / 8);
	let mut b = [0_u8; 8];
	b[..nb].copy_from_slice(&buf[..nb]);
	let raw = i64::from_le_bytes(b);
	let shift = 64 - u32::from(width);
	(raw << shift) >> shift
}

/// # Width Class (2-bit) From Width.
const fn width_to_class(width: u8) -> u8 {
	match width {
		8 => 0,
		16 => 1,
		24 => 2,
		_ => 3,
	}
}

/// # Width From Width Class.
const fn class_to_width(class: u8) -> u8 {
	match class & 0b11 {
		0 => 8,
		1 => 16,
		2 => 24,
		_ => 32,
	}
}



#[derive(Debug, Default, Clone, Copy)]
/// # Sample-Block Codec.
///
/// Compresses/decompresses one epoch (a `channels × samples` matrix of
/// signed 32-bit samples) to and from a byte string.
///
/// `sensors` (the channel count) is a required property that must be set
/// before the first `compress`/`decompress` call. It is write-only, matching
/// the source library's "set once, never read back" property: there is
/// simply no getter.
///
/// ```
/// use reflib_cnt::{Codec, Orientation, SampleMatrix};
///
/// let mut codec = Codec::new();
/// codec.set_sensors(2);
///
/// let matrix = SampleMatrix::new(vec![11, 21, 31, 41, 12, 22, 32, 42], 2, Orientation::RowMajor)
///     .unwrap();
/// let bytes = codec.compress(&matrix).unwrap();
/// let back = codec.decompress(&bytes, matrix.samples()).unwrap();
/// assert_eq!(back.to_orientation(Orientation::RowMajor).data(), matrix.data());
/// ```
pub struct Codec {
	sensors: Option<usize>,
}

impl Codec {
	#[must_use]
	/// # New.
	pub const fn new() -> Self { Self { sensors: None } }

	/// # Set Sensors.
	///
	/// Set (or change) the number of channels this codec instance expects.
	/// Must be called before the first `compress`/`decompress`.
	pub fn set_sensors(&mut self, sensors: usize) -> &mut Self {
		self.sensors = Some(sensors);
		self
	}

	/// # Compress.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `sensors` hasn't been set, the
	/// matrix's channel count doesn't match it, or the matrix has zero
	/// samples.
	pub fn compress(&self, matrix: &SampleMatrix) -> Result<Vec<u8>, CntError> {
		let sensors = self.sensors.ok_or(CntError::ShapeMismatch { expected: 0, actual: 0 })?;
		if matrix.channels() != sensors {
			return Err(CntError::ShapeMismatch { expected: sensors, actual: matrix.channels() });
		}
		let samples = matrix.samples();
		if samples == 0 {
			return Err(CntError::ShapeMismatch { expected: 1, actual: 0 });
		}

		let canonical = matrix.to_orientation(Orientation::ColumnMajor);
		let mut body = Vec::new();

		for ch in 0..sensors {
			let raw: Vec<i64> = (0..samples).map(|s| i64::from(canonical.get(s, ch))).collect();
			let mut diff: Vec<i64> = Vec::with_capacity(samples);
			diff.push(raw[0]);
			for s in 1..samples { diff.push(raw[s] - raw[s - 1]); }

			let width_raw = min_width(&raw).expect("i32 always fits in 32 bits");
			let (method, width) =
				if samples == 1 { (Method::Raw, width_raw) }
				else if let Some(width_diff) = min_width(&diff) {
					let size_raw = u32::from(width_raw) * samples as u32;
					let size_diff = u32::from(width_diff) * samples as u32;
					if size_diff <= size_raw { (Method::Diff, width_diff) }
					else { (Method::Raw, width_raw) }
				}
				else { (Method::Raw, width_raw) };

			let values: &[i64] = match method { Method::Raw => &raw, Method::Diff => &diff };

			let header = width_to_class(width) | (u8::from(matches!(method, Method::Diff)) << 2);
			body.push(header);

			let mut payload = Vec::with_capacity(samples * usize::from(width / 8));
			for &v in values { pack_value(v, width, &mut payload); }

			body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
			body.extend_from_slice(&payload);
		}

		let mut out = Vec::with_capacity(8 + body.len());
		out.extend_from_slice(&(sensors as u32).to_le_bytes());
		out.extend_from_slice(&(body.len() as u32).to_le_bytes());
		out.extend_from_slice(&body);
		Ok(out)
	}

	/// # Decompress.
	///
	/// `samples` must be the exact sample count used at compression time.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `sensors` hasn't been set, or
	/// [`CntError::CorruptBlock`] if the internal lengths of `bytes`
	/// disagree with each other or with `samples`.
	pub fn decompress(&self, bytes: &[u8], samples: usize) -> Result<SampleMatrix, CntError> {
		let sensors = self.sensors.ok_or(CntError::ShapeMismatch { expected: 0, actual: 0 })?;
		if samples == 0 {
			return Err(CntError::ShapeMismatch { expected: 1, actual: 0 });
		}
		if bytes.len() < 8 { return Err(CntError::CorruptBlock("block too short for header")); }

		let block_sensors = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
		let total_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
		if block_sensors != sensors {
			return Err(CntError::CorruptBlock("sensor count does not match codec configuration"));
		}
		let body = &bytes[8..];
		if body.len() != total_len {
			return Err(CntError::CorruptBlock("declared length does not match block size"));
		}

		let mut data = vec![0_i32; sensors * samples];
		let mut pos = 0_usize;
		for ch in 0..sensors {
			if body.len() < pos + 1 {
				return Err(CntError::CorruptBlock("truncated channel header"));
			}
			let header = body[pos];
			pos += 1;
			let width = class_to_width(header);
			let method = if header & 0b100 != 0 { Method::Diff } else { Method::Raw };

			if body.len() < pos + 4 {
				return Err(CntError::CorruptBlock("truncated channel payload length"));
			}
			let payload_len = u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap()) as usize;
			pos += 4;

			let nb = usize::from(width / 8);
			if payload_len != nb * samples {
				return Err(CntError::CorruptBlock("channel payload length does not match sample count"));
			}
			if body.len() < pos + payload_len {
				return Err(CntError::CorruptBlock("truncated channel payload"));
			}
			let payload = &body[pos..pos + payload_len];
			pos += payload_len;

			let mut running: i64 = 0;
			for (s, chunk) in payload.chunks_exact(nb).enumerate() {
				let v = unpack_value(chunk, width);
				let sample = match method {
					Method::Raw => v,
					Method::Diff => { running += v; running }
				};
				data[s * sensors + ch] = sample as i32;
			}
		}

		Ok(SampleMatrix::from_column_major(sensors, samples, data))
	}

	/// # Peek Sample Count.
	///
	/// Reads just enough of a compressed block's header to recover the
	/// number of samples it was compressed from, without unpacking any
	/// channel's values. Useful when the sample count of a block isn't
	/// recorded anywhere else, since every channel's payload length is a
	/// multiple of that channel's packed width.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `sensors` hasn't been set, or
	/// [`CntError::CorruptBlock`] if the block's header is malformed.
	pub(crate) fn sample_count(&self, bytes: &[u8]) -> Result<usize, CntError> {
		let sensors = self.sensors.ok_or(CntError::ShapeMismatch { expected: 0, actual: 0 })?;
		if bytes.len() < 8 { return Err(CntError::CorruptBlock("block too short for header")); }

		let block_sensors = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
		if block_sensors != sensors {
			return Err(CntError::CorruptBlock("sensor count does not match codec configuration"));
		}

		let body = &bytes[8..];
		if body.len() < 1 + 4 {
			return Err(CntError::CorruptBlock("truncated channel header"));
		}
		let header = body[0];
		let width = class_to_width(header);
		let nb = usize::from(width / 8);
		let payload_len = u32::from_le_bytes(body[1..5].try_into().unwrap()) as usize;
		if nb == 0 || payload_len % nb != 0 {
			return Err(CntError::CorruptBlock("channel payload length is not a multiple of its width"));
		}

		Ok(payload_len / nb)
	}
}



#[cfg(test)]
mod test {
	use super::*;

	fn codec(sensors: usize) -> Codec {
		let mut c = Codec::new();
		c.set_sensors(sensors);
		c
	}

	#[test]
	fn t_roundtrip_column_major() {
		let c = codec(2);
		let matrix = SampleMatrix::new(vec![11, 12, 21, 22, 31, 32, 41, 42], 2, Orientation::ColumnMajor).unwrap();
		let bytes = c.compress(&matrix).unwrap();
		let back = c.decompress(&bytes, 4).unwrap();
		assert_eq!(back.data(), matrix.data());
	}

	#[test]
	fn t_roundtrip_row_major_input() {
		let c = codec(4);
		// channels outer, samples inner: 4 channels x 2 samples.
		let data = vec![
			13, 14,
			23, 24,
			33, 34,
			43, 44,
		];
		let matrix = SampleMatrix::new(data.clone(), 4, Orientation::RowMajor).unwrap();
		let bytes = c.compress(&matrix).unwrap();
		let back = c.decompress(&bytes, 2).unwrap().to_orientation(Orientation::RowMajor);
		assert_eq!(back.data(), &data);
	}

	#[test]
	fn t_single_sample_uses_raw() {
		let c = codec(1);
		let matrix = SampleMatrix::new(vec![42], 1, Orientation::ColumnMajor).unwrap();
		let bytes = c.compress(&matrix).unwrap();
		// Header byte sits right after the 8-byte block prefix.
		let header = bytes[8];
		assert_eq!(header & 0b100, 0, "single-sample channel should use the raw method");
		let back = c.decompress(&bytes, 1).unwrap();
		assert_eq!(back.get(0, 0), 42);
	}

	#[test]
	fn t_prefers_diff_on_tie() {
		// A constant stream: raw values all equal, diffs all zero after the
		// first. Both fit in 8 bits at the same size; diff should win.
		let c = codec(1);
		let matrix = SampleMatrix::new(vec![5, 5, 5, 5], 1, Orientation::ColumnMajor).unwrap();
		let bytes = c.compress(&matrix).unwrap();
		let header = bytes[8];
		assert_eq!(header & 0b100, 0b100, "equal-size tie should prefer diff");
		assert_eq!(header & 0b11, 0, "should pick the 8-bit width class");
	}

	#[test]
	fn t_large_values_extreme_diff_falls_back_to_raw() {
		let c = codec(1);
		let matrix = SampleMatrix::new(vec![i32::MIN, i32::MAX, i32::MIN], 1, Orientation::ColumnMajor).unwrap();
		let bytes = c.compress(&matrix).unwrap();
		let back = c.decompress(&bytes, 3).unwrap();
		assert_eq!(back.data(), matrix.data());
	}

	#[test]
	fn t_zero_samples_rejected() {
		let c = codec(1);
		let err = SampleMatrix::new(Vec::new(), 1, Orientation::ColumnMajor)
			.and_then(|m| c.compress(&m));
		assert!(matches!(err, Err(CntError::ShapeMismatch { .. })));
	}

	#[test]
	fn t_shape_mismatch() {
		let c = codec(4);
		let matrix = SampleMatrix::new(vec![1, 2, 3, 4], 2, Orientation::ColumnMajor).unwrap();
		assert!(matches!(c.compress(&matrix), Err(CntError::ShapeMismatch { expected: 4, actual: 2 })));
	}

	#[test]
	fn t_sensors_unset() {
		let c = Codec::new();
		let matrix = SampleMatrix::new(vec![1, 2], 1, Orientation::ColumnMajor).unwrap();
		assert!(c.compress(&matrix).is_err());
	}

	#[test]
	fn t_real_matrix_transpose() {
		let m = RealMatrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, Orientation::ColumnMajor).unwrap();
		let t = m.to_orientation(Orientation::RowMajor);
		assert_eq!(t.get(0, 0), 1.0);
		assert_eq!(t.get(1, 0), 2.0);
		assert_eq!(t.get(0, 1), 3.0);
	}

	#[test]
	fn t_corrupt_block_detected() {
		let c = codec(2);
		let matrix = SampleMatrix::new(vec![1, 2, 3, 4], 2, Orientation::ColumnMajor).unwrap();
		let mut bytes = c.compress(&matrix).unwrap();
		// Corrupt the declared body length.
		bytes[4] = bytes[4].wrapping_add(1);
		assert!(matches!(c.decompress(&bytes, 2), Err(CntError::CorruptBlock(_))));
	}
}
