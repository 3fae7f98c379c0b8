/*!
# Reflib CNT: Container

The top-level CNT reader/writer and the small value types shared between
them: subject sex/handedness, triggers, epoch index entries, and the file
version pair.
*/

mod header;
mod reader;
mod writer;

pub use header::{
	Information,
	Parameters,
};
pub use reader::CntReader;
pub use writer::CntWriter;

use crate::{
	wire::WireIo,
	CntError,
};
use std::{
	io::{
		Read,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
};



/// # Sidecar Path.
///
/// The EVT sidecar for a CNT recording at `path` lives alongside it with the
/// same file stem and an `.evt` extension.
pub(crate) fn sidecar_path(path: &Path) -> PathBuf { path.with_extension("evt") }



/// # Maximum Trigger Code Length (Bytes).
pub const TRIGGER_CODE_MAX_LEN: usize = 8;

/// # Maximum Free-Form Information Field Length (Bytes).
///
/// Larger than [`crate::electrode::ELECTRODE_FIELD_MAX_LEN`] because
/// recording-information fields (hospital, physician, comment, ...) are
/// free-form rather than fixed-width table columns.
pub const INFO_FIELD_MAX_LEN: usize = 64;



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// # Subject Sex.
///
/// Wire encoding: `0` = unknown, `1` = male, `2` = female.
pub enum Sex {
	/// # Unknown.
	Unknown,
	/// # Male.
	Male,
	/// # Female.
	Female,
}

impl Sex {
	const fn to_byte(self) -> u8 {
		match self { Self::Unknown => 0, Self::Male => 1, Self::Female => 2 }
	}

	const fn from_byte(b: u8) -> Option<Self> {
		match b {
			0 => Some(Self::Unknown),
			1 => Some(Self::Male),
			2 => Some(Self::Female),
			_ => None,
		}
	}
}

impl Default for Sex {
	fn default() -> Self { Self::Unknown }
}

impl WireIo for Sex {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Self::from_byte(u8::read_from(r)?)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.to_byte().write_to(w)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// # Subject Handedness.
///
/// Wire encoding: `0` = unknown, `1` = left, `2` = right, `3` = mixed.
pub enum Handedness {
	/// # Unknown.
	Unknown,
	/// # Left.
	Left,
	/// # Right.
	Right,
	/// # Mixed.
	Mixed,
}

impl Handedness {
	const fn to_byte(self) -> u8 {
		match self {
			Self::Unknown => 0,
			Self::Left => 1,
			Self::Right => 2,
			Self::Mixed => 3,
		}
	}

	const fn from_byte(b: u8) -> Option<Self> {
		match b {
			0 => Some(Self::Unknown),
			1 => Some(Self::Left),
			2 => Some(Self::Right),
			3 => Some(Self::Mixed),
			_ => None,
		}
	}
}

impl Default for Handedness {
	fn default() -> Self { Self::Unknown }
}

impl WireIo for Handedness {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Self::from_byte(u8::read_from(r)?)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.to_byte().write_to(w)
	}
}



#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// # Trigger.
///
/// A marker `(sample, code)` annotating a sample index. `code` is bounded to
/// [`TRIGGER_CODE_MAX_LEN`] bytes; longer codes fail with
/// [`CntError::InvalidTrigger`] at construction.
pub struct Trigger {
	sample: u64,
	code: String,
}

impl Trigger {
	/// # New.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidTrigger`] if `code` is longer than
	/// [`TRIGGER_CODE_MAX_LEN`] bytes.
	pub fn new(sample: u64, code: &str) -> Result<Self, CntError> {
		if code.len() > TRIGGER_CODE_MAX_LEN { return Err(CntError::InvalidTrigger); }
		Ok(Self { sample, code: code.to_owned() })
	}

	#[must_use]
	/// # Sample.
	pub const fn sample(&self) -> u64 { self.sample }

	#[must_use]
	/// # Code.
	pub fn code(&self) -> &str { &self.code }
}

impl WireIo for Trigger {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let sample = u64::read_from(r)?;
		let code = String::read_from(r)?;
		if code.len() > TRIGGER_CODE_MAX_LEN { return None; }
		Some(Self { sample, code })
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.sample.write_to(w)?;
		self.code.write_to(w)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Epoch Index Entry.
///
/// `(file_offset, byte_length)` of one compressed epoch payload, recorded in
/// recording order.
pub struct EpochIndexEntry {
	file_offset: u64,
	byte_length: u64,
}

impl EpochIndexEntry {
	#[must_use]
	/// # New.
	pub const fn new(file_offset: u64, byte_length: u64) -> Self {
		Self { file_offset, byte_length }
	}

	#[must_use]
	/// # File Offset.
	pub const fn file_offset(&self) -> u64 { self.file_offset }

	#[must_use]
	/// # Byte Length.
	pub const fn byte_length(&self) -> u64 { self.byte_length }
}

impl WireIo for EpochIndexEntry {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Some(Self { file_offset: u64::read_from(r)?, byte_length: u64::read_from(r)? })
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.file_offset.write_to(w)?;
		self.byte_length.write_to(w)
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # File Version.
pub struct FileVersion {
	major: u32,
	minor: u32,
}

impl FileVersion {
	#[must_use]
	/// # New.
	pub const fn new(major: u32, minor: u32) -> Self { Self { major, minor } }

	#[must_use]
	/// # Major.
	pub const fn major(&self) -> u32 { self.major }

	#[must_use]
	/// # Minor.
	pub const fn minor(&self) -> u32 { self.minor }
}

impl WireIo for FileVersion {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Some(Self { major: u32::read_from(r)?, minor: u32::read_from(r)? })
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.major.write_to(w)?;
		self.minor.write_to(w)
	}
}

/// # Current Reflib File Version.
///
/// Written by [`CntWriter`] on every new recording.
pub const CURRENT_VERSION: FileVersion = FileVersion { major: 1, minor: 0 };



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_sex_roundtrip() {
		for s in [Sex::Unknown, Sex::Male, Sex::Female] {
			let mut buf = Vec::new();
			s.write_to(&mut buf).unwrap();
			assert_eq!(Sex::read_from(&mut buf.as_slice()), Some(s));
		}
	}

	#[test]
	fn t_handedness_roundtrip() {
		for h in [Handedness::Unknown, Handedness::Left, Handedness::Right, Handedness::Mixed] {
			let mut buf = Vec::new();
			h.write_to(&mut buf).unwrap();
			assert_eq!(Handedness::read_from(&mut buf.as_slice()), Some(h));
		}
	}

	#[test]
	fn t_trigger_code_too_long() {
		assert!(matches!(Trigger::new(0, "toolongcode"), Err(CntError::InvalidTrigger)));
		assert!(Trigger::new(0, "12345678").is_ok());
	}

	#[test]
	fn t_trigger_ordering_by_sample() {
		let mut triggers = vec![
			Trigger::new(5, "End").unwrap(),
			Trigger::new(0, "Rare").unwrap(),
			Trigger::new(3, "Frequent").unwrap(),
		];
		triggers.sort();
		let samples: Vec<u64> = triggers.iter().map(Trigger::sample).collect();
		assert_eq!(samples, vec![0, 3, 5]);
	}

	#[test]
	fn t_epoch_index_roundtrip() {
		let e = EpochIndexEntry::new(128, 64);
		let mut buf = Vec::new();
		e.write_to(&mut buf).unwrap();
		assert_eq!(EpochIndexEntry::read_from(&mut buf.as_slice()), Some(e));
	}
}
