/*!
# Reflib CNT: Event Stream (EVT Sidecar)

A parallel container, using the same chunked framing as the CNT file itself
(see [`crate::chunk`]), holding three kinds of timestamped event: impedance
checks, video markers, and epoch markers. The writer accumulates records in
memory and finalises them into chunks on [`EvtWriter::close`]; the reader
loads all three lists eagerly on open.
*/

use crate::{
	chunk::{
		ChunkReader,
		ChunkWriter,
		ContainerForm,
	},
	wire::{
		read_vec,
		write_vec,
		WireIo,
	},
	CntError,
	Timestamp,
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



/// # EVT Form Tag.
const FORM_TAG: &[u8; 4] = b"EVT ";
/// # Impedance Chunk Tag.
const TAG_IMPEDANCE: &[u8; 4] = b"IMP ";
/// # Video Chunk Tag.
const TAG_VIDEO: &[u8; 4] = b"VID ";
/// # Epoch Marker Chunk Tag.
const TAG_MARKER: &[u8; 4] = b"EPM ";



#[derive(Debug, Clone, PartialEq)]
/// # Impedance Event.
///
/// Electrode impedance values captured at `stamp`, in ohms. Persisted on the
/// wire in kΩ (divided by 1000); [`Self::values_ohms`] always returns ohms,
/// same units the caller supplied.
pub struct Impedance {
	stamp: Timestamp,
	values_ohms: Vec<f64>,
}

impl Impedance {
	#[must_use]
	/// # New.
	pub const fn new(stamp: Timestamp, values_ohms: Vec<f64>) -> Self {
		Self { stamp, values_ohms }
	}

	#[must_use]
	/// # Stamp.
	pub const fn stamp(&self) -> Timestamp { self.stamp }

	#[must_use]
	/// # Values (Ohms).
	pub fn values_ohms(&self) -> &[f64] { &self.values_ohms }
}

impl WireIo for Impedance {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let stamp = Timestamp::read_from(r)?;
		let kohms: Vec<f64> = read_vec(r)?;
		Some(Self { stamp, values_ohms: kohms.into_iter().map(|v| v * 1000.0).collect() })
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.stamp.write_to(w)?;
		let kohms: Vec<f64> = self.values_ohms.iter().map(|v| v / 1000.0).collect();
		write_vec(&kohms, w)
	}
}



#[derive(Debug, Clone, PartialEq)]
/// # Video Event.
pub struct Video {
	stamp: Timestamp,
	duration_seconds: f64,
	trigger_code: i32,
	condition_label: String,
	description: String,
	video_file: String,
}

impl Video {
	#[must_use]
	/// # New.
	pub const fn new(
		stamp: Timestamp,
		duration_seconds: f64,
		trigger_code: i32,
		condition_label: String,
		description: String,
		video_file: String,
	) -> Self {
		Self { stamp, duration_seconds, trigger_code, condition_label, description, video_file }
	}

	#[must_use]
	/// # Stamp.
	pub const fn stamp(&self) -> Timestamp { self.stamp }

	#[must_use]
	/// # Duration (Seconds).
	pub const fn duration_seconds(&self) -> f64 { self.duration_seconds }

	#[must_use]
	/// # Trigger Code.
	pub const fn trigger_code(&self) -> i32 { self.trigger_code }

	#[must_use]
	/// # Condition Label.
	pub fn condition_label(&self) -> &str { &self.condition_label }

	#[must_use]
	/// # Description.
	pub fn description(&self) -> &str { &self.description }

	#[must_use]
	/// # Video File.
	pub fn video_file(&self) -> &str { &self.video_file }
}

impl WireIo for Video {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Some(Self {
			stamp: Timestamp::read_from(r)?,
			duration_seconds: f64::read_from(r)?,
			trigger_code: i32::read_from(r)?,
			condition_label: String::read_from(r)?,
			description: String::read_from(r)?,
			video_file: String::read_from(r)?,
		})
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.stamp.write_to(w)?;
		self.duration_seconds.write_to(w)?;
		self.trigger_code.write_to(w)?;
		self.condition_label.write_to(w)?;
		self.description.write_to(w)?;
		self.video_file.write_to(w)
	}
}



#[derive(Debug, Clone, PartialEq)]
/// # Epoch Marker Event.
pub struct EpochMarker {
	stamp: Timestamp,
	duration_seconds: f64,
	offset_seconds: f64,
	trigger_code: i32,
	condition_label: String,
}

impl EpochMarker {
	#[must_use]
	/// # New.
	pub const fn new(
		stamp: Timestamp,
		duration_seconds: f64,
		offset_seconds: f64,
		trigger_code: i32,
		condition_label: String,
	) -> Self {
		Self { stamp, duration_seconds, offset_seconds, trigger_code, condition_label }
	}

	#[must_use]
	/// # Stamp.
	pub const fn stamp(&self) -> Timestamp { self.stamp }

	#[must_use]
	/// # Duration (Seconds).
	pub const fn duration_seconds(&self) -> f64 { self.duration_seconds }

	#[must_use]
	/// # Offset (Seconds).
	pub const fn offset_seconds(&self) -> f64 { self.offset_seconds }

	#[must_use]
	/// # Trigger Code.
	pub const fn trigger_code(&self) -> i32 { self.trigger_code }

	#[must_use]
	/// # Condition Label.
	pub fn condition_label(&self) -> &str { &self.condition_label }
}

impl WireIo for EpochMarker {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		Some(Self {
			stamp: Timestamp::read_from(r)?,
			duration_seconds: f64::read_from(r)?,
			offset_seconds: f64::read_from(r)?,
			trigger_code: i32::read_from(r)?,
			condition_label: String::read_from(r)?,
		})
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.stamp.write_to(w)?;
		self.duration_seconds.write_to(w)?;
		self.offset_seconds.write_to(w)?;
		self.trigger_code.write_to(w)?;
		self.condition_label.write_to(w)
	}
}



/// # EVT Sidecar Writer.
///
/// Accumulates impedance/video/epoch-marker records in memory and writes
/// them out as three chunks on [`Self::close`]. A chunk is omitted entirely
/// if its record list is empty, so a reader opening a sidecar with only
/// impedance events sees no `VID `/`EPM ` chunks at all.
pub(crate) struct EvtWriter {
	path: PathBuf,
	form: ContainerForm,
	impedances: Vec<Impedance>,
	videos: Vec<Video>,
	markers: Vec<EpochMarker>,
	closed: bool,
}

impl EvtWriter {
	/// # New (Unopened Until Close).
	pub(crate) fn new(path: PathBuf, form: ContainerForm) -> Self {
		Self { path, form, impedances: Vec::new(), videos: Vec::new(), markers: Vec::new(), closed: false }
	}

	/// # Append Impedance.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] if called after [`Self::close`].
	pub(crate) fn impedance(&mut self, event: Impedance) -> Result<(), CntError> {
		if self.closed { return Err(CntError::WriterClosed); }
		self.impedances.push(event);
		Ok(())
	}

	/// # Append Video.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] if called after [`Self::close`].
	pub(crate) fn video(&mut self, event: Video) -> Result<(), CntError> {
		if self.closed { return Err(CntError::WriterClosed); }
		self.videos.push(event);
		Ok(())
	}

	/// # Append Epoch Marker.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] if called after [`Self::close`].
	pub(crate) fn marker(&mut self, event: EpochMarker) -> Result<(), CntError> {
		if self.closed { return Err(CntError::WriterClosed); }
		self.markers.push(event);
		Ok(())
	}

	/// # Close.
	///
	/// No-op if already closed. Writes whichever of the three chunks are
	/// non-empty and finalises the sidecar container atomically.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] on any underlying I/O failure.
	pub(crate) fn close(&mut self) -> Result<(), CntError> {
		if self.closed { return Ok(()); }
		self.closed = true;

		let mut w = ChunkWriter::create(&self.path, self.form, FORM_TAG)?;
		if ! self.impedances.is_empty() {
			let mut body = Vec::new();
			write_vec(&self.impedances, &mut body)?;
			w.append_chunk(TAG_IMPEDANCE, &body)?;
		}
		if ! self.videos.is_empty() {
			let mut body = Vec::new();
			write_vec(&self.videos, &mut body)?;
			w.append_chunk(TAG_VIDEO, &body)?;
		}
		if ! self.markers.is_empty() {
			let mut body = Vec::new();
			write_vec(&self.markers, &mut body)?;
			w.append_chunk(TAG_MARKER, &body)?;
		}
		w.finalise(&self.path)
	}
}



/// # EVT Sidecar Reader.
///
/// Loads all three record lists eagerly on open; a missing chunk kind simply
/// yields an empty list.
pub struct EvtReader {
	impedances: Vec<Impedance>,
	videos: Vec<Video>,
	markers: Vec<EpochMarker>,
}

impl EvtReader {
	/// # Open.
	///
	/// ## Errors
	///
	/// Returns [`CntError::NotAContainer`]/[`CntError::Truncated`] on a
	/// malformed file, or [`CntError::CorruptHeader`] if a present chunk
	/// fails to parse.
	pub fn open(path: &Path) -> Result<Self, CntError> {
		let mut r = ChunkReader::open(path, FORM_TAG)?;

		let impedances = match r.read_chunk_opt(TAG_IMPEDANCE)? {
			Some(body) => read_vec(&mut body.as_slice()).ok_or(CntError::CorruptHeader("impedances"))?,
			None => Vec::new(),
		};
		let videos = match r.read_chunk_opt(TAG_VIDEO)? {
			Some(body) => read_vec(&mut body.as_slice()).ok_or(CntError::CorruptHeader("videos"))?,
			None => Vec::new(),
		};
		let markers = match r.read_chunk_opt(TAG_MARKER)? {
			Some(body) => read_vec(&mut body.as_slice()).ok_or(CntError::CorruptHeader("markers"))?,
			None => Vec::new(),
		};

		Ok(Self { impedances, videos, markers })
	}

	#[must_use]
	/// # Impedances.
	pub fn impedances(&self) -> &[Impedance] { &self.impedances }

	#[must_use]
	/// # Videos.
	pub fn videos(&self) -> &[Video] { &self.videos }

	#[must_use]
	/// # Epoch Markers.
	pub fn markers(&self) -> &[EpochMarker] { &self.markers }
}
