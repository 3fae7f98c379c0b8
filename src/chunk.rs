/*!
# Reflib CNT: Chunked Container

A thin RIFF/RIFF64 layer: a 4-byte outer tag, an outer length (`u32` for
RIFF, `u64` for RIFF64) patched on finalisation, a 4-byte form tag, and then
a flat sequence of `(tag, length, body)` chunks. This is shared framing for
both the CNT container and its EVT sidecar.
*/

use crate::CntError;
use std::{
	fs::File,
	io::{
		BufWriter,
		Read,
		Seek,
		SeekFrom,
		Write,
	},
	path::Path,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Container Form.
///
/// Selects between 32-bit (`RIFF`) and 64-bit (`RF64`) chunk lengths. Chosen
/// at writer construction and recorded in the outer tag so a reader can tell
/// which it's dealing with without guessing.
pub enum ContainerForm {
	/// # Classic RIFF, 32-bit chunk lengths.
	Riff,
	/// # RIFF64, 64-bit chunk lengths.
	Riff64,
}

impl ContainerForm {
	/// # Outer Tag.
	const fn outer_tag(self) -> &'static [u8; 4] {
		match self {
			Self::Riff => b"RIFF",
			Self::Riff64 => b"RF64",
		}
	}

	/// # Size (Bytes) of a Chunk Length Field.
	const fn length_width(self) -> u64 {
		match self { Self::Riff => 4, Self::Riff64 => 8 }
	}
}



/// # Chunk Index Entry.
type IndexEntry = (u64, u64);



/// # Chunk Reader.
///
/// Opens a RIFF/RIFF64 file, verifies its form tag, and builds a tag →
/// `(body offset, body length)` table covering the *first* occurrence of
/// each tag. Repeated tags (the per-epoch payload chunks) are intentionally
/// not indexed individually — the epoch index chunk records their exact
/// offsets so callers can seek straight to them.
pub(crate) struct ChunkReader {
	file: File,
	index: ahash::AHashMap<[u8; 4], IndexEntry>,
}

impl ChunkReader {
	/// # Open For Read.
	///
	/// ## Errors
	///
	/// Returns [`CntError::NotAContainer`] if the outer/form tags don't
	/// match, [`CntError::Truncated`] if the file ends before its declared
	/// length, or [`CntError::Io`] on any underlying I/O failure.
	pub(crate) fn open(path: &Path, form_tag: &[u8; 4]) -> Result<Self, CntError> {
		let mut file = File::open(path)?;
		let file_len = file.metadata()?.len();

		let mut outer_tag = [0_u8; 4];
		file.read_exact(&mut outer_tag).map_err(|_| CntError::NotAContainer)?;
		let form = match &outer_tag {
			b"RIFF" => ContainerForm::Riff,
			b"RF64" => ContainerForm::Riff64,
			_ => return Err(CntError::NotAContainer),
		};

		let _outer_len = read_len(&mut file, form).map_err(|_| CntError::Truncated)?;

		let mut tag = [0_u8; 4];
		file.read_exact(&mut tag).map_err(|_| CntError::Truncated)?;
		if &tag != form_tag { return Err(CntError::NotAContainer); }

		let mut index = ahash::AHashMap::default();
		loop {
			let pos = file.stream_position()?;
			if pos >= file_len { break; }

			let mut tag = [0_u8; 4];
			if file.read_exact(&mut tag).is_err() { return Err(CntError::Truncated); }

			let len = read_len(&mut file, form).map_err(|_| CntError::Truncated)?;
			let body_offset = file.stream_position()?;
			match body_offset.checked_add(len) {
				Some(end) if end <= file_len => {},
				_ => return Err(CntError::Truncated),
			}

			index.entry(tag).or_insert((body_offset, len));
			file.seek(SeekFrom::Start(body_offset + len))?;
		}

		Ok(Self { file, index })
	}

	/// # Read Chunk.
	///
	/// ## Errors
	///
	/// Returns [`CntError::CorruptHeader`] naming `tag_name` if the tag was
	/// not present, or [`CntError::Io`] on a read failure.
	pub(crate) fn read_chunk(&mut self, tag: &[u8; 4], tag_name: &'static str) -> Result<Vec<u8>, CntError> {
		let &(offset, len) = self.index.get(tag).ok_or(CntError::CorruptHeader(tag_name))?;
		self.read_at(offset, len)
	}

	/// # Read Chunk (Optional).
	///
	/// Like [`Self::read_chunk`], but returns `Ok(None)` instead of an error
	/// when the tag is absent (used for chunks forward-compatibility allows
	/// omitting, like the EVT sidecar kinds).
	pub(crate) fn read_chunk_opt(&mut self, tag: &[u8; 4]) -> Result<Option<Vec<u8>>, CntError> {
		match self.index.get(tag).copied() {
			Some((offset, len)) => self.read_at(offset, len).map(Some),
			None => Ok(None),
		}
	}

	/// # Read At.
	///
	/// Read `len` bytes starting at absolute file offset `offset`, e.g. to
	/// fetch a single compressed epoch payload by its recorded index entry.
	pub(crate) fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>, CntError> {
		self.file.seek(SeekFrom::Start(offset))?;
		let mut buf = vec![0_u8; len as usize];
		self.file.read_exact(&mut buf)?;
		Ok(buf)
	}
}

/// # Read a Length Field.
fn read_len(file: &mut File, form: ContainerForm) -> std::io::Result<u64> {
	match form {
		ContainerForm::Riff => {
			let mut buf = [0_u8; 4];
			file.read_exact(&mut buf)?;
			Ok(u64::from(u32::from_le_bytes(buf)))
		}
		ContainerForm::Riff64 => {
			let mut buf = [0_u8; 8];
			file.read_exact(&mut buf)?;
			Ok(u64::from_le_bytes(buf))
		}
	}
}



/// # Chunk Writer.
///
/// Writes to a `tempfile::NamedTempFile` sitting alongside the target path,
/// through a 16 KiB `BufWriter`, and only renames it into place on
/// [`Self::finalise`]. Any earlier error drops the temp file with it,
/// leaving no partial output visible at the target path.
pub(crate) struct ChunkWriter {
	tmp: tempfile::NamedTempFile,
	writer: BufWriter<File>,
	position: u64,
	form: ContainerForm,
}

/// # BufWriter Capacity.
const WRITER_CAPACITY: usize = 16 * 1024;

impl ChunkWriter {
	/// # Create For Write.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] if the temp file cannot be created or
	/// written to.
	pub(crate) fn create(path: &Path, form: ContainerForm, form_tag: &[u8; 4]) -> Result<Self, CntError> {
		let dir = path.parent().filter(|p| ! p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
		let tmp = tempfile::NamedTempFile::new_in(dir)?;
		let file = tmp.as_file().try_clone()?;
		let mut writer = BufWriter::with_capacity(WRITER_CAPACITY, file);

		writer.write_all(form.outer_tag())?;
		match form {
			ContainerForm::Riff => writer.write_all(&0_u32.to_le_bytes())?,
			ContainerForm::Riff64 => writer.write_all(&0_u64.to_le_bytes())?,
		}
		writer.write_all(form_tag)?;

		let position = 4 + form.length_width() + 4;
		Ok(Self { tmp, writer, position, form })
	}

	/// # Append Chunk.
	///
	/// Returns the body's absolute file offset, so callers (the epoch
	/// flusher, in particular) can record it without a redundant seek.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] on write failure, or if `body` is too large
	/// to address under [`ContainerForm::Riff`].
	pub(crate) fn append_chunk(&mut self, tag: &[u8; 4], body: &[u8]) -> Result<u64, CntError> {
		self.writer.write_all(tag)?;
		match self.form {
			ContainerForm::Riff => {
				let len = u32::try_from(body.len())
					.map_err(|_| CntError::Io("chunk too large for a 32-bit RIFF container".to_owned()))?;
				self.writer.write_all(&len.to_le_bytes())?;
				self.position += 4 + 4;
			}
			ContainerForm::Riff64 => {
				self.writer.write_all(&(body.len() as u64).to_le_bytes())?;
				self.position += 4 + 8;
			}
		}

		let offset = self.position;
		self.writer.write_all(body)?;
		self.position += body.len() as u64;
		Ok(offset)
	}

	/// # Finalise.
	///
	/// Patches the outer length, flushes, fsyncs, and atomically renames the
	/// temp file into `path`.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] on any failure; the temp file is removed
	/// automatically (by `tempfile`'s `Drop`) in that case.
	pub(crate) fn finalise(mut self, path: &Path) -> Result<(), CntError> {
		self.writer.flush()?;
		let mut file = self.writer.into_inner().map_err(|e| CntError::Io(e.to_string()))?;

		let header_len = 4 + self.form.length_width();
		let content_len = self.position - header_len;
		file.seek(SeekFrom::Start(4))?;
		match self.form {
			ContainerForm::Riff => {
				let len = u32::try_from(content_len)
					.map_err(|_| CntError::Io("final container too large for 32-bit RIFF".to_owned()))?;
				file.write_all(&len.to_le_bytes())?;
			}
			ContainerForm::Riff64 => file.write_all(&content_len.to_le_bytes())?,
		}
		file.sync_all()?;
		drop(file);

		self.tmp.persist(path).map_err(|e| CntError::Io(e.to_string()))?;
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_roundtrip_riff() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");

		let mut w = ChunkWriter::create(&path, ContainerForm::Riff, b"CNT ").unwrap();
		let off_a = w.append_chunk(b"aaaa", b"hello").unwrap();
		let off_b = w.append_chunk(b"bbbb", b"world!!").unwrap();
		assert!(off_b > off_a);
		w.finalise(&path).unwrap();

		let mut r = ChunkReader::open(&path, b"CNT ").unwrap();
		assert_eq!(r.read_chunk(b"aaaa", "aaaa").unwrap(), b"hello");
		assert_eq!(r.read_chunk(b"bbbb", "bbbb").unwrap(), b"world!!");
		assert!(r.read_chunk(b"cccc", "cccc").is_err());
		assert_eq!(r.read_chunk_opt(b"cccc").unwrap(), None);
	}

	#[test]
	fn t_roundtrip_riff64() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.evt");

		let mut w = ChunkWriter::create(&path, ContainerForm::Riff64, b"EVT ").unwrap();
		w.append_chunk(b"imp ", &[1, 2, 3, 4]).unwrap();
		w.finalise(&path).unwrap();

		let mut r = ChunkReader::open(&path, b"EVT ").unwrap();
		assert_eq!(r.read_chunk(b"imp ", "imp ").unwrap(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn t_not_a_container() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bogus.cnt");
		std::fs::write(&path, b"not a riff file at all").unwrap();
		assert!(matches!(ChunkReader::open(&path, b"CNT "), Err(CntError::NotAContainer)));
	}

	#[test]
	fn t_wrong_form_tag() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = ChunkWriter::create(&path, ContainerForm::Riff, b"CNT ").unwrap();
		w.append_chunk(b"aaaa", b"x").unwrap();
		w.finalise(&path).unwrap();

		assert!(matches!(ChunkReader::open(&path, b"EVT "), Err(CntError::NotAContainer)));
	}

	#[test]
	fn t_truncated() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = ChunkWriter::create(&path, ContainerForm::Riff, b"CNT ").unwrap();
		w.append_chunk(b"aaaa", b"hello world").unwrap();
		w.finalise(&path).unwrap();

		// Chop off the last few bytes to simulate a truncated tail.
		let data = std::fs::read(&path).unwrap();
		std::fs::write(&path, &data[..data.len() - 4]).unwrap();

		assert!(matches!(ChunkReader::open(&path, b"CNT "), Err(CntError::Truncated)));
	}

	#[test]
	fn t_no_partial_file_on_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("never.cnt");
		let w = ChunkWriter::create(&path, ContainerForm::Riff, b"CNT ").unwrap();
		drop(w); // Simulates an error path: finalise never called.
		assert!(! path.exists());
	}
}
