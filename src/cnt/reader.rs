/*!
# Reflib CNT: Reader
*/

use crate::{
	chunk::ChunkReader,
	cnt::{
		header::{
			parse_many,
			parse_one,
			Information,
			Parameters,
			TAG_ELECTRODES,
			TAG_EPOCH_INDEX,
			TAG_INFORMATION,
			TAG_PARAMETERS,
			TAG_TRIGGERS,
			TAG_VERSION,
		},
		sidecar_path,
		EpochIndexEntry,
		FileVersion,
		Trigger,
	},
	codec::{
		Codec,
		Orientation,
		RealMatrix,
		SampleMatrix,
	},
	event::{
		EpochMarker,
		EvtReader,
		Impedance,
		Video,
	},
	quant::dequantise,
	CntError,
};
use std::path::Path;



/// # CNT Reader.
///
/// Opens a reflib CNT container, loading every non-sample chunk eagerly, and
/// serves random-access sample/epoch queries against the compressed epoch
/// payloads, decompressing each epoch at most once courtesy of a
/// single-entry most-recently-used cache.
pub struct CntReader {
	chunk: Option<ChunkReader>,
	file_version: FileVersion,
	parameters: Parameters,
	information: Information,
	triggers: Vec<Trigger>,
	epoch_index: Vec<EpochIndexEntry>,
	sample_count: u64,
	codec: Codec,
	cache: Option<(usize, SampleMatrix)>,
	evt: Option<EvtReader>,
}

impl CntReader {
	/// # Open.
	///
	/// Loads the version, parameters, electrode table, information, trigger,
	/// and epoch index chunks; does not decompress any epoch. If a sidecar
	/// `.evt` file exists alongside `path`, it is opened too.
	///
	/// ## Errors
	///
	/// Returns [`CntError::NotAContainer`]/[`CntError::Truncated`] on a
	/// malformed file, or [`CntError::CorruptHeader`] if a mandatory chunk is
	/// missing or fails validation.
	pub fn open(path: &Path) -> Result<Self, CntError> {
		let mut chunk = ChunkReader::open(path, b"CNT ")?;

		let file_version: FileVersion = parse_one(&chunk.read_chunk(TAG_VERSION, "version")?, "version")?;

		let mut parameters: Parameters =
			parse_one(&chunk.read_chunk(TAG_PARAMETERS, "parameters")?, "parameters")?;
		let electrodes = parse_many(&chunk.read_chunk(TAG_ELECTRODES, "electrodes")?, "electrodes")?;
		parameters.set_electrodes(electrodes).map_err(|_| CntError::CorruptHeader("electrodes"))?;

		let information: Information =
			parse_one(&chunk.read_chunk(TAG_INFORMATION, "information")?, "information")?;

		let triggers = match chunk.read_chunk_opt(TAG_TRIGGERS)? {
			Some(body) => parse_many(&body, "triggers")?,
			None => Vec::new(),
		};

		let epoch_index = match chunk.read_chunk_opt(TAG_EPOCH_INDEX)? {
			Some(body) => parse_many(&body, "epoch_index")?,
			None => Vec::new(),
		};

		let mut codec = Codec::new();
		codec.set_sensors(parameters.electrodes().len());

		let epoch_length = u64::from(parameters.epoch_length());
		let sample_count = match epoch_index.last() {
			Some(&last) => {
				let full = epoch_length * (epoch_index.len() as u64 - 1);
				let bytes = chunk.read_at(last.file_offset(), last.byte_length())?;
				full + codec.sample_count(&bytes)? as u64
			},
			None => 0,
		};

		let evt_path = sidecar_path(path);
		let evt = if evt_path.is_file() { Some(EvtReader::open(&evt_path)?) } else { None };

		Ok(Self {
			chunk: Some(chunk),
			file_version,
			parameters,
			information,
			triggers,
			epoch_index,
			sample_count,
			codec,
			cache: None,
			evt,
		})
	}

	#[must_use]
	/// # Sample Count.
	///
	/// Total number of samples across all epochs.
	pub const fn sample_count(&self) -> u64 { self.sample_count }

	#[must_use]
	/// # Epoch Count.
	pub fn epoch_count(&self) -> usize { self.epoch_index.len() }

	#[must_use]
	/// # File Version.
	pub const fn file_version(&self) -> FileVersion { self.file_version }

	#[must_use]
	/// # Parameters.
	pub const fn parameters(&self) -> &Parameters { &self.parameters }

	#[must_use]
	/// # Information.
	pub const fn information(&self) -> &Information { &self.information }

	#[must_use]
	/// # Electrodes.
	pub fn electrodes(&self) -> &[crate::electrode::Electrode] { self.parameters.electrodes() }

	#[must_use]
	/// # Triggers.
	pub fn triggers(&self) -> &[Trigger] { &self.triggers }

	#[must_use]
	/// # Impedance Events.
	pub fn impedances(&self) -> &[Impedance] {
		self.evt.as_ref().map_or(&[], EvtReader::impedances)
	}

	#[must_use]
	/// # Video Events.
	pub fn videos(&self) -> &[Video] {
		self.evt.as_ref().map_or(&[], EvtReader::videos)
	}

	#[must_use]
	/// # Epoch Marker Events.
	pub fn markers(&self) -> &[EpochMarker] {
		self.evt.as_ref().map_or(&[], EvtReader::markers)
	}

	/// # Epoch Sample Count.
	///
	/// The number of samples the epoch at index `i` decompresses to: always
	/// `epoch_length`, except possibly the last epoch of the recording.
	fn epoch_sample_count(&self, i: usize) -> u64 {
		let epoch_length = u64::from(self.parameters.epoch_length());
		if i + 1 == self.epoch_index.len() {
			let full = epoch_length * (self.epoch_index.len() as u64 - 1);
			self.sample_count - full
		}
		else { epoch_length }
	}

	/// # Decompressed Epoch (Column-Major, Cached).
	///
	/// ## Errors
	///
	/// Returns [`CntError::OutOfRange`] if `i` is out of bounds, or
	/// [`CntError::CorruptBlock`] if the stored payload fails to decompress.
	fn epoch_cached(&mut self, i: usize) -> Result<&SampleMatrix, CntError> {
		if i >= self.epoch_index.len() {
			return Err(CntError::OutOfRange { first: i as u64, count: 1, total: self.epoch_index.len() as u64 });
		}

		if self.cache.as_ref().map(|(idx, _)| *idx) != Some(i) {
			let samples = self.epoch_sample_count(i) as usize;
			let bytes = self.epoch_compressed(i)?;
			let matrix = self.codec.decompress(&bytes, samples)?;
			self.cache = Some((i, matrix));
		}

		Ok(&self.cache.as_ref().expect("just populated").1)
	}

	/// # Raw Compressed Epoch Bytes.
	///
	/// ## Errors
	///
	/// Returns [`CntError::OutOfRange`] if `i` is out of bounds, or
	/// [`CntError::Io`] if the reader has already been [closed](Self::close).
	pub fn epoch_compressed(&mut self, i: usize) -> Result<Vec<u8>, CntError> {
		let &entry = self.epoch_index.get(i)
			.ok_or(CntError::OutOfRange { first: i as u64, count: 1, total: self.epoch_index.len() as u64 })?;
		let chunk = self.chunk.as_mut()
			.ok_or_else(|| CntError::Io("reader is closed".to_owned()))?;
		chunk.read_at(entry.file_offset(), entry.byte_length())
	}

	/// # Per-Channel (iscale, rscale) Pairs.
	fn scales(&self) -> Vec<(f64, f64)> {
		self.parameters.electrodes().iter().map(|e| (e.iscale(), e.rscale())).collect()
	}

	/// # Epoch `i`, Fully, Dequantised To Real Units.
	///
	/// ## Errors
	///
	/// Returns [`CntError::OutOfRange`] if `i` is out of bounds.
	pub fn epoch(&mut self, i: usize, orientation: Orientation) -> Result<RealMatrix, CntError> {
		let scales = self.scales();
		let channels = scales.len();
		let quantised = self.epoch_cached(i)?;
		let samples = quantised.samples();

		let mut out = vec![0.0_f64; channels * samples];
		for s in 0..samples {
			for ch in 0..channels {
				let (iscale, rscale) = scales[ch];
				out[s * channels + ch] = dequantise(quantised.get(s, ch), iscale, rscale);
			}
		}

		Ok(RealMatrix::from_column_major(channels, samples, out).to_orientation(orientation))
	}

	/// # Range Query.
	///
	/// Returns `count` samples starting at absolute index `first`, in the
	/// requested orientation, dequantised to the real units the writer was
	/// originally given, decompressing each covering epoch at most once.
	///
	/// ## Errors
	///
	/// Returns [`CntError::OutOfRange`] if `first + count` exceeds
	/// [`Self::sample_count`].
	pub fn range(&mut self, first: u64, count: u64, orientation: Orientation) -> Result<RealMatrix, CntError> {
		let total = self.sample_count;
		if first.saturating_add(count) > total {
			return Err(CntError::OutOfRange { first, count, total });
		}

		let scales = self.scales();
		let channels = scales.len();
		let mut out = vec![0.0_f64; channels * count as usize];
		if count == 0 {
			return RealMatrix::new(out, channels.max(1), Orientation::ColumnMajor)
				.map(|m| m.to_orientation(orientation));
		}

		let epoch_length = u64::from(self.parameters.epoch_length());
		let first_epoch = (first / epoch_length) as usize;
		let last_epoch = ((first + count - 1) / epoch_length) as usize;

		let mut out_pos = 0_usize;
		for epoch_i in first_epoch..=last_epoch {
			let epoch_start = epoch_i as u64 * epoch_length;
			let matrix = self.epoch_cached(epoch_i)?;
			let epoch_samples = matrix.samples() as u64;

			let lo = first.max(epoch_start) - epoch_start;
			let hi = (first + count).min(epoch_start + epoch_samples) - epoch_start;

			for s in lo..hi {
				for ch in 0..channels {
					let (iscale, rscale) = scales[ch];
					out[out_pos * channels + ch] = dequantise(matrix.get(s as usize, ch), iscale, rscale);
				}
				out_pos += 1;
			}
		}

		RealMatrix::new(out, channels, Orientation::ColumnMajor)
			.map(|m| m.to_orientation(orientation))
	}

	/// # Close.
	///
	/// Releases the underlying file handle early. A no-op if already closed;
	/// dropping the reader without calling this has the same effect.
	pub fn close(&mut self) { self.chunk = None; self.cache = None; }
}

impl Drop for CntReader {
	fn drop(&mut self) { self.close(); }
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::cnt::writer::CntWriter;
	use crate::chunk::ContainerForm;
	use crate::electrode::Electrode;

	fn two_electrode_writer(dir: &Path) -> CntWriter {
		let path = dir.join("test.cnt");
		let mut w = CntWriter::create(&path, ContainerForm::Riff).unwrap();
		w.parameters_mut().unwrap().set_sampling_frequency(1024.0).unwrap();
		w.parameters_mut().unwrap().set_epoch_length(2048).unwrap();
		w.parameters_mut().unwrap().set_electrodes(vec![
			Electrode::new("1", "ref").unwrap(),
			Electrode::new("2", "ref").unwrap(),
		]).unwrap();
		w
	}

	#[test]
	fn t_range_zero_count_empty() {
		let dir = tempfile::tempdir().unwrap();
		let mut w = two_electrode_writer(dir.path());
		w.append_column_major(&RealMatrix::new(vec![1.0, 2.0], 2, Orientation::ColumnMajor).unwrap()).unwrap();
		let path = dir.path().join("test.cnt");
		w.close().unwrap();

		let mut r = CntReader::open(&path).unwrap();
		let m = r.range(0, 0, Orientation::ColumnMajor).unwrap();
		assert_eq!(m.samples(), 0);
		assert_eq!(m.channels(), 2);
	}

	#[test]
	fn t_out_of_range() {
		let dir = tempfile::tempdir().unwrap();
		let mut w = two_electrode_writer(dir.path());
		w.append_column_major(&RealMatrix::new(vec![1.0, 2.0], 2, Orientation::ColumnMajor).unwrap()).unwrap();
		let path = dir.path().join("test.cnt");
		w.close().unwrap();

		let mut r = CntReader::open(&path).unwrap();
		assert!(matches!(r.range(0, 2, Orientation::ColumnMajor), Err(CntError::OutOfRange { .. })));
	}
}
