/*!
# Reflib CNT: Writer
*/

use crate::{
	chunk::{
		ChunkWriter,
		ContainerForm,
	},
	cnt::{
		header::{
			serialize_many,
			serialize_one,
			Information,
			Parameters,
			TAG_ELECTRODES,
			TAG_EPOCH,
			TAG_EPOCH_INDEX,
			TAG_INFORMATION,
			TAG_PARAMETERS,
			TAG_TRIGGERS,
			TAG_VERSION,
		},
		sidecar_path,
		EpochIndexEntry,
		Trigger,
		CURRENT_VERSION,
	},
	codec::{
		Codec,
		Orientation,
		RealMatrix,
		SampleMatrix,
	},
	event::{
		EpochMarker,
		EvtWriter,
		Impedance,
		Video,
	},
	quant::quantise,
	CntError,
};
use std::path::{
	Path,
	PathBuf,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Writer State.
enum State {
	/// # Accepting `param`/`info` mutation; no samples appended yet.
	Configuring,
	/// # `param` is frozen; samples/events may still be appended.
	Recording,
	/// # `close` has run; further appends fail.
	Finalised,
}

/// # CNT Writer.
///
/// Accumulates samples and events for a new recording and finalises the
/// container atomically on [`Self::close`].
pub struct CntWriter {
	path: PathBuf,
	evt_path: PathBuf,
	form: ContainerForm,
	chunk: Option<ChunkWriter>,
	parameters: Parameters,
	information: Information,
	state: State,
	pending: Vec<i32>,
	pending_samples: usize,
	epoch_index: Vec<EpochIndexEntry>,
	triggers: Vec<Trigger>,
	codec: Codec,
	evt: Option<EvtWriter>,
}

impl CntWriter {
	/// # Create.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] if the target's temp file cannot be created.
	pub fn create(path: &Path, form: ContainerForm) -> Result<Self, CntError> {
		let chunk = ChunkWriter::create(path, form, b"CNT ")?;
		Ok(Self {
			path: path.to_owned(),
			evt_path: sidecar_path(path),
			form,
			chunk: Some(chunk),
			parameters: Parameters::new(),
			information: Information::new(),
			state: State::Configuring,
			pending: Vec::new(),
			pending_samples: 0,
			epoch_index: Vec::new(),
			triggers: Vec::new(),
			codec: Codec::new(),
			evt: None,
		})
	}

	/// # Parameters (Mutable).
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterLocked`] once the first sample has been
	/// appended.
	pub fn parameters_mut(&mut self) -> Result<&mut Parameters, CntError> {
		if ! matches!(self.state, State::Configuring) { return Err(CntError::WriterLocked); }
		Ok(&mut self.parameters)
	}

	#[must_use]
	/// # Parameters.
	pub const fn parameters(&self) -> &Parameters { &self.parameters }

	/// # Information (Mutable).
	///
	/// Stays mutable through `Recording`; only `close` freezes it.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] after [`Self::close`].
	pub fn information_mut(&mut self) -> Result<&mut Information, CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }
		Ok(&mut self.information)
	}

	#[must_use]
	/// # Information.
	pub const fn information(&self) -> &Information { &self.information }

	/// # Append Column-Major Samples.
	///
	/// ## Errors
	///
	/// Returns [`CntError::ShapeMismatch`] if `matrix`'s channel count
	/// doesn't match the configured electrode count, or
	/// [`CntError::WriterClosed`] after [`Self::close`].
	pub fn append_column_major(&mut self, matrix: &RealMatrix) -> Result<(), CntError> { self.append(matrix) }

	/// # Append Row-Major Samples.
	///
	/// ## Errors
	///
	/// Same as [`Self::append_column_major`].
	pub fn append_row_major(&mut self, matrix: &RealMatrix) -> Result<(), CntError> { self.append(matrix) }

	fn append(&mut self, matrix: &RealMatrix) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }

		let channels = self.parameters.electrodes().len();
		if matrix.channels() != channels {
			return Err(CntError::ShapeMismatch { expected: channels, actual: matrix.channels() });
		}

		if matches!(self.state, State::Configuring) {
			self.codec.set_sensors(channels);
			self.state = State::Recording;
		}

		let canonical = matrix.to_orientation(Orientation::ColumnMajor);
		let scales: Vec<(f64, f64)> =
			self.parameters.electrodes().iter().map(|e| (e.iscale(), e.rscale())).collect();

		for s in 0..canonical.samples() {
			for (ch, &(iscale, rscale)) in scales.iter().enumerate() {
				self.pending.push(quantise(canonical.get(s, ch), iscale, rscale));
			}
		}
		self.pending_samples += canonical.samples();

		self.flush_full_epochs()
	}

	/// # Flush Every Full Epoch Currently Buffered.
	fn flush_full_epochs(&mut self) -> Result<(), CntError> {
		let epoch_length = self.parameters.epoch_length() as usize;
		let channels = self.parameters.electrodes().len();

		while self.pending_samples >= epoch_length {
			let body: Vec<i32> = self.pending.drain(0..epoch_length * channels).collect();
			self.pending_samples -= epoch_length;
			self.flush_epoch(body, epoch_length)?;
		}
		Ok(())
	}

	/// # Compress and Append One Epoch.
	fn flush_epoch(&mut self, data: Vec<i32>, samples: usize) -> Result<(), CntError> {
		let channels = self.parameters.electrodes().len();
		let matrix = SampleMatrix::from_column_major(channels, samples, data);
		let compressed = self.codec.compress(&matrix)?;

		let chunk = self.chunk.as_mut().ok_or_else(|| CntError::Io("writer is closed".to_owned()))?;
		let offset = chunk.append_chunk(TAG_EPOCH, &compressed)?;
		self.epoch_index.push(EpochIndexEntry::new(offset, compressed.len() as u64));
		Ok(())
	}

	/// # Append One Trigger.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidTrigger`] if `code` is longer than eight
	/// bytes, or [`CntError::WriterClosed`] after [`Self::close`].
	pub fn append_trigger(&mut self, sample: u64, code: &str) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }
		self.triggers.push(Trigger::new(sample, code)?);
		Ok(())
	}

	/// # Append Several Triggers.
	///
	/// ## Errors
	///
	/// Same as [`Self::append_trigger`]; stops at the first failure (earlier
	/// triggers in `items` are still recorded).
	pub fn append_triggers(&mut self, items: &[(u64, &str)]) -> Result<(), CntError> {
		for &(sample, code) in items { self.append_trigger(sample, code)?; }
		Ok(())
	}

	/// # Append an Impedance Event.
	///
	/// Creates the EVT sidecar lazily on first use.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] after [`Self::close`].
	pub fn impedance(&mut self, event: Impedance) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }
		self.evt_writer().impedance(event)
	}

	/// # Append a Video Event.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] after [`Self::close`].
	pub fn video(&mut self, event: Video) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }
		self.evt_writer().video(event)
	}

	/// # Append an Epoch Marker Event.
	///
	/// ## Errors
	///
	/// Returns [`CntError::WriterClosed`] after [`Self::close`].
	pub fn marker(&mut self, event: EpochMarker) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Err(CntError::WriterClosed); }
		self.evt_writer().marker(event)
	}

	fn evt_writer(&mut self) -> &mut EvtWriter {
		self.evt.get_or_insert_with(|| EvtWriter::new(self.evt_path.clone(), self.form))
	}

	/// # Close.
	///
	/// Flushes any residual partial epoch, writes the header chunks,
	/// finalises the container (and the EVT sidecar, if one was opened).
	/// Idempotent: a second call is a no-op.
	///
	/// ## Errors
	///
	/// Returns [`CntError::Io`] on any underlying I/O failure. On error, the
	/// container's temp file is removed automatically; no partial file is
	/// left at `path`.
	pub fn close(&mut self) -> Result<(), CntError> {
		if matches!(self.state, State::Finalised) { return Ok(()); }

		if self.pending_samples > 0 {
			let data = std::mem::take(&mut self.pending);
			let samples = self.pending_samples;
			self.pending_samples = 0;
			self.flush_epoch(data, samples)?;
		}

		// A blanket `.sort()` would order same-sample triggers by `code`
		// too, breaking append order for duplicates; keying on `sample`
		// alone keeps `sort_by_key`'s stability doing the right thing.
		let mut triggers = self.triggers.clone();
		triggers.sort_by_key(Trigger::sample);

		{
			let chunk = self.chunk.as_mut().ok_or_else(|| CntError::Io("writer is closed".to_owned()))?;
			chunk.append_chunk(TAG_VERSION, &serialize_one(&CURRENT_VERSION))?;
			chunk.append_chunk(TAG_PARAMETERS, &serialize_one(&self.parameters))?;
			chunk.append_chunk(TAG_ELECTRODES, &serialize_many(self.parameters.electrodes()))?;
			chunk.append_chunk(TAG_INFORMATION, &serialize_one(&self.information))?;
			chunk.append_chunk(TAG_TRIGGERS, &serialize_many(&triggers))?;
			chunk.append_chunk(TAG_EPOCH_INDEX, &serialize_many(&self.epoch_index))?;
		}

		let chunk = self.chunk.take().ok_or_else(|| CntError::Io("writer is closed".to_owned()))?;
		chunk.finalise(&self.path)?;

		if let Some(mut evt) = self.evt.take() { evt.close()?; }

		self.state = State::Finalised;
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		cnt::reader::CntReader,
		electrode::Electrode,
		timestamp::Timestamp,
	};

	fn writer_with_electrodes(dir: &Path, labels: &[&str]) -> CntWriter {
		let path = dir.join("test.cnt");
		let mut w = CntWriter::create(&path, ContainerForm::Riff).unwrap();
		let electrodes = labels.iter().map(|l| Electrode::new(l, "ref").unwrap()).collect();
		let p = w.parameters_mut().unwrap();
		p.set_sampling_frequency(1024.0).unwrap();
		p.set_epoch_length(2048).unwrap();
		p.set_electrodes(electrodes).unwrap();
		w
	}

	#[test]
	fn t_scenario_1_shape_mismatch_on_append() {
		let dir = tempfile::tempdir().unwrap();
		let mut w = writer_with_electrodes(dir.path(), &["1", "2"]);
		// 2 samples x 4 channels, but only 2 electrodes configured.
		let data = vec![11.0, 21.0, 31.0, 41.0, 12.0, 22.0, 32.0, 42.0];
		let matrix = RealMatrix::new(data, 4, Orientation::ColumnMajor).unwrap();
		assert!(matches!(
			w.append_column_major(&matrix),
			Err(CntError::ShapeMismatch { expected: 2, actual: 4 }),
		));
	}

	#[test]
	fn t_scenario_2_roundtrip_mixed_orientations() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = writer_with_electrodes(dir.path(), &["1", "2", "3", "4"]);

		w.append_column_major(&RealMatrix::new(
			vec![11.0, 21.0, 31.0, 41.0, 12.0, 22.0, 32.0, 42.0], 4, Orientation::ColumnMajor,
		).unwrap()).unwrap();

		// Param is now locked.
		assert!(matches!(w.parameters_mut(), Err(CntError::WriterLocked)));

		w.append_row_major(&RealMatrix::new(
			vec![13.0, 14.0, 23.0, 24.0, 33.0, 34.0, 43.0, 44.0], 4, Orientation::RowMajor,
		).unwrap()).unwrap();
		w.append_row_major(&RealMatrix::new(
			vec![15.0, 16.0, 25.0, 26.0, 35.0, 36.0, 45.0, 46.0], 4, Orientation::RowMajor,
		).unwrap()).unwrap();

		w.close().unwrap();

		let mut r = CntReader::open(&path).unwrap();
		assert_eq!(r.sample_count(), 6);

		let col = r.range(0, 6, Orientation::ColumnMajor).unwrap();
		let expected_col = [
			11.0, 21.0, 31.0, 41.0,
			12.0, 22.0, 32.0, 42.0,
			13.0, 23.0, 33.0, 43.0,
			14.0, 24.0, 34.0, 44.0,
			15.0, 25.0, 35.0, 45.0,
			16.0, 26.0, 36.0, 46.0,
		];
		for (a, b) in col.data().iter().zip(expected_col.iter()) {
			assert!((a - b).abs() < 1e-9, "{a} != {b}");
		}

		let row = r.range(0, 6, Orientation::RowMajor).unwrap();
		let expected_row = [
			11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
			21.0, 22.0, 23.0, 24.0, 25.0, 26.0,
			31.0, 32.0, 33.0, 34.0, 35.0, 36.0,
			41.0, 42.0, 43.0, 44.0, 45.0, 46.0,
		];
		for (a, b) in row.data().iter().zip(expected_row.iter()) {
			assert!((a - b).abs() < 1e-9, "{a} != {b}");
		}

		assert_eq!(r.epoch_count(), 1);
	}

	#[test]
	fn t_scenario_3_trigger_ordering() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = writer_with_electrodes(dir.path(), &["1"]);
		w.append_column_major(&RealMatrix::new(vec![1.0], 1, Orientation::ColumnMajor).unwrap()).unwrap();
		w.append_triggers(&[(0, "Rare"), (3, "Frequent")]).unwrap();
		w.append_trigger(5, "End").unwrap();
		w.close().unwrap();

		let r = CntReader::open(&path).unwrap();
		let triggers = r.triggers();
		assert_eq!(triggers.len(), 3);
		assert_eq!(triggers[0].code(), "Rare");
		assert_eq!(triggers[1].code(), "Frequent");
		assert_eq!(triggers[2].code(), "End");
	}

	#[test]
	fn t_scenario_4_impedance_ohms_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = writer_with_electrodes(dir.path(), &["1"]);
		w.append_column_major(&RealMatrix::new(vec![1.0], 1, Orientation::ColumnMajor).unwrap()).unwrap();
		w.impedance(Impedance::new(
			Timestamp::from_micros(0),
			vec![128_000.0, 41_000.0, 73_000.0, 99_000.0],
		)).unwrap();
		w.close().unwrap();

		let r = CntReader::open(&path).unwrap();
		assert_eq!(r.impedances().len(), 1);
		assert_eq!(r.impedances()[0].values_ohms(), &[128_000.0, 41_000.0, 73_000.0, 99_000.0]);
	}

	#[test]
	fn t_writer_closed_after_close() {
		let dir = tempfile::tempdir().unwrap();
		let mut w = writer_with_electrodes(dir.path(), &["1"]);
		w.append_column_major(&RealMatrix::new(vec![1.0], 1, Orientation::ColumnMajor).unwrap()).unwrap();
		w.close().unwrap();
		assert!(matches!(
			w.append_column_major(&RealMatrix::new(vec![1.0], 1, Orientation::ColumnMajor).unwrap()),
			Err(CntError::WriterClosed),
		));
		// Idempotent.
		w.close().unwrap();
	}

	#[test]
	fn t_epoch_length_boundaries() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.cnt");
		let mut w = writer_with_electrodes(dir.path(), &["1"]);
		w.parameters_mut().unwrap().set_epoch_length(4).unwrap();

		let data: Vec<f64> = (0..4).map(f64::from).collect();
		w.append_column_major(&RealMatrix::new(data, 1, Orientation::ColumnMajor).unwrap()).unwrap();
		assert_eq!(w.epoch_index.len(), 1);
		assert_eq!(w.pending_samples, 0);

		let extra = RealMatrix::new(vec![9.0], 1, Orientation::ColumnMajor).unwrap();
		w.append_column_major(&extra).unwrap();
		assert_eq!(w.pending_samples, 1);

		w.close().unwrap();
		let r = CntReader::open(&path).unwrap();
		assert_eq!(r.sample_count(), 5);
		assert_eq!(r.epoch_count(), 2);
	}
}
