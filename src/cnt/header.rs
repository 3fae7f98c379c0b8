/*!
# Reflib CNT: Header Codec

Serialises and parses every non-sample chunk in a CNT container: the version,
parameters, electrode table, information, trigger, and epoch-index chunks.
Validation happens at parse time — malformed wire bytes or out-of-bound field
values both surface as [`CntError::CorruptHeader`] naming the offending
chunk, rather than silently producing an invalid in-memory value.
*/

use crate::{
	cnt::{
		EpochIndexEntry,
		FileVersion,
		Handedness,
		Sex,
		Trigger,
	},
	electrode::Electrode,
	wire::{
		read_vec,
		write_vec,
		WireIo,
	},
	CntError,
	Timestamp,
};
use std::io::{
	Read,
	Write,
};



/// # Version Chunk Tag.
pub(crate) const TAG_VERSION: &[u8; 4] = b"VERS";
/// # Parameters Chunk Tag.
pub(crate) const TAG_PARAMETERS: &[u8; 4] = b"PRMS";
/// # Electrode Table Chunk Tag.
pub(crate) const TAG_ELECTRODES: &[u8; 4] = b"ELEC";
/// # Information Chunk Tag.
pub(crate) const TAG_INFORMATION: &[u8; 4] = b"INFO";
/// # Trigger Table Chunk Tag.
pub(crate) const TAG_TRIGGERS: &[u8; 4] = b"TRIG";
/// # Epoch Index Chunk Tag.
pub(crate) const TAG_EPOCH_INDEX: &[u8; 4] = b"EPIX";
/// # Epoch Payload Chunk Tag.
pub(crate) const TAG_EPOCH: &[u8; 4] = b"EPCH";



#[derive(Debug, Clone, PartialEq)]
/// # Time-Series Parameters.
///
/// `start_time`, `sampling_frequency`, `electrodes`, and `epoch_length` —
/// frozen for the life of a recording once the first sample is appended
/// (enforced by [`crate::cnt::CntWriter`], not by this type itself).
pub struct Parameters {
	sampling_frequency: f64,
	epoch_length: u32,
	start_time: Timestamp,
	electrodes: Vec<Electrode>,
}

impl Default for Parameters {
	fn default() -> Self {
		Self {
			sampling_frequency: 1.0,
			epoch_length: 1,
			start_time: Timestamp::now(),
			electrodes: Vec::new(),
		}
	}
}

impl Parameters {
	#[must_use]
	/// # New (Defaults).
	///
	/// `sampling_frequency = 1.0`, `epoch_length = 1`, `start_time = now()`,
	/// and no electrodes. All must typically be overridden before recording.
	pub fn new() -> Self { Self::default() }

	/// # Set Sampling Frequency (Hz).
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `hz` is not finite or not
	/// positive.
	pub fn set_sampling_frequency(&mut self, hz: f64) -> Result<(), CntError> {
		if ! hz.is_finite() || hz <= 0.0 { return Err(CntError::InvalidField("sampling_frequency")); }
		self.sampling_frequency = hz;
		Ok(())
	}

	/// # Set Epoch Length (Samples Per Block).
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `len` is zero.
	pub fn set_epoch_length(&mut self, len: u32) -> Result<(), CntError> {
		if len == 0 { return Err(CntError::InvalidField("epoch_length")); }
		self.epoch_length = len;
		Ok(())
	}

	/// # Set Start Time.
	pub fn set_start_time(&mut self, start_time: Timestamp) { self.start_time = start_time; }

	/// # Set Electrodes.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `electrodes` is empty.
	pub fn set_electrodes(&mut self, electrodes: Vec<Electrode>) -> Result<(), CntError> {
		if electrodes.is_empty() { return Err(CntError::InvalidField("electrodes")); }
		self.electrodes = electrodes;
		Ok(())
	}

	#[must_use]
	/// # Sampling Frequency (Hz).
	pub const fn sampling_frequency(&self) -> f64 { self.sampling_frequency }

	#[must_use]
	/// # Epoch Length (Samples Per Block).
	pub const fn epoch_length(&self) -> u32 { self.epoch_length }

	#[must_use]
	/// # Start Time.
	pub const fn start_time(&self) -> Timestamp { self.start_time }

	#[must_use]
	/// # Electrodes.
	pub fn electrodes(&self) -> &[Electrode] { &self.electrodes }
}

impl WireIo for Parameters {
	/// # Read From Reader.
	///
	/// The electrode table travels as its own chunk on the wire (§4.3), so
	/// this only covers `sampling_frequency`/`epoch_length`/`start_time`; the
	/// caller is responsible for calling [`Self::set_electrodes`] afterwards.
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let sampling_frequency = f64::read_from(r)?;
		let epoch_length = u32::read_from(r)?;
		let start_time = Timestamp::read_from(r)?;

		let mut out = Self::default();
		out.set_sampling_frequency(sampling_frequency).ok()?;
		out.set_epoch_length(epoch_length).ok()?;
		out.set_start_time(start_time);
		Some(out)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.sampling_frequency.write_to(w)?;
		self.epoch_length.write_to(w)?;
		self.start_time.write_to(w)
	}
}



/// # Information Field Setter/Getter Pair.
///
/// Every recording-information string field shares the same validation (a
/// byte-length bound, no whitespace restriction since these are free-form
/// text rather than fixed-width table columns).
macro_rules! info_field {
	($set:ident, $get:ident, $field:ident, $name:literal) => {
		/// # Set Field.
		///
		/// ## Errors
		///
		/// Returns [`CntError::InvalidField`] if the value is longer than
		/// [`crate::cnt::INFO_FIELD_MAX_LEN`] bytes.
		pub fn $set(&mut self, value: &str) -> Result<(), CntError> {
			if value.len() > crate::cnt::INFO_FIELD_MAX_LEN {
				return Err(CntError::InvalidField($name));
			}
			self.$field = value.to_owned();
			Ok(())
		}

		#[must_use]
		/// # Field.
		pub fn $get(&self) -> &str { &self.$field }
	};
}

#[derive(Debug, Clone, Default, PartialEq)]
/// # Recording Information.
///
/// Free-form metadata about the recording and the subject. Every string
/// field is independently bounded and independently settable; there is no
/// cross-field validation.
pub struct Information {
	hospital: String,
	test_name: String,
	test_serial: String,
	physician: String,
	technician: String,
	machine_make: String,
	machine_model: String,
	machine_sn: String,
	subject_name: String,
	subject_id: String,
	subject_address: String,
	subject_phone: String,
	comment: String,
	subject_sex: Sex,
	subject_handedness: Handedness,
	subject_dob: Timestamp,
}

impl Information {
	#[must_use]
	/// # New (All Fields Empty/Unknown).
	pub fn new() -> Self { Self::default() }

	info_field!(set_hospital, hospital, hospital, "hospital");
	info_field!(set_test_name, test_name, test_name, "test_name");
	info_field!(set_test_serial, test_serial, test_serial, "test_serial");
	info_field!(set_physician, physician, physician, "physician");
	info_field!(set_technician, technician, technician, "technician");
	info_field!(set_machine_make, machine_make, machine_make, "machine_make");
	info_field!(set_machine_model, machine_model, machine_model, "machine_model");
	info_field!(set_machine_sn, machine_sn, machine_sn, "machine_sn");
	info_field!(set_subject_name, subject_name, subject_name, "subject_name");
	info_field!(set_subject_id, subject_id, subject_id, "subject_id");
	info_field!(set_subject_address, subject_address, subject_address, "subject_address");
	info_field!(set_subject_phone, subject_phone, subject_phone, "subject_phone");
	info_field!(set_comment, comment, comment, "comment");

	/// # Set Subject Sex.
	pub fn set_subject_sex(&mut self, sex: Sex) { self.subject_sex = sex; }

	#[must_use]
	/// # Subject Sex.
	pub const fn subject_sex(&self) -> Sex { self.subject_sex }

	/// # Set Subject Handedness.
	pub fn set_subject_handedness(&mut self, handedness: Handedness) { self.subject_handedness = handedness; }

	#[must_use]
	/// # Subject Handedness.
	pub const fn subject_handedness(&self) -> Handedness { self.subject_handedness }

	/// # Set Subject Date Of Birth.
	pub fn set_subject_dob(&mut self, dob: Timestamp) { self.subject_dob = dob; }

	#[must_use]
	/// # Subject Date Of Birth.
	pub const fn subject_dob(&self) -> Timestamp { self.subject_dob }
}

impl WireIo for Information {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let mut out = Self::default();
		out.set_hospital(&String::read_from(r)?).ok()?;
		out.set_test_name(&String::read_from(r)?).ok()?;
		out.set_test_serial(&String::read_from(r)?).ok()?;
		out.set_physician(&String::read_from(r)?).ok()?;
		out.set_technician(&String::read_from(r)?).ok()?;
		out.set_machine_make(&String::read_from(r)?).ok()?;
		out.set_machine_model(&String::read_from(r)?).ok()?;
		out.set_machine_sn(&String::read_from(r)?).ok()?;
		out.set_subject_name(&String::read_from(r)?).ok()?;
		out.set_subject_id(&String::read_from(r)?).ok()?;
		out.set_subject_address(&String::read_from(r)?).ok()?;
		out.set_subject_phone(&String::read_from(r)?).ok()?;
		out.set_comment(&String::read_from(r)?).ok()?;
		out.set_subject_sex(Sex::read_from(r)?);
		out.set_subject_handedness(Handedness::read_from(r)?);
		out.set_subject_dob(Timestamp::read_from(r)?);
		Some(out)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.hospital.write_to(w)?;
		self.test_name.write_to(w)?;
		self.test_serial.write_to(w)?;
		self.physician.write_to(w)?;
		self.technician.write_to(w)?;
		self.machine_make.write_to(w)?;
		self.machine_model.write_to(w)?;
		self.machine_sn.write_to(w)?;
		self.subject_name.write_to(w)?;
		self.subject_id.write_to(w)?;
		self.subject_address.write_to(w)?;
		self.subject_phone.write_to(w)?;
		self.comment.write_to(w)?;
		self.subject_sex.write_to(w)?;
		self.subject_handedness.write_to(w)?;
		self.subject_dob.write_to(w)
	}
}



/// # Serialize a Single Record.
pub(crate) fn serialize_one<T: WireIo>(value: &T) -> Vec<u8> {
	let mut buf = Vec::new();
	// Writing to a `Vec<u8>` never fails.
	value.write_to(&mut buf).expect("writing to a Vec<u8> cannot fail");
	buf
}

/// # Parse a Single Record, Naming the Chunk on Failure.
///
/// ## Errors
///
/// Returns [`CntError::CorruptHeader`] naming `chunk_name` if `bytes` fails
/// to parse as a `T`.
pub(crate) fn parse_one<T: WireIo>(bytes: &[u8], chunk_name: &'static str) -> Result<T, CntError> {
	T::read_from(&mut { bytes }).ok_or(CntError::CorruptHeader(chunk_name))
}

/// # Serialize a Count-Prefixed List.
pub(crate) fn serialize_many<T: WireIo>(values: &[T]) -> Vec<u8> {
	let mut buf = Vec::new();
	write_vec(values, &mut buf).expect("writing to a Vec<u8> cannot fail");
	buf
}

/// # Parse a Count-Prefixed List, Naming the Chunk on Failure.
///
/// ## Errors
///
/// Returns [`CntError::CorruptHeader`] naming `chunk_name` if `bytes` fails
/// to parse as a `Vec<T>`.
pub(crate) fn parse_many<T: WireIo>(bytes: &[u8], chunk_name: &'static str) -> Result<Vec<T>, CntError> {
	read_vec(&mut { bytes }).ok_or(CntError::CorruptHeader(chunk_name))
}

pub(crate) type VersionChunk = FileVersion;
pub(crate) type ElectrodesChunk = Electrode;
pub(crate) type TriggersChunk = Trigger;
pub(crate) type EpochIndexChunk = EpochIndexEntry;



#[cfg(test)]
mod test {
	use super::*;
	use crate::electrode::Electrode;

	#[test]
	fn t_parameters_roundtrip() {
		// The electrode table travels as its own chunk, not as part of the
		// parameters chunk, so it is excluded here and tested separately.
		let mut p = Parameters::new();
		p.set_sampling_frequency(1024.0).unwrap();
		p.set_epoch_length(2048).unwrap();
		p.set_start_time(Timestamp::from_micros(42));

		let bytes = serialize_one(&p);
		let de: Parameters = parse_one(&bytes, "parameters").unwrap();
		assert_eq!(p, de);
	}

	#[test]
	fn t_electrode_table_chunk_roundtrip() {
		let electrodes = vec![
			Electrode::new("1", "ref").unwrap(),
			Electrode::new("2", "ref").unwrap(),
		];
		let bytes = serialize_many(&electrodes);
		let de: Vec<ElectrodesChunk> = parse_many(&bytes, "electrodes").unwrap();
		assert_eq!(electrodes, de);
	}

	#[test]
	fn t_parameters_rejects_bad_frequency() {
		assert!(matches!(
			Parameters::new().set_sampling_frequency(f64::INFINITY),
			Err(CntError::InvalidField("sampling_frequency")),
		));
		assert!(matches!(
			Parameters::new().set_sampling_frequency(0.0),
			Err(CntError::InvalidField("sampling_frequency")),
		));
	}

	#[test]
	fn t_parameters_rejects_empty_electrodes() {
		assert!(matches!(
			Parameters::new().set_electrodes(Vec::new()),
			Err(CntError::InvalidField("electrodes")),
		));
	}

	#[test]
	fn t_information_roundtrip() {
		let mut info = Information::new();
		info.set_hospital("General").unwrap();
		info.set_subject_name("Doe, Jane").unwrap();
		info.set_subject_sex(Sex::Female);
		info.set_subject_handedness(Handedness::Right);
		info.set_subject_dob(Timestamp::from_micros(-12345));

		let bytes = serialize_one(&info);
		let de: Information = parse_one(&bytes, "information").unwrap();
		assert_eq!(info, de);
	}

	#[test]
	fn t_information_field_too_long() {
		let long = "x".repeat(crate::cnt::INFO_FIELD_MAX_LEN + 1);
		assert!(matches!(
			Information::new().set_hospital(&long),
			Err(CntError::InvalidField("hospital")),
		));
	}

	#[test]
	fn t_parse_corrupt_header_names_chunk() {
		let bad = vec![1, 2, 3];
		let err = parse_one::<Parameters>(&bad, "parameters").unwrap_err();
		assert!(matches!(err, CntError::CorruptHeader("parameters")));
	}

	#[test]
	fn t_triggers_and_epoch_index_roundtrip() {
		let triggers = vec![
			Trigger::new(0, "Rare").unwrap(),
			Trigger::new(3, "Frequent").unwrap(),
			Trigger::new(5, "End").unwrap(),
		];
		let bytes = serialize_many(&triggers);
		let de: Vec<TriggersChunk> = parse_many(&bytes, "triggers").unwrap();
		assert_eq!(triggers, de);

		let index = vec![EpochIndexEntry::new(64, 32), EpochIndexEntry::new(96, 16)];
		let bytes = serialize_many(&index);
		let de: Vec<EpochIndexChunk> = parse_many(&bytes, "epoch_index").unwrap();
		assert_eq!(index, de);
	}
}
