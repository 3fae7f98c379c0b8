/*!
# Reflib CNT: Electrode
*/

use crate::{
	wire::WireIo,
	CntError,
};
use std::io::{
	Read,
	Write,
};
use trimothy::TrimSliceMatches;



/// # Maximum Length (Bytes) of a Fixed-Width Electrode Field.
///
/// Matches the original implementation's fixed-width record layout: labels,
/// references, units, status, and type are all bounded to ten bytes.
pub const ELECTRODE_FIELD_MAX_LEN: usize = 10;

/// # Default Unit.
const DEFAULT_UNIT: &str = "uV";

/// # Default Integer Scale.
const DEFAULT_ISCALE: f64 = 1.0;

/// # Default Real Scale.
///
/// `1/256`, giving a 3.9 nV LSB / ~16.75 V peak-to-peak range for 32-bit
/// signed samples.
const DEFAULT_RSCALE: f64 = 1.0 / 256.0;



#[derive(Debug, Clone, PartialEq)]
/// # Electrode.
///
/// One signal channel: a label, reference, unit, optional status/type, and
/// the per-channel scale factors used to quantise incoming samples.
///
/// Every setter validates its input and leaves the electrode untouched on
/// failure (strong exception safety) — there is no way to construct or
/// mutate an `Electrode` into an invalid state.
///
/// ```
/// use reflib_cnt::Electrode;
///
/// let a = Electrode::new("1", "ref").unwrap();
/// let mut b = a.clone();
/// assert_eq!(a, b);
///
/// b.set_label("2").unwrap();
/// assert_ne!(a, b);
/// ```
pub struct Electrode {
	label: String,
	reference: String,
	unit: String,
	status: String,
	kind: String,
	iscale: f64,
	rscale: f64,
}

impl Electrode {
	/// # New.
	///
	/// Build an electrode with the default unit (`"uV"`) and scale factors
	/// (`iscale = 1`, `rscale = 1/256`).
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `label` or `reference` fail
	/// validation.
	pub fn new(label: &str, reference: &str) -> Result<Self, CntError> {
		let mut out = Self {
			label: String::new(),
			reference: String::new(),
			unit: DEFAULT_UNIT.to_owned(),
			status: String::new(),
			kind: String::new(),
			iscale: DEFAULT_ISCALE,
			rscale: DEFAULT_RSCALE,
		};
		out.set_label(label)?;
		out.set_reference(reference)?;
		Ok(out)
	}

	/// # With Explicit Unit/Scale.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if any argument fails validation.
	pub fn with_all(
		label: &str,
		reference: &str,
		unit: &str,
		iscale: f64,
		rscale: f64,
	) -> Result<Self, CntError> {
		let mut out = Self::new(label, reference)?;
		out.set_unit(unit)?;
		out.set_iscale(iscale)?;
		out.set_rscale(rscale)?;
		Ok(out)
	}

	/// # Set Label.
	///
	/// Non-empty, at most [`ELECTRODE_FIELD_MAX_LEN`] bytes, no whitespace,
	/// and must not begin with `;` or `[` (both have special meaning in the
	/// original record format).
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] on failure; `self` is unchanged.
	pub fn set_label(&mut self, label: &str) -> Result<(), CntError> {
		if ! field_ok(label, false) || has_forbidden_lead(label) {
			return Err(CntError::InvalidField("label"));
		}
		self.label = label.to_owned();
		Ok(())
	}

	/// # Set Reference.
	///
	/// May be empty; otherwise at most [`ELECTRODE_FIELD_MAX_LEN`] bytes and
	/// whitespace-free.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] on failure; `self` is unchanged.
	pub fn set_reference(&mut self, reference: &str) -> Result<(), CntError> {
		if ! field_ok(reference, true) {
			return Err(CntError::InvalidField("reference"));
		}
		self.reference = reference.to_owned();
		Ok(())
	}

	/// # Set Unit.
	///
	/// Non-empty, bounded, whitespace-free, and never exactly `"V"` (rejected
	/// uniformly for historical compatibility, even though the source
	/// tolerates it in some code paths). `"uV"`/`"nV"` are the recommended
	/// values.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] on failure; `self` is unchanged.
	pub fn set_unit(&mut self, unit: &str) -> Result<(), CntError> {
		if ! field_ok(unit, false) || unit == "V" {
			return Err(CntError::InvalidField("unit"));
		}
		self.unit = unit.to_owned();
		Ok(())
	}

	/// # Set Status.
	///
	/// May be empty; otherwise bounded and whitespace-free.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] on failure; `self` is unchanged.
	pub fn set_status(&mut self, status: &str) -> Result<(), CntError> {
		if ! field_ok(status, true) {
			return Err(CntError::InvalidField("status"));
		}
		self.status = status.to_owned();
		Ok(())
	}

	/// # Set Type.
	///
	/// May be empty; otherwise bounded and whitespace-free. Exposed as
	/// `kind` on the Rust side since `type` is a reserved word.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] on failure; `self` is unchanged.
	pub fn set_kind(&mut self, kind: &str) -> Result<(), CntError> {
		if ! field_ok(kind, true) {
			return Err(CntError::InvalidField("type"));
		}
		self.kind = kind.to_owned();
		Ok(())
	}

	/// # Set Integer Scale.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `iscale` is not finite or is
	/// zero; `self` is unchanged.
	pub fn set_iscale(&mut self, iscale: f64) -> Result<(), CntError> {
		if ! iscale.is_finite() || iscale == 0.0 {
			return Err(CntError::InvalidField("iscale"));
		}
		self.iscale = iscale;
		Ok(())
	}

	/// # Set Real Scale.
	///
	/// ## Errors
	///
	/// Returns [`CntError::InvalidField`] if `rscale` is not finite or is
	/// zero; `self` is unchanged.
	pub fn set_rscale(&mut self, rscale: f64) -> Result<(), CntError> {
		if ! rscale.is_finite() || rscale == 0.0 {
			return Err(CntError::InvalidField("rscale"));
		}
		self.rscale = rscale;
		Ok(())
	}
}

impl Electrode {
	#[must_use]
	/// # Label.
	pub fn label(&self) -> &str { &self.label }

	#[must_use]
	/// # Reference.
	pub fn reference(&self) -> &str { &self.reference }

	#[must_use]
	/// # Unit.
	pub fn unit(&self) -> &str { &self.unit }

	#[must_use]
	/// # Status.
	pub fn status(&self) -> &str { &self.status }

	#[must_use]
	/// # Type.
	pub fn kind(&self) -> &str { &self.kind }

	#[must_use]
	/// # Integer Scale.
	pub const fn iscale(&self) -> f64 { self.iscale }

	#[must_use]
	/// # Real Scale.
	pub const fn rscale(&self) -> f64 { self.rscale }

	#[must_use]
	/// # Quantise a Sample.
	///
	/// `round(x / (iscale * rscale))`, clamped to the signed 32-bit range
	/// and rounded half-to-even (banker's rounding).
	pub fn quantise(&self, x: f64) -> i32 {
		crate::quantise(x, self.iscale, self.rscale)
	}
}

impl WireIo for Electrode {
	/// # Read From Reader.
	///
	/// Every field is re-validated through its setter, so a corrupt or
	/// hand-edited chunk body can never deserialize into an invalid
	/// `Electrode` — it simply fails to parse at all.
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let label = String::read_from(r)?;
		let reference = String::read_from(r)?;
		let unit = String::read_from(r)?;
		let status = String::read_from(r)?;
		let kind = String::read_from(r)?;
		let iscale = f64::read_from(r)?;
		let rscale = f64::read_from(r)?;

		let mut out = Self::new(&label, &reference).ok()?;
		out.set_unit(&unit).ok()?;
		out.set_status(&status).ok()?;
		out.set_kind(&kind).ok()?;
		out.set_iscale(iscale).ok()?;
		out.set_rscale(rscale).ok()?;
		Some(out)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.label.write_to(w)?;
		self.reference.write_to(w)?;
		self.unit.write_to(w)?;
		self.status.write_to(w)?;
		self.kind.write_to(w)?;
		self.iscale.write_to(w)?;
		self.rscale.write_to(w)
	}
}

/// # Has Forbidden Leading Character?
fn has_forbidden_lead(s: &str) -> bool {
	let bytes = s.as_bytes();
	let trimmed = bytes.trim_start_matches(|b: u8| b == b';' || b == b'[');
	trimmed.len() != bytes.len()
}

/// # Field Validity Check.
///
/// Shared bound/whitespace validation for the fixed-width electrode string
/// fields.
fn field_ok(s: &str, allow_empty: bool) -> bool {
	if ! allow_empty && s.is_empty() { return false; }
	if s.len() > ELECTRODE_FIELD_MAX_LEN { return false; }
	if s.bytes().any(|b| b.is_ascii_whitespace()) { return false; }
	true
}
