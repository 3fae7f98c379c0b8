/*!
# Reflib CNT

Reader/writer for the reflib CNT/EVT EEG recording container family, plus
the sample-block codec used inside it.

This crate covers three tightly coupled subsystems: the [`Codec`] (a bespoke
per-channel integer compression scheme applied to fixed-size epochs of
signed 32-bit samples), the chunked [`chunk`] container the CNT/EVT files are
built from, and the [`CntReader`]/[`CntWriter`] pair that drive random-access
retrieval and authoring on top of it.

Numeric array interop, CLI/logging entry points, and the legacy v4 CNT
format are deliberately out of scope — see the crate's design notes.
*/

#![deny(
	clippy::allow_attributes_without_reason,
	clippy::correctness,
	unreachable_pub,
	unsafe_code,
)]

#![warn(
	clippy::complexity,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::style,

	clippy::allow_attributes,
	clippy::clone_on_ref_ptr,
	clippy::create_dir,
	clippy::filetype_is_file,
	clippy::format_push_string,
	clippy::get_unwrap,
	clippy::missing_assert_message,
	clippy::missing_docs_in_private_items,
	clippy::needless_raw_strings,
	clippy::panic_in_result_fn,
	clippy::pub_without_shorthand,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::semicolon_inside_block,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::todo,
	clippy::undocumented_unsafe_blocks,
	clippy::unneeded_field_pattern,
	clippy::unseparated_literal_suffix,
	clippy::unwrap_in_result,

	missing_copy_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unused_extern_crates,
	unused_import_braces,
)]

#![expect(clippy::module_name_repetitions, reason = "Reads better this way for this crate's public types.")]

mod chunk;
mod cnt;
mod codec;
mod electrode;
mod error;
mod event;
mod quant;
mod timestamp;
mod wire;

pub use chunk::ContainerForm;
pub use cnt::{
	CntReader,
	CntWriter,
	EpochIndexEntry,
	FileVersion,
	Handedness,
	Information,
	Parameters,
	Sex,
	Trigger,
	CURRENT_VERSION,
	INFO_FIELD_MAX_LEN,
	TRIGGER_CODE_MAX_LEN,
};
pub use codec::{
	Codec,
	Orientation,
	RealMatrix,
	SampleMatrix,
};
pub use electrode::{
	Electrode,
	ELECTRODE_FIELD_MAX_LEN,
};
pub use error::CntError;
pub use event::{
	EpochMarker,
	EvtReader,
	Impedance,
	Video,
};
pub(crate) use quant::quantise;
pub use timestamp::Timestamp;
