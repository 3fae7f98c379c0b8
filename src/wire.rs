/*!
# Reflib CNT: Wire (De)Serialization

All chunk bodies in this crate's CNT/EVT containers are hand-serialized
rather than handed to `serde`/`bincode`. Every wire format detail — exact
byte widths, string length caps, enum byte encodings — is part of this
crate's contract, so it is spelled out here instead of left to a derive
macro's defaults.

All integers are little-endian; strings are length-prefixed UTF-8 with a
16-bit byte length (ample for the bounded metadata fields in §3 of the
specification this crate implements).
*/

use crate::Timestamp;
use std::io::{
	Read,
	Write,
};



/// # Maximum encodable string length (bytes).
///
/// The length prefix is a `u16`, so this is its natural ceiling; individual
/// fields additionally enforce their own (smaller) bounds on `set`.
pub(crate) const MAX_STRING_LEN: usize = u16::MAX as usize;



/// # Read/Write Binary Serialization.
///
/// This trait is used for the primitive and composite binary de/serialization
/// needed by the CNT/EVT header codec. It exists instead of `serde`/`bincode`
/// for the same quality-control reason this crate hand-rolls its error type:
/// the wire format is a contract, and every byte of it should be visible in
/// one place.
///
/// Deserialization returns `None` on any malformed or truncated input; callers
/// upgrade that into a named [`CntError`](crate::CntError) with field context.
pub(crate) trait WireIo: Sized {
	/// # Read From Reader.
	fn read_from<R: Read>(r: &mut R) -> Option<Self>;

	/// # Write Into Writer.
	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()>;
}



/// # De/Serialize Primitive Integer Types.
macro_rules! int {
	($ty:ty) => (
		impl WireIo for $ty {
			fn read_from<R: Read>(r: &mut R) -> Option<Self> {
				let mut buf = [0_u8; std::mem::size_of::<Self>()];
				r.read_exact(&mut buf).ok()?;
				Some(Self::from_le_bytes(buf))
			}

			fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
				w.write_all(&self.to_le_bytes())
			}
		}
	);
}

int!(u8);
int!(u16);
int!(u32);
int!(u64);
int!(i32);
int!(i64);
int!(f64);

impl WireIo for bool {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		u8::read_from(r).map(|v| v != 0)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		u8::from(*self).write_to(w)
	}
}

impl WireIo for Timestamp {
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		i64::read_from(r).map(Self::from_micros)
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		self.as_micros().write_to(w)
	}
}

impl WireIo for String {
	/// # Read From Reader.
	///
	/// A `u16` byte length followed by that many UTF-8 bytes. Invalid UTF-8
	/// is treated as malformed input (`None`), same as a truncated read.
	fn read_from<R: Read>(r: &mut R) -> Option<Self> {
		let len = u16::read_from(r)? as usize;
		let mut buf = vec![0_u8; len];
		r.read_exact(&mut buf).ok()?;
		Self::from_utf8(buf).ok()
	}

	fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
		debug_assert!(self.len() <= MAX_STRING_LEN, "string too long for wire encoding");
		(self.len() as u16).write_to(w)?;
		w.write_all(self.as_bytes())
	}
}

/// # Read a Count-Prefixed Vector.
///
/// A `u32` element count followed by that many `T`s, each read via
/// [`WireIo::read_from`]. Returns `None` as soon as any element fails.
pub(crate) fn read_vec<R: Read, T: WireIo>(r: &mut R) -> Option<Vec<T>> {
	let len = u32::read_from(r)? as usize;
	let mut out = Vec::new();
	out.try_reserve_exact(len).ok()?;
	for _ in 0..len {
		out.push(T::read_from(r)?);
	}
	Some(out)
}

/// # Write a Count-Prefixed Vector.
pub(crate) fn write_vec<W: Write, T: WireIo>(items: &[T], w: &mut W) -> std::io::Result<()> {
	(items.len() as u32).write_to(w)?;
	for item in items { item.write_to(w)?; }
	Ok(())
}



#[cfg(test)]
mod test {
	use super::*;
	use std::io::Cursor;

	fn roundtrip<T: WireIo + PartialEq + std::fmt::Debug>(v: T) {
		let mut buf = Vec::new();
		v.write_to(&mut buf).expect("write failed");
		let mut r = Cursor::new(buf.as_slice());
		let de = T::read_from(&mut r).expect("read failed");
		assert_eq!(v, de);
	}

	#[test]
	fn t_roundtrip_ints() {
		roundtrip(0_u8);
		roundtrip(255_u8);
		roundtrip(12345_u32);
		roundtrip(u64::MAX);
		roundtrip(-42_i32);
		roundtrip(-1_i64);
		roundtrip(3.5_f64);
		roundtrip(true);
		roundtrip(false);
	}

	#[test]
	fn t_roundtrip_timestamp() {
		roundtrip(Timestamp::from_micros(-123));
		roundtrip(Timestamp::from_micros(987_654_321));
	}

	#[test]
	fn t_roundtrip_string() {
		roundtrip(String::new());
		roundtrip(String::from("uV"));
		roundtrip(String::from("a longer metadata string, still valid UTF-8 \u{1F600}"));
	}

	#[test]
	fn t_string_truncated() {
		let mut buf = Vec::new();
		10_u16.write_to(&mut buf).unwrap();
		buf.extend_from_slice(b"abc"); // shorter than declared
		let mut r = Cursor::new(buf.as_slice());
		assert!(String::read_from(&mut r).is_none());
	}

	#[test]
	fn t_roundtrip_vec() {
		let v = vec![1_u32, 2, 3, 4];
		let mut buf = Vec::new();
		write_vec(&v, &mut buf).unwrap();
		let mut r = Cursor::new(buf.as_slice());
		let de: Vec<u32> = read_vec(&mut r).unwrap();
		assert_eq!(v, de);
	}
}
