use crate::hkx::{Endianness, HkxError, LayoutRules, Matrix3, Matrix4, QsTransform, Quaternion, Result, Vector4};

/// Fixed-width scalar readable through [`Cursor::read`].
pub trait Scalar: Sized {
	/// Encoded width in bytes.
	const SIZE: usize;

	/// Decode from exactly `SIZE` bytes.
	fn decode(raw: &[u8], endianness: Endianness) -> Self;
}

macro_rules! impl_scalar {
	($($ty:ty),* $(,)?) => {
		$(
			impl Scalar for $ty {
				const SIZE: usize = std::mem::size_of::<$ty>();

				fn decode(raw: &[u8], endianness: Endianness) -> Self {
					let mut buf = [0_u8; std::mem::size_of::<$ty>()];
					buf.copy_from_slice(raw);
					match endianness {
						Endianness::Little => <$ty>::from_le_bytes(buf),
						Endianness::Big => <$ty>::from_be_bytes(buf),
					}
				}
			}
		)*
	};
}

impl_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f32);

/// Bounded cursor over an immutable byte slice.
///
/// Multi-byte reads honour the layout rules' byte order. A mark records a
/// base position so struct members can be read at `mark + offset`.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
	mark: usize,
	rules: LayoutRules,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8], rules: LayoutRules) -> Self {
		Self { bytes, pos: 0, mark: 0, rules }
	}

	/// Create a cursor positioned (and marked) at `pos`.
	pub fn at(bytes: &'a [u8], pos: usize, rules: LayoutRules) -> Result<Self> {
		if pos > bytes.len() {
			return Err(HkxError::SeekOutOfBounds {
				mark: 0,
				offset: pos,
				len: bytes.len(),
			});
		}
		Ok(Self { bytes, pos, mark: pos, rules })
	}

	/// Return the layout rules this cursor decodes with.
	pub fn rules(&self) -> LayoutRules {
		self.rules
	}

	/// Return the full underlying buffer.
	pub fn bytes(&self) -> &'a [u8] {
		self.bytes
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Return whether every byte has been consumed.
	pub fn at_end(&self) -> bool {
		self.remaining() == 0
	}

	/// Record the current position as the mark.
	pub fn mark(&mut self) {
		self.mark = self.pos;
	}

	/// Record an explicit position as the mark.
	pub fn mark_at(&mut self, pos: usize) {
		self.mark = pos;
	}

	/// Return the current mark.
	pub fn mark_pos(&self) -> usize {
		self.mark
	}

	/// Move to `mark + offset`.
	pub fn seek_from_mark(&mut self, offset: usize) -> Result<()> {
		let target = self.mark.checked_add(offset).filter(|target| *target <= self.bytes.len());
		let Some(target) = target else {
			return Err(HkxError::SeekOutOfBounds {
				mark: self.mark,
				offset,
				len: self.bytes.len(),
			});
		};
		self.pos = target;
		Ok(())
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(HkxError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read one fixed-width scalar in the cursor's byte order.
	pub fn read<T: Scalar>(&mut self) -> Result<T> {
		let endianness = self.rules.endianness();
		let raw = self.read_exact(T::SIZE)?;
		Ok(T::decode(raw, endianness))
	}

	/// Read a single raw byte.
	pub fn read_byte(&mut self) -> Result<u8> {
		Ok(self.read_exact(1)?[0])
	}

	/// Read a `u16`.
	pub fn read_u16(&mut self) -> Result<u16> {
		self.read()
	}

	/// Read a `u32`.
	pub fn read_u32(&mut self) -> Result<u32> {
		self.read()
	}

	/// Read an `i32`.
	pub fn read_i32(&mut self) -> Result<i32> {
		self.read()
	}

	/// Read an `f32`.
	pub fn read_f32(&mut self) -> Result<f32> {
		self.read()
	}

	/// Read a 32-bit boolean; any nonzero value is `true`.
	pub fn read_bool(&mut self) -> Result<bool> {
		Ok(self.read_u32()? != 0)
	}

	/// Read a pointer-sized unsigned integer and widen to `u64`.
	pub fn read_ptr(&mut self) -> Result<u64> {
		match self.rules.bytes_in_pointer {
			4 => Ok(u64::from(self.read_u32()?)),
			8 => self.read(),
			size => Err(HkxError::UnsupportedPointerSize { size }),
		}
	}

	/// Read a pointer without consuming it.
	pub fn peek_ptr(&mut self) -> Result<u64> {
		let start = self.pos;
		let value = self.read_ptr();
		self.pos = start;
		value
	}

	/// Read a sign-and-continuation variable-length integer.
	///
	/// The first byte carries the sign in bit 0 and six value bits; every
	/// following byte adds seven bits while bit 7 is set.
	pub fn read_var_int(&mut self) -> Result<i64> {
		let at = self.pos;
		let first = self.read_byte()?;
		let negative = first & 1 != 0;
		let mut value = u64::from((first >> 1) & 0x3f);
		let mut more = first & 0x80 != 0;
		let mut shift = 6_u32;

		while more {
			let byte = self.read_byte()?;
			let bits = u64::from(byte & 0x7f);
			if shift >= 64 || (shift > 57 && bits >> (64 - shift) != 0) {
				return Err(HkxError::VarIntOverflow { at });
			}
			value |= bits << shift;
			shift += 7;
			more = byte & 0x80 != 0;
		}

		let value = value as i64;
		Ok(if negative { value.wrapping_neg() } else { value })
	}

	/// Read a zero-terminated byte string without the terminator.
	pub fn read_cstring_bytes(&mut self) -> Result<&'a [u8]> {
		let start = self.pos;
		let rem = &self.bytes[self.pos..];
		let Some(rel_end) = rem.iter().position(|byte| *byte == 0) else {
			return Err(HkxError::UnexpectedEof {
				at: self.pos,
				need: 1,
				rem: self.remaining(),
			});
		};

		let end = start + rel_end;
		self.pos = end + 1;
		Ok(&self.bytes[start..end])
	}

	/// Read four `f32` lanes.
	pub fn read_vector4(&mut self) -> Result<Vector4> {
		Ok(Vector4 {
			x: self.read_f32()?,
			y: self.read_f32()?,
			z: self.read_f32()?,
			w: self.read_f32()?,
		})
	}

	/// Read a quaternion stored as one [`Vector4`].
	pub fn read_quaternion(&mut self) -> Result<Quaternion> {
		Ok(Quaternion(self.read_vector4()?))
	}

	/// Read three [`Vector4`] rows.
	pub fn read_matrix3(&mut self) -> Result<Matrix3> {
		Ok(Matrix3 {
			rows: [self.read_vector4()?, self.read_vector4()?, self.read_vector4()?],
		})
	}

	/// Read a translation, rotation, scale triple.
	pub fn read_qs_transform(&mut self) -> Result<QsTransform> {
		Ok(QsTransform {
			translation: self.read_vector4()?,
			rotation: self.read_quaternion()?,
			scale: self.read_vector4()?,
		})
	}

	/// Read four [`Vector4`] rows.
	pub fn read_matrix4(&mut self) -> Result<Matrix4> {
		Ok(Matrix4 {
			rows: [self.read_vector4()?, self.read_vector4()?, self.read_vector4()?, self.read_vector4()?],
		})
	}
}

/// Read a zero-terminated string at an absolute offset, lossily decoded.
pub(crate) fn cstring_at(bytes: &[u8], offset: u64, rules: LayoutRules) -> Result<String> {
	let pos = usize::try_from(offset).map_err(|_| HkxError::SeekOutOfBounds {
		mark: 0,
		offset: usize::MAX,
		len: bytes.len(),
	})?;
	let mut cursor = Cursor::at(bytes, pos, rules)?;
	let raw = cursor.read_cstring_bytes()?;
	Ok(String::from_utf8_lossy(raw).into_owned())
}
