//! Fixed-width little-endian tuple codec behind the relation wire format.
//!
//! Only trivially copyable shapes are encodable: integer primitives and
//! tuples of them up to arity four. Every value occupies exactly
//! [`ENCODED_LEN`](Storable::ENCODED_LEN) bytes, so a serialised relation
//! is a header plus a dense array.

/// A value with a fixed-width little-endian byte encoding.
pub trait Storable: Sized {
    /// Exact encoded width in bytes.
    const ENCODED_LEN: usize;

    /// Append exactly [`Self::ENCODED_LEN`] bytes to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Decode from a buffer of at least [`Self::ENCODED_LEN`] bytes.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! storable_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Storable for $ty {
                const ENCODED_LEN: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::ENCODED_LEN]);
                    Self::from_le_bytes(buf)
                }
            }
        )*
    };
}

storable_int!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! storable_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Storable),+> Storable for ($($name,)+) {
            const ENCODED_LEN: usize = 0 $(+ $name::ENCODED_LEN)+;

            fn encode(&self, out: &mut Vec<u8>) {
                $(self.$idx.encode(out);)+
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut offset = 0;
                ($(
                    {
                        let value = $name::decode(&bytes[offset..]);
                        offset += $name::ENCODED_LEN;
                        let _ = offset;
                        value
                    },
                )+)
            }
        }
    };
}

storable_tuple!(A: 0);
storable_tuple!(A: 0, B: 1);
storable_tuple!(A: 0, B: 1, C: 2);
storable_tuple!(A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Storable + PartialEq + std::fmt::Debug>(value: T) {
        let mut out = Vec::new();
        value.encode(&mut out);
        assert_eq!(out.len(), T::ENCODED_LEN);
        assert_eq!(T::decode(&out), value);
    }

    #[test]
    fn primitives_round_trip() {
        round_trip(0xAB_u8);
        round_trip(0xDEAD_u16);
        round_trip(0xDEADBEEF_u32);
        round_trip(u64::MAX);
        round_trip(-7_i32);
        round_trip(i64::MIN);
    }

    #[test]
    fn tuples_round_trip() {
        round_trip((1_u32, 2_u32));
        round_trip((1_u8, -2_i16, 3_u32));
        round_trip((1_u64, 2_u64, 3_u64, 4_u64));
    }

    #[test]
    fn encoding_is_little_endian_and_packed() {
        let mut out = Vec::new();
        (0x0102_u16, 0x03040506_u32).encode(&mut out);
        assert_eq!(out, vec![0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
    }
}
