/// Extract bits and bit ranges from an integer.
pub trait Bit: Sized {
    /// Extract a single bit.
    #[must_use]
    fn bit(self, n: usize) -> bool;

    /// Extract a range of bits. Both bounds are inclusive.
    #[must_use]
    fn bit_range(self, ls: usize, ms: usize) -> Self;

    /// Sign-extend from bit `n`, treating bit `n` as the sign bit and
    /// discarding everything above it.
    #[must_use]
    fn sign_extend(self, n: usize) -> Self;
}

pub trait BitSet: Sized {
    #[must_use]
    fn set_bit(self, bit: usize, val: bool) -> Self;

    #[must_use]
    fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self;
}

macro_rules! impl_bit {
    ($t:ident, $signed:ident) => {
        impl Bit for $t {
            fn bit(self, n: usize) -> bool {
                (self >> n) & 1 == 1
            }

            fn bit_range(self, ls: usize, ms: usize) -> Self {
                let mask = ((1 << (ms - ls + 1)) - 1) << ls;
                (self & mask) >> ls
            }

            fn sign_extend(self, n: usize) -> Self {
                let shift = Self::BITS as usize - 1 - n;
                (((self << shift) as $signed) >> shift) as Self
            }
        }

        impl BitSet for $t {
            fn set_bit(self, bit: usize, val: bool) -> Self {
                (self & !(1 << bit)) | ((val as Self) << bit)
            }

            fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self {
                let mask = (1 << (ms - ls + 1)) - 1;
                (self & !(mask << ls)) | ((val & mask) << ls)
            }
        }
    };
}

impl_bit!(u32, i32);
impl_bit!(u16, i16);
impl_bit!(u8, i8);

#[test]
fn test_bit_range() {
    assert_eq!(0xabcd_1234_u32.bit_range(0, 15), 0x1234);
    assert_eq!(0xabcd_1234_u32.bit_range(16, 31), 0xabcd);
    assert_eq!(0b110_u32.bit_range(1, 2), 0b11);
}

#[test]
fn test_set_bit_range() {
    assert_eq!(0_u32.set_bit_range(3, 4, 0b11), 0b11000);
    assert_eq!(0_u32.set_bit_range(0, 10, u32::MAX), 0b111_1111_1111);
    assert_eq!(0xffff_u32.set_bit_range(4, 7, 0), 0xff0f);
}

#[test]
fn test_set_bit() {
    assert_eq!(0_u32.set_bit(2, true), 0b100);
    assert_eq!(0b111_u32.set_bit(2, false), 0b011);
}

#[test]
fn test_sign_extend() {
    // 7-bit field with the sign bit set.
    assert_eq!(0x7f_u32.sign_extend(6), u32::MAX);
    assert_eq!(0x3f_u32.sign_extend(6), 0x3f);
    assert_eq!(0x40_u32.sign_extend(6) as i32, -64);
}
