/// A set of up to 8 small integers packed into a single byte.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Bitset8 {
    pub bits: u8,
}

impl Bitset8 {
    pub const EMPTY: Self = Self { bits: 0 };
    pub const FULL: Self = Self { bits: u8::MAX };

    pub const fn new(bits: u8) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn bit_is_set(&self, index: u8) -> bool {
        debug_assert!(index < 8);
        self.bits & (1 << index) != 0
    }

    #[inline]
    pub fn set_bit(&mut self, index: u8) {
        debug_assert!(index < 8);
        self.bits |= 1 << index;
    }

    #[inline]
    pub fn unset_bit(&mut self, index: u8) {
        debug_assert!(index < 8);
        self.bits &= !(1 << index);
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.bits != 0
    }

    #[inline]
    pub fn none(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn union(self, other: Self) -> Self {
        Self::new(self.bits | other.bits)
    }

    /// Iterates the indices of all set bits in ascending order.
    pub fn iter_set(self) -> impl Iterator<Item = u8> {
        (0..8).filter(move |&i| self.bit_is_set(i))
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_and_unset_bits() {
        let mut set = Bitset8::EMPTY;
        assert!(set.none());

        set.set_bit(2);
        set.set_bit(7);
        assert!(set.any());
        assert!(set.bit_is_set(2));
        assert!(set.bit_is_set(7));
        assert!(!set.bit_is_set(3));
        assert_eq!(set.count(), 2);
        assert_eq!(set.iter_set().collect::<Vec<_>>(), vec![2, 7]);

        set.unset_bit(2);
        assert!(!set.bit_is_set(2));
        assert_eq!(set.count(), 1);
    }
}
