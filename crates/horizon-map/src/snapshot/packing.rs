use super::DecodeError;

/// How fixed-width indices are laid out in an array of 64-bit words.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Packing {
    /// Values are packed back to back and may straddle two words.
    Spanning,
    /// Each word holds `64 / bits` whole values; the leftover high bits are padding.
    Aligned,
}

impl Packing {
    pub fn words_needed(self, count: usize, bits: u32) -> usize {
        if bits == 0 {
            return 0;
        }
        let bits = bits as usize;
        match self {
            Packing::Spanning => (count * bits + 63) / 64,
            Packing::Aligned => {
                let per_word = 64 / bits;
                (count + per_word - 1) / per_word
            }
        }
    }

    /// Unpacks `count` values of `bits` width. Zero bits means every value is zero.
    pub fn unpack(self, words: &[i64], bits: u32, count: usize) -> Result<Vec<u16>, DecodeError> {
        if bits == 0 {
            return Ok(vec![0; count]);
        }
        if bits > 16 {
            return Err(DecodeError::Malformed(format!("{} bits per packed value", bits)));
        }
        let needed = self.words_needed(count, bits);
        if words.len() < needed {
            return Err(DecodeError::Malformed(format!(
                "packed array has {} words, expected {} for {} values of {} bits",
                words.len(),
                needed,
                count,
                bits
            )));
        }

        let mask = (1u64 << bits) - 1;
        let mut values = Vec::with_capacity(count);
        match self {
            Packing::Spanning => {
                for i in 0..count {
                    let bit = i * bits as usize;
                    let word = bit / 64;
                    let offset = (bit % 64) as u32;
                    let mut v = (words[word] as u64) >> offset;
                    if offset + bits > 64 {
                        v |= (words[word + 1] as u64) << (64 - offset);
                    }
                    values.push((v & mask) as u16);
                }
            }
            Packing::Aligned => {
                let per_word = (64 / bits) as usize;
                for i in 0..count {
                    let offset = (i % per_word) as u32 * bits;
                    let v = (words[i / per_word] as u64) >> offset;
                    values.push((v & mask) as u16);
                }
            }
        }
        Ok(values)
    }

    pub fn pack(self, values: &[u16], bits: u32) -> Vec<i64> {
        let mut words = vec![0u64; self.words_needed(values.len(), bits)];
        if bits == 0 {
            return Vec::new();
        }
        let mask = (1u64 << bits) - 1;
        match self {
            Packing::Spanning => {
                for (i, &v) in values.iter().enumerate() {
                    let v = v as u64 & mask;
                    let bit = i * bits as usize;
                    let word = bit / 64;
                    let offset = (bit % 64) as u32;
                    words[word] |= v << offset;
                    if offset + bits > 64 {
                        words[word + 1] |= v >> (64 - offset);
                    }
                }
            }
            Packing::Aligned => {
                let per_word = (64 / bits) as usize;
                for (i, &v) in values.iter().enumerate() {
                    let offset = (i % per_word) as u32 * bits;
                    words[i / per_word] |= (v as u64 & mask) << offset;
                }
            }
        }
        words.into_iter().map(|w| w as i64).collect()
    }
}

/// Bits needed to index a palette of `len` entries.
pub fn bits_for_palette(len: usize) -> u32 {
    if len <= 1 {
        0
    } else {
        usize::BITS - (len - 1).leading_zeros()
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
    fn word_counts() {
        assert_eq!(Packing::Spanning.words_needed(4096, 5), 320);
        assert_eq!(Packing::Aligned.words_needed(4096, 5), 342);
        assert_eq!(Packing::Aligned.words_needed(256, 9), 37);
        assert_eq!(Packing::Spanning.words_needed(256, 9), 36);
    }

    #[test]
    fn spanning_values_straddle_words() {
        // Value 1 occupies bits 60..65, crossing into the second word.
        let values = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0b11011, 1];
        let words = Packing::Spanning.pack(&values, 5);
        assert_eq!(words[0] as u64 >> 60, 0b1011);
        assert_eq!(words[1] & 1, 1);
        assert_eq!(Packing::Spanning.unpack(&words, 5, values.len()).unwrap(), values);
    }

    #[test]
    fn aligned_values_leave_padding() {
        let values: Vec<u16> = (0..26).map(|i| i % 32).collect();
        let words = Packing::Aligned.pack(&values, 5);
        assert_eq!(words.len(), 3);
        // 12 values per word, the top 4 bits are unused.
        assert_eq!(words[0] as u64 >> 60, 0);
        assert_eq!(Packing::Aligned.unpack(&words, 5, values.len()).unwrap(), values);
    }

    #[test]
    fn short_arrays_are_malformed() {
        assert!(Packing::Aligned.unpack(&[0; 10], 4, 4096).is_err());
        assert_eq!(Packing::Aligned.unpack(&[], 0, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn palette_bits() {
        assert_eq!(bits_for_palette(1), 0);
        assert_eq!(bits_for_palette(2), 1);
        assert_eq!(bits_for_palette(16), 4);
        assert_eq!(bits_for_palette(17), 5);
        assert_eq!(bits_for_palette(385), 9);
    }
}
