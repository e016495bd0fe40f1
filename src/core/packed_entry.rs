use std::cmp::Ordering;

/// A nearest-neighbor record: best correlation found so far and the index
/// of the neighbor that produced it.
///
/// Serializes to a single 64-bit word with the correlation's IEEE-754 bits
/// in the high half and the index's two's-complement bits in the low half.
/// Ordering compares correlations only; the index never breaks ties.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct PackedEntry {
    pub corr: f32,
    pub index: i32,
}

impl PackedEntry {
    /// "No match yet": the most negative finite `f32` and index -1.
    pub const SENTINEL: Self = Self {
        corr: f32::MIN,
        index: -1,
    };

    #[inline]
    pub const fn new(corr: f32, index: i32) -> Self {
        Self { corr, index }
    }

    #[inline]
    pub const fn sentinel() -> Self {
        Self::SENTINEL
    }

    /// Pack into a 64-bit word.
    #[inline]
    pub fn to_bits(self) -> u64 {
        ((self.corr.to_bits() as u64) << 32) | (self.index as u32 as u64)
    }

    /// Unpack from a 64-bit word.
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self {
            corr: f32::from_bits((bits >> 32) as u32),
            index: bits as u32 as i32,
        }
    }

    /// True when this entry still holds no usable match.
    #[inline]
    pub fn is_unmatched(&self) -> bool {
        self.corr.is_nan() || self.corr < -1.0
    }

    /// Keep the better of `self` and `other`. Returns true if `self` changed.
    #[inline(always)]
    pub fn merge(&mut self, other: PackedEntry) -> bool {
        if other.corr > self.corr {
            *self = other;
            true
        } else {
            false
        }
    }

    /// Offer a candidate match.
    #[inline(always)]
    pub fn offer(&mut self, corr: f32, index: i32) {
        if corr > self.corr {
            self.corr = corr;
            self.index = index;
        }
    }
}

impl Default for PackedEntry {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl PartialEq for PackedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.corr == other.corr
    }
}

impl PartialOrd for PackedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.corr.partial_cmp(&other.corr)
    }
}

/// Pack a correlation and neighbor index into one word.
#[inline]
pub fn pack(corr: f32, index: i32) -> u64 {
    PackedEntry::new(corr, index).to_bits()
}

/// Inverse of [`pack`].
#[inline]
pub fn unpack(bits: u64) -> (f32, i32) {
    let e = PackedEntry::from_bits(bits);
    (e.corr, e.index)
}

/// The packed "no match yet" word.
#[inline]
pub fn sentinel() -> u64 {
    PackedEntry::SENTINEL.to_bits()
}

/// Convert a Pearson correlation to z-normalized Euclidean distance.
///
/// Correlations below -1 (unmatched or numerically invalid entries) have no
/// distance and yield NaN.
#[inline]
pub fn to_distance(corr: f64, window: usize) -> f64 {
    if corr.is_nan() || corr < -1.0 {
        return f64::NAN;
    }
    (2.0 * window as f64 * (1.0 - corr)).max(0.0).sqrt()
}
