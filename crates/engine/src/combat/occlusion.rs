/// Union of closed slope intervals hidden behind tiles already marched past.
///
/// Kept sorted and non-overlapping so lookups are a binary search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlopeRanges {
    ranges: Vec<(f32, f32)>,
}

impl SlopeRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, low: f32, high: f32) {
        if low.is_nan() || high.is_nan() {
            return;
        }
        let (mut low, mut high) = if low <= high { (low, high) } else { (high, low) };

        let start = self.ranges.partition_point(|&(_, end)| end < low);
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].0 <= high {
            low = low.min(self.ranges[end].0);
            high = high.max(self.ranges[end].1);
            end += 1;
        }
        self.ranges.splice(start..end, [(low, high)]);
    }

    pub fn contains(&self, slope: f32) -> bool {
        let index = self.ranges.partition_point(|&(_, end)| end < slope);
        self.ranges
            .get(index)
            .is_some_and(|&(start, _)| start <= slope)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_inserts_merge() {
        let mut ranges = SlopeRanges::new();
        ranges.insert(0.5, 1.0);
        ranges.insert(-1.0, -0.5);
        ranges.insert(0.8, 1.2);
        assert_eq!(ranges.len(), 2);
        ranges.insert(-0.5, 0.5);
        assert_eq!(ranges.len(), 1);
        assert!(ranges.contains(0.0));
        assert!(ranges.contains(1.2));
        assert!(!ranges.contains(1.21));
    }

    #[test]
    fn reversed_bounds_are_normalised() {
        let mut ranges = SlopeRanges::new();
        ranges.insert(2.0, 1.0);
        assert!(ranges.contains(1.5));
        assert!(!ranges.contains(0.5));
    }

    #[test]
    fn infinite_bounds_cover_steep_slopes() {
        let mut ranges = SlopeRanges::new();
        ranges.insert(f32::NEG_INFINITY, -3.0);
        assert!(ranges.contains(-1.0e9));
        assert!(!ranges.contains(-2.0));
        ranges.insert(f32::NAN, 1.0);
        assert_eq!(ranges.len(), 1);
    }
}
