/// Vertical pixel ranges of one screen column that are already painted.
///
/// Ranges are half-open `[start, end)`, sorted, and never touch each other;
/// adjacent ranges are merged on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    height: i32,
    ranges: Vec<(i32, i32)>,
}

impl Limits {
    pub fn new(height: i32) -> Self {
        Self {
            height: height.max(0),
            ranges: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.height == 0 || self.ranges.first() == Some(&(0, self.height))
    }

    pub fn painted(&self) -> &[(i32, i32)] {
        &self.ranges
    }

    /// Sub-ranges of `[start, end)` inside the column that are not yet painted.
    pub fn gaps(&self, start: i32, end: i32) -> Vec<(i32, i32)> {
        let (start, end) = (start.max(0), end.min(self.height));
        let mut gaps = Vec::new();
        if start >= end {
            return gaps;
        }
        let mut cursor = start;
        for &(covered_start, covered_end) in &self.ranges {
            if covered_end <= cursor {
                continue;
            }
            if covered_start >= end {
                break;
            }
            if covered_start > cursor {
                gaps.push((cursor, covered_start));
            }
            cursor = cursor.max(covered_end);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            gaps.push((cursor, end));
        }
        gaps
    }

    pub fn add(&mut self, start: i32, end: i32) {
        let (mut start, mut end) = (start.max(0), end.min(self.height));
        if start >= end {
            return;
        }
        let first = self.ranges.partition_point(|&(_, covered_end)| covered_end < start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].0 <= end {
            start = start.min(self.ranges[last].0);
            end = end.max(self.ranges[last].1);
            last += 1;
        }
        self.ranges.splice(first..last, [(start, end)]);
    }
}
