use std::path::PathBuf;

use crate::pattern::Pattern;

#[derive(thiserror::Error, Debug)]
pub enum AccumulateError {
    #[error("image shape {found:?} does not match accumulator shape {expected:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("no images were accumulated")]
    Empty,
}

/// Running pixel-wise sum over a bounded set of same-shape patterns
///
/// Sums are carried in `i64` so a full scan row of saturated 32 bit
/// detector counts cannot overflow before finalize.
#[derive(Debug)]
pub struct Accumulator {
    width: u32,
    height: u32,
    sum: Vec<i64>,
    sources: Vec<PathBuf>,
}

/// Finalized average with the provenance of its contributors
#[derive(Debug)]
pub struct Averaged {
    pub pattern: Pattern,
    pub sources: Vec<PathBuf>,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sum: vec![0i64; (width * height) as usize],
            sources: Vec::new(),
        }
    }
    /// An accumulator shaped after its first contributor
    pub fn like(pattern: &Pattern) -> Self {
        Self::new(pattern.width(), pattern.height())
    }
    pub fn count(&self) -> usize {
        self.sources.len()
    }
    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Adds a pattern element-wise and records where it came from
    pub fn add<P: Into<PathBuf>>(
        &mut self,
        pattern: &Pattern,
        source: P,
    ) -> Result<(), AccumulateError> {
        if pattern.shape() != self.shape() {
            return Err(AccumulateError::ShapeMismatch {
                expected: self.shape(),
                found: pattern.shape(),
            });
        }
        for (acc, &value) in self.sum.iter_mut().zip(pattern.data()) {
            *acc += value as i64;
        }
        self.sources.push(source.into());
        Ok(())
    }

    /// Folds another accumulator into this one
    ///
    /// Partial sums compose: addition commutes and truncation only
    /// happens once, at finalize. Lets disjoint index ranges be summed
    /// on separate workers and combined afterwards.
    pub fn merge(&mut self, other: Accumulator) -> Result<(), AccumulateError> {
        if other.shape() != self.shape() {
            return Err(AccumulateError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        for (acc, value) in self.sum.iter_mut().zip(other.sum) {
            *acc += value;
        }
        self.sources.extend(other.sources);
        Ok(())
    }

    /// Divides by the contributor count and truncates toward zero
    ///
    /// Real division first, then the fractional part is discarded, the
    /// way the acquisition pipeline has always written its averages:
    /// a true mean of 2.9 finalizes to 2, not 3.
    pub fn finalize(self) -> Result<Averaged, AccumulateError> {
        if self.sources.is_empty() {
            return Err(AccumulateError::Empty);
        }
        let count = self.sources.len() as f64;
        let data: Vec<i32> = self.sum.iter().map(|&s| (s as f64 / count) as i32).collect();
        Ok(Averaged {
            pattern: Pattern::new(self.width, self.height, data),
            sources: self.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_images_average_without_drift() {
        let mut acc = Accumulator::new(2, 2);
        for k in 0..5 {
            acc.add(&Pattern::constant(2, 2, 17), format!("{:05}.tiff", k + 1))
                .unwrap();
        }
        let averaged = acc.finalize().unwrap();
        assert!(averaged.pattern.data().iter().all(|&v| v == 17));
        assert_eq!(averaged.sources.len(), 5);
    }

    #[test]
    fn finalize_truncates_toward_zero() {
        let mut acc = Accumulator::new(1, 1);
        // 29 over 10 contributors: true mean 2.9, truncates to 2
        acc.add(&Pattern::constant(1, 1, 20), "00001.tiff").unwrap();
        for k in 0..9 {
            acc.add(&Pattern::constant(1, 1, 1), format!("{:05}.tiff", k + 2))
                .unwrap();
        }
        assert_eq!(acc.finalize().unwrap().pattern.data(), &[2]);

        // negative averages truncate toward zero as well: -2.9 -> -2
        let mut acc = Accumulator::new(1, 1);
        acc.add(&Pattern::constant(1, 1, -20), "00001.tiff").unwrap();
        for k in 0..9 {
            acc.add(&Pattern::constant(1, 1, -1), format!("{:05}.tiff", k + 2))
                .unwrap();
        }
        assert_eq!(acc.finalize().unwrap().pattern.data(), &[-2]);
    }

    #[test]
    fn accumulation_is_commutative() {
        let patterns = [
            Pattern::new(2, 1, vec![10, -3]),
            Pattern::new(2, 1, vec![20, 7]),
            Pattern::new(2, 1, vec![31, 5]),
        ];
        let mut forward = Accumulator::new(2, 1);
        for (k, p) in patterns.iter().enumerate() {
            forward.add(p, format!("{k}")).unwrap();
        }
        let mut backward = Accumulator::new(2, 1);
        for (k, p) in patterns.iter().enumerate().rev() {
            backward.add(p, format!("{k}")).unwrap();
        }
        assert_eq!(
            forward.finalize().unwrap().pattern,
            backward.finalize().unwrap().pattern
        );
    }

    #[test]
    fn partial_sums_merge_like_a_single_pass() {
        let patterns: Vec<Pattern> = (1..=4).map(|v| Pattern::constant(1, 2, v * 10)).collect();
        let mut whole = Accumulator::new(1, 2);
        for (k, p) in patterns.iter().enumerate() {
            whole.add(p, format!("{k}")).unwrap();
        }
        let mut left = Accumulator::new(1, 2);
        let mut right = Accumulator::new(1, 2);
        for (k, p) in patterns.iter().enumerate() {
            if k < 2 {
                left.add(p, format!("{k}")).unwrap();
            } else {
                right.add(p, format!("{k}")).unwrap();
            }
        }
        left.merge(right).unwrap();
        assert_eq!(
            whole.finalize().unwrap().pattern,
            left.finalize().unwrap().pattern
        );
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut acc = Accumulator::new(2, 2);
        acc.add(&Pattern::constant(2, 2, 1), "00001.tiff").unwrap();
        let err = acc.add(&Pattern::constant(3, 2, 1), "00002.tiff").unwrap_err();
        assert!(matches!(err, AccumulateError::ShapeMismatch { .. }));
        // the accumulator is still usable after the rejected add
        assert_eq!(acc.count(), 1);
    }

    #[test]
    fn empty_accumulation_is_an_error() {
        assert!(matches!(
            Accumulator::new(4, 4).finalize(),
            Err(AccumulateError::Empty)
        ));
    }
}
