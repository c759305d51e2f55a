use std::path::{Path, PathBuf};

use crate::pattern::{Pattern, PatternError};

#[derive(thiserror::Error, Debug)]
pub enum SubtractError {
    #[error("image shape {found:?} does not match reference shape {expected:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Background subtraction against a scaled reference pattern
///
/// Each image of a series is corrected independently:
/// `output = image - multiplier * reference`. There is no accumulation
/// and no shared state beyond the read-only scaled reference, so a
/// failure on one image never touches the outputs of the others.
pub struct Subtraction {
    shape: (u32, u32),
    scaled: Vec<i64>,
}
impl Subtraction {
    pub fn new(reference: &Pattern, multiplier: i32) -> Self {
        Self {
            shape: reference.shape(),
            scaled: reference
                .data()
                .iter()
                .map(|&v| v as i64 * multiplier as i64)
                .collect(),
        }
    }

    /// Subtracts the scaled reference from a single pattern
    pub fn apply(&self, pattern: &Pattern) -> Result<Pattern, SubtractError> {
        if pattern.shape() != self.shape {
            return Err(SubtractError::ShapeMismatch {
                expected: self.shape,
                found: pattern.shape(),
            });
        }
        let data = pattern
            .data()
            .iter()
            .zip(&self.scaled)
            // wrap to i32 like the detector arithmetic, negatives survive
            .map(|(&value, &background)| (value as i64 - background) as i32)
            .collect();
        let (width, height) = self.shape;
        Ok(Pattern::new(width, height, data))
    }

    /// Lazily corrected series, one `(output, source)` pair per image
    ///
    /// Pure function of its inputs: restarting the iterator re-reads
    /// and re-corrects from scratch, it never resumes half-done work.
    pub fn outputs<'a>(
        &'a self,
        paths: &'a [PathBuf],
    ) -> impl Iterator<Item = Result<(Pattern, &'a Path), SubtractError>> + 'a {
        paths.iter().map(move |path| {
            let pattern = Pattern::read(path)?;
            Ok((self.apply(&pattern)?, path.as_path()))
        })
    }
}

/// Output filename for one corrected image:
/// `{experiment}_subtracted_{input_stem}.tif`
pub fn output_path(output_root: &Path, experiment: &str, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_root.join(format!("{experiment}_subtracted_{stem}.tif"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtracts_scaled_reference() {
        let subtraction = Subtraction::new(&Pattern::constant(2, 2, 5), 2);
        let output = subtraction.apply(&Pattern::constant(2, 2, 50)).unwrap();
        assert!(output.data().iter().all(|&v| v == 40));
    }

    #[test]
    fn negative_differences_are_kept() {
        let subtraction = Subtraction::new(&Pattern::constant(1, 1, 100), 1);
        let output = subtraction.apply(&Pattern::constant(1, 1, 30)).unwrap();
        assert_eq!(output.data(), &[-70]);
    }

    #[test]
    fn mismatched_reference_shape_is_rejected() {
        let subtraction = Subtraction::new(&Pattern::constant(2, 2, 5), 1);
        assert!(matches!(
            subtraction.apply(&Pattern::constant(4, 4, 50)),
            Err(SubtractError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn output_paths_carry_experiment_and_stem() {
        let path = output_path(
            Path::new("/out"),
            "103845",
            Path::new("/in/00042.tiff"),
        );
        assert_eq!(path, Path::new("/out/103845_subtracted_00042.tif"));
    }
}
