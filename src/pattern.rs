use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    encoder::{colortype, TiffEncoder},
};

#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    #[error("failed to open {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        source: tiff::TiffError,
    },
    #[error("failed to encode {path}")]
    Encode {
        path: PathBuf,
        source: tiff::TiffError,
    },
    #[error("unsupported sample format in {path}")]
    Unsupported { path: PathBuf },
}

/// A single decoded diffraction pattern image
///
/// Pixels are held as `i32` whatever the sample format on disk, the
/// integer convention all summed outputs are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    width: u32,
    height: u32,
    data: Vec<i32>,
}
impl Pattern {
    pub fn new(width: u32, height: u32, data: Vec<i32>) -> Self {
        assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }
    pub fn constant(width: u32, height: u32, value: i32) -> Self {
        Self::new(width, height, vec![value; (width * height) as usize])
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    pub fn data(&self) -> &[i32] {
        &self.data
    }
    pub fn max(&self) -> i32 {
        self.data.iter().copied().max().unwrap_or(0)
    }
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0f64;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Reads a grayscale TIFF, converting the samples to `i32`
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PatternError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let decode_err = |source| PatternError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(decode_err)?
            .with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions().map_err(decode_err)?;
        let data = match decoder.read_image().map_err(decode_err)? {
            DecodingResult::U8(buf) => buf.into_iter().map(|v| v as i32).collect(),
            DecodingResult::I8(buf) => buf.into_iter().map(|v| v as i32).collect(),
            DecodingResult::U16(buf) => buf.into_iter().map(|v| v as i32).collect(),
            DecodingResult::I16(buf) => buf.into_iter().map(|v| v as i32).collect(),
            // detector counts are 32 bit at most, wrap like numpy int32
            DecodingResult::U32(buf) => buf.into_iter().map(|v| v as i32).collect(),
            DecodingResult::I32(buf) => buf,
            _ => {
                return Err(PatternError::Unsupported {
                    path: path.to_path_buf(),
                })
            }
        };
        Ok(Self::new(width, height, data))
    }

    /// Writes the pattern as a signed 32 bit grayscale TIFF
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), PatternError> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|source| PatternError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let encode_err = |source| PatternError::Encode {
            path: path.to_path_buf(),
            source,
        };
        let mut encoder = TiffEncoder::new(&mut file).map_err(encode_err)?;
        encoder
            .write_image::<colortype::GrayI32>(self.width, self.height, &self.data)
            .map_err(encode_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_tiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00001.tiff");
        let pattern = Pattern::new(3, 2, vec![0, 1, -2, 30_000, -40_000, i32::MAX]);
        pattern.write(&path).unwrap();
        assert_eq!(Pattern::read(&path).unwrap(), pattern);
    }

    #[test]
    fn stats_on_constant_pattern() {
        let pattern = Pattern::constant(4, 4, 7);
        assert_eq!(pattern.max(), 7);
        assert_eq!(pattern.mean(), 7f64);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Pattern::read("no_such_00001.tiff").unwrap_err();
        assert!(matches!(err, PatternError::Io { .. }));
    }
}
