//! Transparent compression keyed on file extensions.
//!
//! `.gz`, `.bz2` and `.xz` are handled through `flate2`, `bzip2` and `xz2`
//! behind the `gzip`, `bzip2` and `xz` features, all enabled by default. A
//! build without one of them still recognises the suffix and fails with a
//! clear [`DependencyError`] instead of parsing compressed bytes as text.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{DependencyError, Result, TtmError};

/// Codec selected for a path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    /// Plain text.
    None,
    /// gzip, via `flate2`.
    Gzip,
    /// bzip2, via `bzip2`.
    Bzip2,
    /// xz, via `xz2`.
    Xz,
}

impl Compression {
    /// Infer the codec from the path's extension.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use ttm_core::Compression;
    ///
    /// assert_eq!(Compression::from_path(Path::new("out.tsv.gz")), Compression::Gzip);
    /// assert_eq!(Compression::from_path(Path::new("out.tsv")), Compression::None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            Some("xz") => Self::Xz,
            _ => Self::None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::None => "no",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }

    /// Fail early when the codec is not compiled in.
    ///
    /// # Errors
    /// Returns [`DependencyError::UnsupportedCompression`].
    pub fn ensure_supported(self, path: &Path) -> core::result::Result<(), DependencyError> {
        match self {
            Self::None => Ok(()),
            Self::Gzip if cfg!(feature = "gzip") => Ok(()),
            Self::Bzip2 if cfg!(feature = "bzip2") => Ok(()),
            Self::Xz if cfg!(feature = "xz") => Ok(()),
            Self::Gzip | Self::Bzip2 | Self::Xz => Err(DependencyError::UnsupportedCompression {
                path: path.to_path_buf(),
                codec: self.label(),
            }),
        }
    }

    /// Open `path` for reading through the codec its extension names.
    ///
    /// # Errors
    /// Returns [`TtmError::Dependency`] when the codec is not compiled in and
    /// [`TtmError::Io`] when the file cannot be opened.
    pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
        let compression = Self::from_path(path);
        compression.ensure_supported(path)?;
        let file =
            File::open(path).map_err(|source| TtmError::io(path.display().to_string(), source))?;
        Ok(compression.reader(file))
    }

    /// Wrap an opened file in a decoding reader.
    pub(crate) fn reader(self, file: File) -> Box<dyn BufRead> {
        match self {
            #[cfg(feature = "gzip")]
            Self::Gzip => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
                BufReader::new(file),
            ))),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Box::new(BufReader::new(bzip2::read::MultiBzDecoder::new(
                BufReader::new(file),
            ))),
            #[cfg(feature = "xz")]
            Self::Xz => Box::new(BufReader::new(xz2::read::XzDecoder::new_multi_decoder(
                BufReader::new(file),
            ))),
            _ => Box::new(BufReader::new(file)),
        }
    }

    /// Wrap a created file in an encoding writer.
    pub(crate) fn writer(self, file: File) -> Encoder {
        match self {
            #[cfg(feature = "gzip")]
            Self::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(
                BufWriter::new(file),
                flate2::Compression::default(),
            )),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Encoder::Bzip2(bzip2::write::BzEncoder::new(
                BufWriter::new(file),
                bzip2::Compression::default(),
            )),
            #[cfg(feature = "xz")]
            Self::Xz => Encoder::Xz(xz2::write::XzEncoder::new(BufWriter::new(file), XZ_PRESET)),
            _ => Encoder::Plain(BufWriter::new(file)),
        }
    }
}

#[cfg(feature = "xz")]
const XZ_PRESET: u32 = 6;

/// Encoding writer that must be finished explicitly to flush trailers.
pub(crate) enum Encoder {
    Plain(BufWriter<File>),
    #[cfg(feature = "gzip")]
    Gzip(flate2::write::GzEncoder<BufWriter<File>>),
    #[cfg(feature = "bzip2")]
    Bzip2(bzip2::write::BzEncoder<BufWriter<File>>),
    #[cfg(feature = "xz")]
    Xz(xz2::write::XzEncoder<BufWriter<File>>),
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(writer) => f.debug_tuple("Plain").field(writer).finish(),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => f.debug_tuple("Gzip").field(encoder).finish(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(_) => f.debug_tuple("Bzip2").finish_non_exhaustive(),
            #[cfg(feature = "xz")]
            Self::Xz(_) => f.debug_tuple("Xz").finish_non_exhaustive(),
        }
    }
}

impl Encoder {
    pub(crate) fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(writer) => sync(writer),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => sync(encoder.finish()?),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(encoder) => sync(encoder.finish()?),
            #[cfg(feature = "xz")]
            Self::Xz(encoder) => sync(encoder.finish()?),
        }
    }
}

fn sync(mut writer: BufWriter<File>) -> std::io::Result<()> {
    writer.flush()?;
    writer.get_ref().sync_all()
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(writer) => writer.write(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => encoder.write(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(encoder) => encoder.write(buf),
            #[cfg(feature = "xz")]
            Self::Xz(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(writer) => writer.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => encoder.flush(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(encoder) => encoder.flush(),
            #[cfg(feature = "xz")]
            Self::Xz(encoder) => encoder.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("table.tsv", Compression::None)]
    #[case("table.tsv.gz", Compression::Gzip)]
    #[case("table.tsv.bz2", Compression::Bzip2)]
    #[case("table.tsv.xz", Compression::Xz)]
    #[case("table", Compression::None)]
    fn infers_codec_from_extension(#[case] path: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(Path::new(path)), expected);
    }

    #[rstest]
    #[case(Compression::Gzip, cfg!(feature = "gzip"))]
    #[case(Compression::Bzip2, cfg!(feature = "bzip2"))]
    #[case(Compression::Xz, cfg!(feature = "xz"))]
    fn support_follows_enabled_features(#[case] compression: Compression, #[case] enabled: bool) {
        let outcome = compression.ensure_supported(Path::new("t.tsv"));
        if enabled {
            assert!(outcome.is_ok());
        } else {
            assert!(matches!(
                outcome,
                Err(DependencyError::UnsupportedCompression { codec, .. }) if codec == compression.label()
            ));
        }
    }
}
