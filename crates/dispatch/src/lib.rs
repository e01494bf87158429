//! Format-sniffing dispatcher across the specio spectrum file readers.
//!
//! [`load_file`] opens a path, works out which reader is most likely to
//! accept it (from a caller-supplied [`FormatHint`], the filename
//! extension, or the first bytes of the stream), and tries readers in that
//! order until one succeeds. Each attempt runs against its own fresh
//! [`SpecFile`] so a rejected or truncated attempt never leaks partially
//! parsed state into the result.
#![deny(missing_docs, missing_debug_implementations)]

mod error;
mod sniff;

pub use error::{Error, Result};
pub use sniff::FormatHint;

use sniff::candidate_order;
use specio_core::SpecFile;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

fn try_reader(hint: FormatHint, source: &mut File) -> Result<SpecFile> {
    let file = SpecFile::new();
    match hint {
        FormatHint::Spe => specio_spe::read_spe(std::io::BufReader::new(&*source), &file)?,
        FormatHint::Spc => specio_spc::read_spc(source, &file)?,
        FormatHint::Pcf => specio_pcf::read_pcf(source, &file)?,
    }
    Ok(file)
}

/// Open and parse `path`, trying readers in sniffed or hinted order
///
/// If `hint` is given, only that reader is tried and its error (if any) is
/// returned directly. Otherwise readers are tried in sniffed order; each
/// failed attempt rewinds the stream before the next is tried, and no
/// reader is invoked twice.
pub fn load_file(path: impl AsRef<Path>, hint: Option<FormatHint>) -> Result<SpecFile> {
    let path = path.as_ref();
    let mut source = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let order = match hint {
        Some(hint) => vec![hint],
        None => candidate_order(Some(path), &mut source)?,
    };

    for candidate in order {
        let start = source.stream_position()?;
        match try_reader(candidate, &mut source) {
            Ok(result) => {
                result.set_filename(path.to_string_lossy().into_owned());
                return Ok(result);
            }
            Err(err) => {
                if hint.is_some() {
                    return Err(err);
                }
                log::debug!("{candidate:?} reader rejected {}: {err}", path.display());
                source.seek(SeekFrom::Start(start))?;
            }
        }
    }

    Err(Error::NoReaderAccepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile_like::TempPath;

    mod tempfile_like {
        use std::path::{Path, PathBuf};

        /// Minimal self-cleaning temp path, since this workspace doesn't
        /// depend on the `tempfile` crate
        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn new(name: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("specio-dispatch-test-{}-{}", std::process::id(), name));
                Self(path)
            }

            pub fn as_path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn rejects_unrecognised_content() {
        let temp = TempPath::new("garbage.bin");
        std::fs::File::create(temp.as_path()).unwrap().write_all(b"not a spectrum file at all").unwrap();
        assert!(matches!(load_file(temp.as_path(), None), Err(Error::NoReaderAccepted)));
    }

    #[test]
    fn hint_propagates_reader_error_directly() {
        let temp = TempPath::new("bad.spc");
        std::fs::File::create(temp.as_path()).unwrap().write_all(&[0u8; 4]).unwrap();
        let err = load_file(temp.as_path(), Some(FormatHint::Spc)).unwrap_err();
        assert!(matches!(err, Error::Spc(_)));
    }

    #[test]
    fn spe_tag_file_is_recognised_without_a_hint() {
        let temp = TempPath::new("sample.spe");
        let body = "$SPEC_ID:\r\ntest\r\n$DATA:\r\n0 1\r\n1\r\n2\r\n$ENDRECORD:\r\n";
        std::fs::File::create(temp.as_path()).unwrap().write_all(body.as_bytes()).unwrap();
        let result = load_file(temp.as_path(), None).unwrap();
        assert_eq!(result.measurements().len(), 1);
    }
}
