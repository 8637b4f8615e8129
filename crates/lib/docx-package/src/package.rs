use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs};

use tempfile::NamedTempFile;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Error type for reading and writing Word packages.
#[derive(Debug)]
pub enum PackageError {
    NotFound(PathBuf),
    Io(io::Error),
    Zip(ZipError),
    InvalidUtf8 { part: String },
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "package not found: {}", path.display()),
            Self::Io(err) => write!(f, "package I/O error: {err}"),
            Self::Zip(err) => write!(f, "invalid package archive: {err}"),
            Self::InvalidUtf8 { part } => write!(f, "part {part} is not valid UTF-8"),
        }
    }
}

impl Error for PackageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Zip(err) => Some(err),
            Self::NotFound(_) | Self::InvalidUtf8 { .. } => None,
        }
    }
}

impl From<io::Error> for PackageError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ZipError> for PackageError {
    fn from(err: ZipError) -> Self {
        Self::Zip(err)
    }
}

/// A single archive entry held in memory.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
    compression: CompressionMethod,
}

/// In-memory Word package (an OPC zip container).
///
/// Entry order, directory entries and stored/deflated compression are kept so
/// a package written back out mirrors its source apart from replaced parts.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Opens and fully reads a package from disk.
    ///
    /// # Errors
    /// Returns `PackageError::NotFound` if the path is not a file, and
    /// `PackageError::Zip` if the file is not a readable zip archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PackageError::NotFound(path.to_path_buf()));
        }
        let file = fs::File::open(path)?;
        let package = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            entries = package.entries.len(),
            "opened package"
        );
        Ok(package)
    }

    /// Reads a package from any seekable reader.
    ///
    /// # Errors
    /// Returns `PackageError::Zip` if the archive is invalid or an entry cannot be read.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)?;
            }
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                is_dir: file.is_dir(),
                compression: file.compression(),
            });
        }
        Ok(Self { entries })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| !entry.is_dir && entry.name == name)
            .map(|entry| entry.data.as_slice())
    }

    /// Returns a part decoded as UTF-8, or `None` when the part is absent.
    ///
    /// # Errors
    /// Returns `PackageError::InvalidUtf8` if the part exists but is not UTF-8.
    pub fn part_str(&self, name: &str) -> Result<Option<&str>, PackageError> {
        self.part(name)
            .map(|data| {
                let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
                std::str::from_utf8(data).map_err(|_| PackageError::InvalidUtf8 {
                    part: name.to_string(),
                })
            })
            .transpose()
    }

    /// Replaces a part in place, or appends it when the package has no such part.
    pub fn set_part(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| !entry.is_dir && entry.name == name)
        {
            entry.data = data;
            return;
        }
        self.entries.push(PackageEntry {
            name,
            data,
            is_dir: false,
            compression: CompressionMethod::Deflated,
        });
    }

    /// Writes the package as a zip archive.
    ///
    /// # Errors
    /// Returns `PackageError` if writing any entry fails.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, PackageError> {
        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let method = if entry.compression == CompressionMethod::Stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
            } else {
                zip.start_file(entry.name.as_str(), options)?;
                zip.write_all(&entry.data)?;
            }
        }
        Ok(zip.finish()?)
    }

    /// Saves the package to `path` through a temporary file in the same directory.
    ///
    /// The destination only appears once the archive is complete; on failure
    /// the temporary file is removed and any existing file at `path` is untouched.
    ///
    /// # Errors
    /// Returns `PackageError::Io` if the directory, temporary file or final rename fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PackageError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        self.write_to(temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|err| PackageError::Io(err.error))?;
        debug!(path = %path.display(), "saved package");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> DocxPackage {
        let mut package = DocxPackage::new();
        package.set_part("[Content_Types].xml", b"<Types/>".to_vec());
        package.set_part("word/document.xml", b"<w:document/>".to_vec());
        package
    }

    #[test]
    fn roundtrip_keeps_order_and_content() {
        let bytes = sample()
            .write_to(Cursor::new(Vec::new()))
            .expect("write package")
            .into_inner();
        let reread = DocxPackage::from_reader(Cursor::new(bytes)).expect("read package");

        let names: Vec<_> = reread.part_names().collect();
        assert_eq!(names, ["[Content_Types].xml", "word/document.xml"]);
        assert_eq!(reread.part("word/document.xml"), Some(&b"<w:document/>"[..]));
    }

    #[test]
    fn set_part_replaces_in_place() {
        let mut package = sample();
        package.set_part("[Content_Types].xml", b"<Types></Types>".to_vec());

        let names: Vec<_> = package.part_names().collect();
        assert_eq!(names, ["[Content_Types].xml", "word/document.xml"]);
        assert_eq!(
            package.part_str("[Content_Types].xml").expect("utf-8"),
            Some("<Types></Types>")
        );
    }

    #[test]
    fn part_str_rejects_invalid_utf8() {
        let mut package = DocxPackage::new();
        package.set_part("word/document.xml", vec![0xFF, 0xFE, 0x00]);
        assert!(matches!(
            package.part_str("word/document.xml"),
            Err(PackageError::InvalidUtf8 { .. })
        ));
        assert!(package.part_str("word/missing.xml").expect("absent").is_none());
    }

    #[test]
    fn open_rejects_non_zip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip").expect("write");
        assert!(matches!(DocxPackage::open(&path), Err(PackageError::Zip(_))));
        assert!(matches!(
            DocxPackage::open(dir.path().join("missing.docx")),
            Err(PackageError::NotFound(_))
        ));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.docx");
        sample().save(&path).expect("save");

        let reread = DocxPackage::open(&path).expect("open saved");
        assert!(reread.has_part("word/document.xml"));
        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }
}
