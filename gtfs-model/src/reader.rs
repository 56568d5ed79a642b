//! Row-level access to the tables of a feed, from a directory or a zip archive
//!
//! Nothing is typed here: a [DataRow] is the header of its table, the raw values, and where
//! they come from. Turning them into records is the job of the loader.
use crate::source::{SourceInfo, SourceRef, TableHeaders};
use crate::Error;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tables this crate knows how to read, in load order
pub const KNOWN_TABLES: &[&str] = &[
    "feed_info.txt",
    "agency.txt",
    "levels.txt",
    "stops.txt",
    "routes.txt",
    "calendar.txt",
    "calendar_dates.txt",
    "shapes.txt",
    "trips.txt",
    "stop_times.txt",
    "frequencies.txt",
    "transfers.txt",
    "pathways.txt",
    "fare_attributes.txt",
    "fare_rules.txt",
    "areas.txt",
    "translations.txt",
    "attributions.txt",
];

const BOM: &[u8] = &[0xef, 0xbb, 0xbf];

enum Container {
    Directory(PathBuf),
    Zip {
        archive: zip::ZipArchive<BufReader<File>>,
        /// file name (without the directories of the archive) → index in the archive
        entries: FxHashMap<String, usize>,
    },
}

/// An opened feed
pub struct FeedSource {
    container: Container,
    files: Vec<String>,
    sha256: Option<String>,
}

impl FeedSource {
    /// Opens a local zip archive or a local directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let p = path.as_ref();
        let source = if p.is_file() {
            Self::open_zip(p)?
        } else if p.is_dir() {
            Self::open_directory(p)?
        } else {
            return Err(Error::NotFileNorDirectory(format!("{}", p.display())));
        };
        if !source.files.iter().any(|f| f.ends_with(".txt")) {
            return Err(Error::NoTables(format!("{}", p.display())));
        }
        log::debug!("{} opened, {} files", p.display(), source.files.len());
        Ok(source)
    }

    fn open_directory(p: &Path) -> Result<Self, Error> {
        let mut files: Vec<String> = std::fs::read_dir(p)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_owned()))
            .collect();
        files.sort();
        Ok(Self {
            container: Container::Directory(p.to_path_buf()),
            files,
            sha256: None,
        })
    }

    fn open_zip(p: &Path) -> Result<Self, Error> {
        let mut hasher = Sha256::new();
        let mut buf_reader = BufReader::new(File::open(p)?);
        std::io::copy(&mut buf_reader, &mut hasher)?;
        buf_reader.seek(SeekFrom::Start(0))?;
        let hash = hasher.finalize();

        let mut archive = zip::ZipArchive::new(buf_reader)?;
        let mut entries = FxHashMap::default();
        let mut files = Vec::new();
        for i in 0..archive.len() {
            let archive_file = archive.by_index(i)?;
            if archive_file.is_dir() {
                continue;
            }
            let file_name = Path::new(archive_file.name())
                .file_name()
                .and_then(|f| f.to_str())
                .map(|f| f.to_owned());
            if let Some(file_name) = file_name {
                // On duplicated names the first entry of the archive is read
                entries.entry(file_name.clone()).or_insert(i);
                files.push(file_name);
            }
        }
        files.sort();
        files.dedup();
        Ok(Self {
            container: Container::Zip { archive, entries },
            files,
            sha256: Some(format!("{:x}", hash)),
        })
    }

    /// Names of every file of the feed, tables or not
    pub fn file_names(&self) -> &[String] {
        &self.files
    }

    /// True if the feed has this file
    pub fn has_table(&self, table: &str) -> bool {
        self.files.iter().any(|f| f == table)
    }

    /// Hash of the archive, `None` for a directory
    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    /// Streams the rows of a table, `None` if the feed has no such file
    pub fn open_table(&mut self, table: &'static str) -> Result<Option<TableRows<'_>>, Error> {
        if !self.has_table(table) {
            return Ok(None);
        }
        let named_io = |e: std::io::Error| Error::NamedFileIO {
            file_name: table.to_owned(),
            source: Box::new(e),
        };
        let reader: Box<dyn Read + '_> = match &mut self.container {
            Container::Directory(dir) => {
                Box::new(BufReader::new(File::open(dir.join(table)).map_err(named_io)?))
            }
            Container::Zip { archive, entries } => match entries.get(table) {
                Some(&i) => Box::new(archive.by_index(i)?),
                None => return Ok(None),
            },
        };
        TableRows::new(table, reader).map(Some)
    }
}

fn strip_bom<'a>(mut reader: Box<dyn Read + 'a>) -> std::io::Result<Box<dyn Read + 'a>> {
    let mut head = Vec::with_capacity(BOM.len());
    reader.by_ref().take(BOM.len() as u64).read_to_end(&mut head)?;
    if head == BOM {
        Ok(reader)
    } else {
        Ok(Box::new(Cursor::new(head).chain(reader)))
    }
}

/// One data row of a table
#[derive(Debug, Clone)]
pub struct DataRow {
    /// Table and line of the row
    pub source_ref: SourceRef,
    /// Header of the table
    pub headers: Arc<TableHeaders>,
    /// Values, trimmed, in column order
    pub fields: Vec<String>,
    /// The raw bytes were not valid UTF-8; the invalid sequences were replaced by `U+FFFD`
    pub invalid_utf8: bool,
}

impl DataRow {
    /// Value of a column, `None` if the column is absent from the table or the row is too short
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .position(column)
            .and_then(|i| self.fields.get(i))
            .map(String::as_str)
    }

    /// Keeps the raw values around for the diagnostics
    pub fn source_info(&self) -> SourceInfo {
        SourceInfo {
            headers: Arc::clone(&self.headers),
            fields: self.fields.clone(),
        }
    }
}

/// Iterator over the [DataRow]s of one table
pub struct TableRows<'a> {
    table: &'static str,
    headers: Arc<TableHeaders>,
    reader: csv::Reader<Box<dyn Read + 'a>>,
    record: csv::ByteRecord,
}

impl<'a> TableRows<'a> {
    fn new(table: &'static str, reader: Box<dyn Read + 'a>) -> Result<Self, Error> {
        let reader = strip_bom(reader).map_err(|e| Error::NamedFileIO {
            file_name: table.to_owned(),
            source: Box::new(e),
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader
            .byte_headers()
            .map_err(|e| Error::CSVError {
                file_name: table.to_owned(),
                source: e,
            })?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        Ok(Self {
            table,
            headers: Arc::new(TableHeaders::new(headers)),
            reader,
            record: csv::ByteRecord::new(),
        })
    }

    /// Name of the table
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Header of the table
    pub fn headers(&self) -> &Arc<TableHeaders> {
        &self.headers
    }
}

impl<'a> Iterator for TableRows<'a> {
    type Item = Result<DataRow, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Err(e) => Some(Err(Error::CSVError {
                file_name: self.table.to_owned(),
                source: e,
            })),
            Ok(true) => {
                let line = self.record.position().map(|p| p.line()).unwrap_or_default();
                let mut invalid_utf8 = false;
                let fields = self
                    .record
                    .iter()
                    .map(|raw| match std::str::from_utf8(raw) {
                        Ok(s) => s.to_owned(),
                        Err(_) => {
                            invalid_utf8 = true;
                            String::from_utf8_lossy(raw).into_owned()
                        }
                    })
                    .collect();
                Some(Ok(DataRow {
                    source_ref: SourceRef::new(self.table, line),
                    headers: Arc::clone(&self.headers),
                    fields,
                    invalid_utf8,
                }))
            }
        }
    }
}
