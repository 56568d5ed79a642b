//! Module for the error management
use thiserror::Error;

/// An error that can occur when reading a feed or one of its fields
#[derive(Error, Debug)]
pub enum Error {
    /// A file is not present in the archive or the directory
    #[error("Could not find file {0}")]
    MissingFile(String),
    /// The given path to the feed is neither a file nor a directory
    #[error("Could not read GTFS: {0} is neither a file nor a directory")]
    NotFileNorDirectory(String),
    /// Neither the directory nor the archive contain any `.txt` table
    #[error("No table found in {0}")]
    NoTables(String),
    /// The time is not given in the HH:MM:SS format
    #[error("'{0}' is not a valid time; HH:MM:SS format is expected.")]
    InvalidTime(String),
    /// The date is not given in the YYYYMMDD format
    #[error("'{0}' is not a valid date; YYYYMMDD format is expected.")]
    InvalidDate(String),
    /// The color is not given in the RRGGBB format, without a leading `#`
    #[error("'{0}' is not a valid color; RRGGBB format is expected, without a leading `#`")]
    InvalidColor(String),
    /// A boolean is neither `0` nor `1`
    #[error("Invalid value `{0}`, expected 0 or 1")]
    InvalidBool(String),
    /// Generic Input/Output error while reading a file
    #[error("impossible to read file")]
    IO(#[from] std::io::Error),
    /// Impossible to read a file
    #[error("impossible to read '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be read
        file_name: String,
        /// The inital error that caused the unability to read the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read a CSV file
    #[error("impossible to read csv file '{file_name}'")]
    CSVError {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
    },
    /// Error when trying to unzip the GTFS archive
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
