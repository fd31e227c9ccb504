use core::fmt;

/// Everything that can stop an operation.
///
/// Chain faults found while reading are not here: the read still succeeds and
/// reports them through [`crate::ReadReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The disk image could not be opened for reading and writing.
    ImageOpenFailed,
    /// A sector transfer failed.
    Io { sector: u32 },
    /// The partition table or boot sector describes a volume this driver cannot use.
    InvalidGeometry(&'static str),
    FileNotFound,
    /// The 8.3 name is blank or starts with a byte that marks a free slot.
    InvalidName,
    /// Every root directory slot is in use.
    DirectoryFull,
    /// The FAT ran out of free clusters after `written` bytes had been stored.
    FatExhausted { written: u32 },
    /// The input is larger than the 32-bit size field of a directory entry.
    FileTooLarge,
    /// The input stream of a write failed.
    Source,
    /// The output stream of a read failed.
    Sink,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ImageOpenFailed => write!(f, "disk open error"),
            Error::Io { sector } => write!(f, "I/O error on sector {sector:#010X}"),
            Error::InvalidGeometry(why) => write!(f, "unsupported volume: {why}"),
            Error::FileNotFound => write!(f, "file not found in root directory"),
            Error::InvalidName => write!(f, "name cannot be stored in a directory entry"),
            Error::FileTooLarge => write!(f, "file exceeds the 4 GiB FAT size limit"),
            Error::DirectoryFull => write!(f, "root directory is full"),
            Error::FatExhausted { written } => {
                write!(f, "no free cluster left, only {written} bytes were written")
            }
            Error::Source => write!(f, "input read error"),
            Error::Sink => write!(f, "output write error"),
        }
    }
}
