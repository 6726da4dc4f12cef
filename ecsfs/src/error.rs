use block_dev::BlockError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no volume is mounted")]
    NotMounted,

    #[error("a volume is already mounted")]
    AlreadyMounted,

    #[error("the device does not hold a valid ECS150FS volume")]
    FormatInvalid,

    #[error("file name is empty, too long or contains NUL")]
    NameInvalid,

    #[error("no such file")]
    NameNotFound,

    #[error("file already exists")]
    NameAlreadyExists,

    #[error("root directory is full")]
    DirectoryFull,

    #[error("too many open files")]
    DescriptorTableFull,

    #[error("bad file descriptor")]
    DescriptorInvalid,

    #[error("file is open")]
    FileBusy,

    #[error("offset lies beyond the end of file")]
    OffsetOutOfRange,

    #[error("no free data block")]
    DiskFull,

    #[error("volume still has open files")]
    VolumeBusy,

    #[error(transparent)]
    Device(#[from] BlockError),
}

pub type Result<T> = core::result::Result<T, Error>;
