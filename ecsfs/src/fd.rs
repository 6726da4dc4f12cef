//! 文件描述符表

use derive_more::{From, Into};

use crate::config::OPEN_MAX_COUNT;
use crate::{Error, Result};

/// 文件描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
#[repr(transparent)]
pub struct Fd(usize);

/// 已打开的文件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    /// 文件在根目录中的槽位；文件打开期间无法删除，槽位不会变动
    pub slot: usize,
    /// **文件**内的偏移量
    pub offset: usize,
}

#[derive(Debug)]
pub struct FdTable {
    files: [Option<OpenFile>; OPEN_MAX_COUNT],
}

impl FdTable {
    pub const fn new() -> Self {
        Self {
            files: [None; OPEN_MAX_COUNT],
        }
    }

    /// 占用首个空闲描述符，偏移量从0开始
    pub fn alloc(&mut self, slot: usize) -> Result<Fd> {
        let fd = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(Error::DescriptorTableFull)?;
        self.files[fd] = Some(OpenFile { slot, offset: 0 });
        Ok(Fd(fd))
    }

    pub fn release(&mut self, fd: Fd) -> Result<OpenFile> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::take)
            .ok_or(Error::DescriptorInvalid)
    }

    pub fn get(&self, fd: Fd) -> Result<OpenFile> {
        self.files
            .get(fd.0)
            .copied()
            .flatten()
            .ok_or(Error::DescriptorInvalid)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::DescriptorInvalid)
    }

    /// 是否有描述符指向该槽位的文件
    pub fn is_open(&self, slot: usize) -> bool {
        self.files.iter().flatten().any(|file| file.slot == slot)
    }

    /// 已打开的描述符个数
    pub fn len(&self) -> usize {
        self.files.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
