//! 根目录，整个卷唯一的目录，占据一个块。
//!
//! 共[`FILE_MAX_COUNT`]个槽位，每条记录32字节：
//! 文件名(16) | 文件大小(4) | 首个数据块(2) | 保留(10)

use alloc::string::String;
use alloc::vec::Vec;
use core::str;

use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};

use crate::block::DataBlock;
use crate::config::{BLOCK_SIZE, FILENAME_LEN, FILE_MAX_COUNT};
use crate::{ClusterId, Error, FatEntry, Result};

/// 磁盘上的目录记录
#[binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
struct RawDirEntry {
    /// NUL结尾的文件名，首字节为0表示空槽
    name: [u8; FILENAME_LEN],

    /// 文件大小，以字节计
    size: u32,

    /// 首个数据块，`0xFFFF`表示文件尚未占有数据块
    first_block: u16,

    /// 保留，恒为0
    _reserved: [u8; 10],
}

/// 已占用槽位中的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub size: u32,
    /// 块链的头，`None`表示链尾，即尚未分配数据块
    pub head: Option<ClusterId>,
}

impl DirEntry {
    pub fn new(name: String) -> Self {
        Self {
            name,
            size: 0,
            head: None,
        }
    }

    pub const fn size(&self) -> usize {
        self.size as usize
    }
}

/// 文件名非空、连同结尾的NUL不超过[`FILENAME_LEN`]字节，且不含NUL
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= FILENAME_LEN || name.contains('\0') {
        log::debug!("invalid file name {name:?}");
        return Err(Error::NameInvalid);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir {
    slots: Vec<Option<DirEntry>>,
}

impl RootDir {
    pub fn new() -> Self {
        Self {
            slots: (0..FILE_MAX_COUNT).map(|_| None).collect(),
        }
    }

    /// 解码根目录块，首块号须落在`data_blocks`个数据块之内，文件名互不相同
    pub fn decode(block: &DataBlock, data_blocks: usize) -> Result<Self> {
        let mut cursor = Cursor::new(&block[..]);
        let mut slots: Vec<Option<DirEntry>> = Vec::with_capacity(FILE_MAX_COUNT);

        for i in 0..FILE_MAX_COUNT {
            let raw = RawDirEntry::read(&mut cursor).map_err(|err| {
                log::warn!("unreadable directory record {i}: {err}");
                Error::FormatInvalid
            })?;
            let entry = Self::decode_entry(i, raw, data_blocks)?;
            if let Some(entry) = &entry {
                if slots.iter().flatten().any(|other| other.name == entry.name) {
                    log::warn!("directory record {i} repeats the name {:?}", entry.name);
                    return Err(Error::FormatInvalid);
                }
            }
            slots.push(entry);
        }

        Ok(Self { slots })
    }

    pub fn encode(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        let mut cursor = Cursor::new(&mut block[..]);

        for slot in &self.slots {
            let raw = match slot {
                Some(entry) => {
                    let mut name = [0; FILENAME_LEN];
                    name[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
                    RawDirEntry {
                        name,
                        size: entry.size,
                        first_block: entry.head.map_or(FatEntry::EOC_RAW, u16::from),
                        ..Default::default()
                    }
                }
                None => RawDirEntry {
                    first_block: FatEntry::EOC_RAW,
                    ..Default::default()
                },
            };
            raw.write(&mut cursor)
                .expect("root directory fits in one block");
        }

        block
    }

    /// 查找文件所在的槽位
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.name == name))
    }

    /// 已占用槽位中的文件
    ///
    /// # Panics
    ///
    /// 槽位空闲时。
    pub fn entry(&self, slot: usize) -> &DirEntry {
        self.slots[slot]
            .as_ref()
            .expect("slot is occupied while referenced")
    }

    pub fn entry_mut(&mut self, slot: usize) -> &mut DirEntry {
        self.slots[slot]
            .as_mut()
            .expect("slot is occupied while referenced")
    }

    /// 放入首个空槽，返回槽位。
    /// 同名文件优先于目录已满报错。
    pub fn insert(&mut self, entry: DirEntry) -> Result<usize> {
        if self.find(&entry.name).is_some() {
            return Err(Error::NameAlreadyExists);
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::DirectoryFull)?;
        self.slots[slot] = Some(entry);
        Ok(slot)
    }

    /// 清空槽位，返回其中的文件
    pub fn remove(&mut self, slot: usize) -> Option<DirEntry> {
        self.slots[slot].take()
    }

    /// 按槽位顺序遍历已占用的槽位
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| (i, entry)))
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for RootDir {
    fn default() -> Self {
        Self::new()
    }
}

impl RootDir {
    fn decode_entry(i: usize, raw: RawDirEntry, data_blocks: usize) -> Result<Option<DirEntry>> {
        let Some(len) = raw.name.iter().position(|&b| b == 0) else {
            log::warn!("directory record {i} has an unterminated name");
            return Err(Error::FormatInvalid);
        };
        if len == 0 {
            return Ok(None);
        }

        let name = str::from_utf8(&raw.name[..len]).map_err(|_| {
            log::warn!("directory record {i} has a non UTF-8 name");
            Error::FormatInvalid
        })?;

        let head = match FatEntry::from_raw(raw.first_block) {
            FatEntry::EndOfChain => None,
            FatEntry::Next(id) if id.index() < data_blocks => Some(id),
            _ => {
                log::warn!(
                    "directory record {i} ({name}) starts at invalid block {}",
                    raw.first_block
                );
                return Err(Error::FormatInvalid);
            }
        };

        Ok(Some(DirEntry {
            name: String::from(name),
            size: raw.size,
            head,
        }))
    }
}
