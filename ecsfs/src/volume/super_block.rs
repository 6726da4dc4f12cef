use core::ops::Range;

use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};

use crate::block::{BlockId, DataBlock};
use crate::config::{BLOCK_SIZE, FAT_ENTRIES_PER_BLOCK, MAX_DATA_BLOCKS};
use crate::{ClusterId, Error, Result};

/// 超级块
///
/// 位于0号块，记录卷的几何信息，块内剩余部分皆填0。
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little, magic = b"ECS150FS")]
pub struct SuperBlock {
    /// 卷占用的块总数
    total_blocks: u16,

    /// 根目录所在的块
    root_dir_block: u16,

    /// 数据区的起始块
    data_start_block: u16,

    /// 数据块的数量，同时也是FAT条目的数量
    data_blocks: u16,

    /// FAT区占用的块数
    fat_blocks: u8,
}

impl SuperBlock {
    /// 计算容纳`data_blocks`个数据块的卷布局
    pub fn with_data_blocks(data_blocks: usize) -> Result<Self> {
        if !(1..=MAX_DATA_BLOCKS).contains(&data_blocks) {
            log::warn!("cannot lay out a volume of {data_blocks} data blocks");
            return Err(Error::FormatInvalid);
        }

        let fat_blocks = Self::fat_blocks_for(data_blocks);
        let root_dir_block = 1 + fat_blocks;
        let total_blocks = root_dir_block + 1 + data_blocks;

        // MAX_DATA_BLOCKS 保证以下转换不会截断
        Ok(Self {
            total_blocks: total_blocks as u16,
            root_dir_block: root_dir_block as u16,
            data_start_block: (root_dir_block + 1) as u16,
            data_blocks: data_blocks as u16,
            fat_blocks: fat_blocks as u8,
        })
    }

    /// 恰好占满`total_blocks`个块的数据块数量
    ///
    /// FAT的块数随数据块数跳变，有的块总数无法被恰好占满。
    pub fn fit(total_blocks: usize) -> Option<usize> {
        let max_fat_blocks = Self::fat_blocks_for(MAX_DATA_BLOCKS);
        (1..=max_fat_blocks).find_map(|fat_blocks| {
            let data_blocks = total_blocks.checked_sub(2 + fat_blocks)?;
            (data_blocks >= 1
                && data_blocks <= MAX_DATA_BLOCKS
                && Self::fat_blocks_for(data_blocks) == fat_blocks)
                .then_some(data_blocks)
        })
    }

    pub fn decode(block: &DataBlock) -> Result<Self> {
        Self::read(&mut Cursor::new(&block[..])).map_err(|err| {
            log::warn!("unreadable superblock: {err}");
            Error::FormatInvalid
        })
    }

    pub fn encode(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))
            .expect("superblock fits in one block");
        block
    }

    /// 校验几何信息之间的约束，以及与设备块数是否一致
    pub fn validate(&self, device_blocks: usize) -> Result<()> {
        let fat_blocks = self.fat_blocks();
        let data_blocks = self.data_blocks();

        let violation = if 1 + fat_blocks + 1 + data_blocks != self.total_blocks() {
            "block counts do not add up"
        } else if Self::fat_blocks_for(data_blocks) != fat_blocks {
            "FAT size does not match data block count"
        } else if self.root_dir_block as usize != 1 + fat_blocks {
            "root directory is misplaced"
        } else if self.data_start_block as usize != self.root_dir_block as usize + 1 {
            "data area is misplaced"
        } else if self.total_blocks() != device_blocks {
            "volume size does not match the device"
        } else {
            return Ok(());
        };

        log::warn!("invalid superblock ({violation}): {self:?}, device has {device_blocks} blocks");
        Err(Error::FormatInvalid)
    }

    pub const fn total_blocks(&self) -> usize {
        self.total_blocks as usize
    }

    pub const fn fat_blocks(&self) -> usize {
        self.fat_blocks as usize
    }

    pub const fn data_blocks(&self) -> usize {
        self.data_blocks as usize
    }

    /// FAT区的块范围
    pub fn fat_area(&self) -> Range<BlockId> {
        let start = BlockId::new(1);
        start..start + self.fat_blocks()
    }

    pub const fn root_dir(&self) -> BlockId {
        BlockId::new(self.root_dir_block as usize)
    }

    pub const fn data_area(&self) -> BlockId {
        BlockId::new(self.data_start_block as usize)
    }

    /// 数据块在设备上的位置
    pub fn data_block(&self, id: ClusterId) -> BlockId {
        debug_assert!(id.index() < self.data_blocks());
        self.data_area() + id.index()
    }
}

impl SuperBlock {
    const fn fat_blocks_for(data_blocks: usize) -> usize {
        data_blocks.div_ceil(FAT_ENTRIES_PER_BLOCK)
    }
}
