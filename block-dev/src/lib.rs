//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、光盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 每次读写恰好传输一个 [`BLOCK_SIZE`] 字节的块。

#![no_std]

extern crate alloc;

mod ram_disk;

use core::any::Any;
use core::fmt::Debug;

pub use self::ram_disk::RamDisk;

/// 块的字节量
pub const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block {block_id} is out of range, the device has {block_count} blocks")]
    OutOfRange { block_id: usize, block_count: usize },

    #[error("a buffer of {len} bytes does not hold exactly one block")]
    BadBuffer { len: usize },

    #[error("device failed to transfer block {block_id}")]
    Io { block_id: usize },
}

pub type Result<T> = core::result::Result<T, BlockError>;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any + Debug {
    /// 设备的块总数
    fn block_count(&self) -> usize;

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()>;

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()>;

    /// 检查块号与缓冲区长度是否构成一次合法的传输
    fn check_transfer(&self, block_id: usize, len: usize) -> Result<()> {
        let block_count = self.block_count();
        if block_id >= block_count {
            return Err(BlockError::OutOfRange {
                block_id,
                block_count,
            });
        }
        if len != BLOCK_SIZE {
            return Err(BlockError::BadBuffer { len });
        }
        Ok(())
    }
}
