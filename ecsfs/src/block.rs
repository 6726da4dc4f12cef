//! 设备块的抽象

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;
use derive_more::{Add, From, Into};

use crate::config::BLOCK_SIZE;
use crate::Result;

/// 一整块数据，也用作读写部分块时的中转缓冲
pub type DataBlock = [u8; BLOCK_SIZE];

/// 设备上的绝对块号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct BlockId(usize);

impl core::ops::Add<usize> for BlockId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        self + Self(rhs)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BlockId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn read(self, dev: &dyn BlockDevice, buf: &mut [u8]) -> Result<()> {
        log::trace!("read block {self}");
        dev.read_block(self.0, buf)?;
        Ok(())
    }

    pub fn write(self, dev: &dyn BlockDevice, buf: &[u8]) -> Result<()> {
        log::trace!("write block {self}");
        dev.write_block(self.0, buf)?;
        Ok(())
    }
}

/// 读出从`start`开始的连续`count`个块
pub fn read_run(dev: &dyn BlockDevice, start: BlockId, count: usize) -> Result<Vec<u8>> {
    let mut image = vec![0; count * BLOCK_SIZE];
    for (i, block) in image.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        (start + i).read(dev, block)?;
    }
    Ok(image)
}

/// 将`image`按块写入从`start`开始的连续块，`image`长度须为块的整数倍
pub fn write_run(dev: &dyn BlockDevice, start: BlockId, image: &[u8]) -> Result<()> {
    debug_assert_eq!(0, image.len() % BLOCK_SIZE);
    for (i, block) in image.chunks_exact(BLOCK_SIZE).enumerate() {
        (start + i).write(dev, block)?;
    }
    Ok(())
}
