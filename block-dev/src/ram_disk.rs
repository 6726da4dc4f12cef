use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use crate::{BlockDevice, Result, BLOCK_SIZE};

type RawBlock = [u8; BLOCK_SIZE];

/// 内存中的块设备，掉电即失
pub struct RamDisk {
    blocks: Mutex<Vec<RawBlock>>,
}

impl RamDisk {
    /// 创建`block_count`个全零块
    pub fn new(block_count: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![[0; BLOCK_SIZE]; block_count]),
        }
    }

    /// 从镜像字节构建，不足一块的尾部补零
    pub fn from_image(image: &[u8]) -> Self {
        let blocks: Vec<RawBlock> = image
            .chunks(BLOCK_SIZE)
            .map(|chunk| {
                let mut block = [0; BLOCK_SIZE];
                block[..chunk.len()].copy_from_slice(chunk);
                block
            })
            .collect();

        Self {
            blocks: Mutex::new(blocks),
        }
    }

    /// 整个设备的字节拷贝
    pub fn image(&self) -> Vec<u8> {
        self.blocks.lock().iter().flatten().copied().collect()
    }
}

impl fmt::Debug for RamDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamDisk")
            .field("block_count", &self.block_count())
            .finish()
    }
}

impl BlockDevice for RamDisk {
    fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.check_transfer(block_id, buf.len())?;
        buf.copy_from_slice(&self.blocks.lock()[block_id]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        self.check_transfer(block_id, buf.len())?;
        self.blocks.lock()[block_id].copy_from_slice(buf);
        Ok(())
    }
}
