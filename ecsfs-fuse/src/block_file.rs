use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BlockDevice, BlockError, Result, BLOCK_SIZE};

/// 以宿主机上的镜像文件充当块设备
#[derive(Debug)]
pub struct BlockFile {
    inner: Mutex<File>,
    block_count: usize,
}

impl BlockFile {
    /// 打开已有的镜像，文件不存在时失败
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        if len % BLOCK_SIZE != 0 {
            log::warn!("image size {len} is not a multiple of {BLOCK_SIZE}, tail ignored");
        }

        Ok(Self {
            inner: Mutex::new(file),
            block_count: len / BLOCK_SIZE,
        })
    }

    /// 新建或截断镜像，使其恰好容纳`block_count`个块
    pub fn create(path: &Path, block_count: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((block_count * BLOCK_SIZE) as u64)?;

        Ok(Self {
            inner: Mutex::new(file),
            block_count,
        })
    }

    fn transfer<F>(&self, block_id: usize, op: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let mut file = self.inner.lock().map_err(|_| BlockError::Io { block_id })?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| op(&mut file))
            .map_err(|err| {
                log::error!("block {block_id}: {err}");
                BlockError::Io { block_id }
            })
    }
}

impl BlockDevice for BlockFile {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.check_transfer(block_id, buf.len())?;
        self.transfer(block_id, |file| file.read_exact(buf))
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        self.check_transfer(block_id, buf.len())?;
        self.transfer(block_id, |file| file.write_all(buf))
    }
}
