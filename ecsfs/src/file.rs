//! 按字节读写文件
//!
//! 读写都以块为单位访问设备：整块直接在调用者的缓冲区上传输，
//! 不足一块的部分经由中转块读出或"读-改-写"。

use core::cmp;

use crate::block::DataBlock;
use crate::config::BLOCK_SIZE;
use crate::control::Volume;
use crate::volume::root_dir;
use crate::{ClusterId, Error, Fd, FileSystem, Result};

impl FileSystem {
    /// 打开文件，偏移量置于文件开头。
    /// 同一文件可被多次打开，各描述符的偏移量互相独立。
    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let volume = self.volume_mut()?;
        root_dir::validate_name(name)?;

        let slot = volume.root.find(name).ok_or(Error::NameNotFound)?;
        let fd = volume.fds.alloc(slot)?;
        log::debug!("open {name:?} as {fd:?}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.volume_mut()?.fds.release(fd)?;
        log::debug!("close {fd:?}");
        Ok(())
    }

    /// 文件大小
    pub fn stat(&self, fd: Fd) -> Result<usize> {
        let volume = self.volume()?;
        let file = volume.fds.get(fd)?;
        Ok(volume.root.entry(file.slot).size())
    }

    /// 移动偏移量，至多移到文件末尾
    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        let volume = self.volume_mut()?;
        let file = volume.fds.get(fd)?;
        if offset > volume.root.entry(file.slot).size() {
            return Err(Error::OffsetOutOfRange);
        }
        volume.fds.get_mut(fd)?.offset = offset;
        Ok(())
    }

    pub fn tell(&self, fd: Fd) -> Result<usize> {
        Ok(self.volume()?.fds.get(fd)?.offset)
    }

    /// 从偏移量处读入`buf`，遇到文件末尾即停。
    /// 返回读取的字节数，偏移量随之前移。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let volume = self.volume_mut()?;
        let file = volume.fds.get(fd)?;
        let entry = volume.root.entry(file.slot);

        let len = cmp::min(buf.len(), entry.size().saturating_sub(file.offset));
        let Some(head) = entry.head.filter(|_| len > 0) else {
            return Ok(0);
        };
        let start = volume
            .fat
            .locate(head, file.offset)
            .expect("chain covers the file size");

        let read = volume.transfer(start, file.offset, len, |volume, id, range, pos| {
            let block = volume.sb.data_block(id);
            let dst = &mut buf[pos..pos + range.len()];
            if range.len() == BLOCK_SIZE {
                block.read(volume.dev.as_ref(), dst)
            } else {
                let mut bounce: DataBlock = [0; BLOCK_SIZE];
                block.read(volume.dev.as_ref(), &mut bounce)?;
                dst.copy_from_slice(&bounce[range]);
                Ok(())
            }
        })?;

        volume.fds.get_mut(fd)?.offset += read;
        log::trace!("{fd:?} read {read} bytes at {}", file.offset);
        Ok(read)
    }

    /// 将`data`写到偏移量处，必要时延长块链。
    /// 磁盘写满时只写入能容纳的部分，返回实际写入的字节数。
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<usize> {
        let volume = self.volume_mut()?;
        let file = volume.fds.get(fd)?;
        if data.is_empty() {
            return Ok(0);
        }

        let before = volume
            .root
            .entry(file.slot)
            .head
            .map_or(0, |head| volume.fat.chain_len(head));
        let Some(head) = volume.grow(file.slot, file.offset + data.len())? else {
            return Ok(0);
        };
        let capacity = volume.fat.chain_len(head) * BLOCK_SIZE;
        let len = cmp::min(data.len(), capacity.saturating_sub(file.offset));
        if len == 0 {
            return Ok(0);
        }
        let start = volume
            .fat
            .locate(head, file.offset)
            .expect("chain covers the write offset");

        let transferred = volume.transfer(start, file.offset, len, |volume, id, range, pos| {
            let block = volume.sb.data_block(id);
            let src = &data[pos..pos + range.len()];
            if range.len() == BLOCK_SIZE {
                block.write(volume.dev.as_ref(), src)
            } else {
                let mut bounce: DataBlock = [0; BLOCK_SIZE];
                block.read(volume.dev.as_ref(), &mut bounce)?;
                bounce[range].copy_from_slice(src);
                block.write(volume.dev.as_ref(), &bounce)
            }
        });
        let written = match transferred {
            Ok(written) => written,
            Err(err) => {
                // 大小不变，退还本次延长的块
                let head = volume.fat.truncate(head, before);
                volume.root.entry_mut(file.slot).head = head;
                return Err(err);
            }
        };

        let end = file.offset + written;
        let entry = volume.root.entry_mut(file.slot);
        if end > entry.size() {
            // 文件最大不超过数据区，必能以u32表示
            entry.size = end as u32;
        }
        volume.fds.get_mut(fd)?.offset = end;
        log::trace!("{fd:?} wrote {written} bytes at {}", file.offset);
        Ok(written)
    }
}

impl Volume {
    /// 从`start`块开始沿块链传输`len`字节，`offset`为首字节在文件内的偏移。
    ///
    /// `op`接收块号、块内范围以及该段在调用者缓冲区中的起点。
    fn transfer<F>(&self, start: ClusterId, offset: usize, len: usize, mut op: F) -> Result<usize>
    where
        F: FnMut(&Self, ClusterId, core::ops::Range<usize>, usize) -> Result<()>,
    {
        let mut current = Some(start);
        let mut pos = 0;

        while pos < len {
            let Some(id) = current else {
                log::error!("chain ended {} bytes short", len - pos);
                break;
            };
            let block_offset = (offset + pos) % BLOCK_SIZE;
            let chunk = cmp::min(BLOCK_SIZE - block_offset, len - pos);

            op(self, id, block_offset..block_offset + chunk, pos)?;

            pos += chunk;
            current = self.fat.next(id);
        }

        Ok(pos)
    }

    /// 延长`slot`处文件的块链，使其足以容纳`end`字节，返回链头。
    ///
    /// 磁盘写满时链保持已延长的部分；一个块也没有时返回`None`。
    fn grow(&mut self, slot: usize, end: usize) -> Result<Option<ClusterId>> {
        let needed = end.div_ceil(BLOCK_SIZE);

        let head = match self.root.entry(slot).head {
            Some(head) => head,
            None => match self.fat.allocate() {
                Ok(head) => {
                    self.root.entry_mut(slot).head = Some(head);
                    head
                }
                Err(Error::DiskFull) => {
                    log::warn!("disk full, nothing written");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            },
        };

        let mut blocks = self.fat.chain_len(head);
        let mut tail = self.fat.last(head);
        while blocks < needed {
            match self.fat.extend(tail) {
                Ok(next) => {
                    tail = next;
                    blocks += 1;
                }
                Err(Error::DiskFull) => {
                    log::warn!("disk full, file holds {blocks} of {needed} blocks");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Some(head))
    }
}
