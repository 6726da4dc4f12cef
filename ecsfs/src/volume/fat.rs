//! 文件分配表(FAT)
//!
//! 每个数据块对应一个条目，条目之间串成单向链表，即文件的块链。
//! 卷挂载后整张表常驻内存，卸载或同步时整体写回。

use alloc::vec;
use alloc::vec::Vec;

use crate::config::{BLOCK_SIZE, FAT_ENTRY_SIZE};
use crate::{ClusterId, Error, FatEntry, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat {
    entries: Vec<FatEntry>,
}

impl Fat {
    /// 新卷的FAT：0号条目为链尾，其余皆空闲
    pub fn new(data_blocks: usize) -> Self {
        let mut entries = vec![FatEntry::Free; data_blocks];
        if let Some(reserved) = entries.first_mut() {
            *reserved = FatEntry::EndOfChain;
        }
        Self { entries }
    }

    /// 从FAT区的镜像中解出`data_blocks`个条目，镜像末尾多余的部分忽略
    pub fn decode(image: &[u8], data_blocks: usize) -> Result<Self> {
        if image.len() < data_blocks * FAT_ENTRY_SIZE {
            log::warn!("FAT image too short for {data_blocks} entries");
            return Err(Error::FormatInvalid);
        }

        let entries: Vec<FatEntry> = image
            .chunks_exact(FAT_ENTRY_SIZE)
            .take(data_blocks)
            .map(|raw| FatEntry::from_raw(u16::from_le_bytes([raw[0], raw[1]])))
            .collect();

        if entries.first() != Some(&FatEntry::EndOfChain) {
            log::warn!("reserved FAT entry is {:?}", entries.first());
            return Err(Error::FormatInvalid);
        }

        // 每个块至多被一个条目指向，且不能指回保留条目或越界
        let mut referenced = vec![false; data_blocks];
        for (i, entry) in entries.iter().enumerate() {
            if let FatEntry::Next(next) = *entry {
                let idx = next.index();
                if next == ClusterId::RESERVED || idx >= data_blocks || referenced[idx] {
                    log::warn!("FAT entry {i} points at {next}");
                    return Err(Error::FormatInvalid);
                }
                referenced[idx] = true;
            }
        }

        Ok(Self { entries })
    }

    /// 编码为占`fat_blocks`个块的镜像，尾部填0
    pub fn encode(&self, fat_blocks: usize) -> Vec<u8> {
        let mut image = vec![0; fat_blocks * BLOCK_SIZE];
        for (raw, entry) in image
            .chunks_exact_mut(FAT_ENTRY_SIZE)
            .zip(self.entries.iter())
        {
            raw.copy_from_slice(&entry.into_raw().to_le_bytes());
        }
        image
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ClusterId) -> FatEntry {
        self.entries[id.index()]
    }

    /// 空闲条目的数量
    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_free()).count()
    }

    /// 获取链上的下一个块，`None`表示`id`为链尾
    pub fn next(&self, id: ClusterId) -> Option<ClusterId> {
        match self.get(id) {
            FatEntry::Next(next) => Some(next),
            FatEntry::EndOfChain => None,
            FatEntry::Free => {
                log::error!("walked into free cluster {id}");
                None
            }
        }
    }

    /// 从`head`开始遍历整条块链
    pub fn chain(&self, head: ClusterId) -> Chain<'_> {
        Chain {
            fat: self,
            current: Some(head),
            remaining: self.len(),
        }
    }

    /// 首次适配：从1号条目起寻找空闲块，标记为链尾
    pub fn allocate(&mut self) -> Result<ClusterId> {
        let idx = self
            .entries
            .iter()
            .skip(ClusterId::MIN.index())
            .position(|entry| entry.is_free())
            .map(|pos| pos + ClusterId::MIN.index())
            .ok_or(Error::DiskFull)?;

        self.entries[idx] = FatEntry::EndOfChain;
        let id = ClusterId::new(idx as u16);
        log::trace!("allocate cluster {id}");
        Ok(id)
    }

    /// 块链上`offset`字节所在的块，链不够长时返回`None`
    pub fn locate(&self, head: ClusterId, offset: usize) -> Option<ClusterId> {
        self.chain(head).nth(offset / BLOCK_SIZE)
    }

    /// 在链尾`tail`之后接上新块。
    /// 分配失败时`tail`保持不变。
    pub fn extend(&mut self, tail: ClusterId) -> Result<ClusterId> {
        debug_assert_eq!(FatEntry::EndOfChain, self.get(tail));

        let next = self.allocate()?;
        self.entries[tail.index()] = FatEntry::Next(next);
        Ok(next)
    }

    /// 释放整条块链
    pub fn free(&mut self, head: ClusterId) {
        let mut current = Some(head);
        while let Some(id) = current {
            current = self.next(id);
            self.entries[id.index()] = FatEntry::Free;
            log::trace!("free cluster {id}");
        }
    }

    /// 将块链截短为`blocks`个块，释放其后的部分，返回新的链头
    pub fn truncate(&mut self, head: ClusterId, blocks: usize) -> Option<ClusterId> {
        let Some(keep) = blocks.checked_sub(1) else {
            self.free(head);
            return None;
        };
        if let Some(tail) = self.chain(head).nth(keep) {
            if let Some(rest) = self.next(tail) {
                self.free(rest);
            }
            self.entries[tail.index()] = FatEntry::EndOfChain;
        }
        Some(head)
    }

    /// 链上最后一个块
    pub fn last(&self, head: ClusterId) -> ClusterId {
        self.chain(head).last().unwrap_or(head)
    }

    pub fn chain_len(&self, head: ClusterId) -> usize {
        self.chain(head).count()
    }

    /// 检查各文件的块链互不相交且无环，返回是否合法
    pub fn check_chains(&self, heads: impl IntoIterator<Item = ClusterId>) -> bool {
        let mut visited = vec![false; self.len()];
        for head in heads {
            let mut current = Some(head);
            while let Some(id) = current {
                let idx = id.index();
                if id == ClusterId::RESERVED || idx >= self.len() || visited[idx] {
                    log::warn!("cluster {id} is shared, reserved or out of range");
                    return false;
                }
                if self.get(id).is_free() {
                    log::warn!("chain from {head} runs into free cluster {id}");
                    return false;
                }
                visited[idx] = true;
                current = self.next(id);
            }
        }
        true
    }
}

/// 块链迭代器
///
/// 最多走过与FAT条目数相同的步数，损坏的环链也不会让遍历卡死。
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    fat: &'a Fat,
    current: Option<ClusterId>,
    remaining: usize,
}

impl Iterator for Chain<'_> {
    type Item = ClusterId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        if self.remaining == 0 {
            self.current = None;
            return None;
        }
        self.remaining -= 1;
        self.current = self.fat.next(id);
        Some(id)
    }
}
