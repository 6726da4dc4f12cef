#![allow(dead_code)]

use std::sync::Arc;

use ecsfs::volume::super_block::SuperBlock;
use ecsfs::{BlockDevice, FileSystem, RamDisk};

/// 新建恰好容纳`data_blocks`个数据块的内存盘并格式化
pub fn formatted_disk(data_blocks: usize) -> Arc<RamDisk> {
    let total = SuperBlock::with_data_blocks(data_blocks)
        .unwrap()
        .total_blocks();
    let disk = Arc::new(RamDisk::new(total));
    let dev: Arc<dyn BlockDevice> = disk.clone();
    FileSystem::format(&dev, data_blocks).unwrap();
    disk
}

/// 格式化并挂载，同时交出底层内存盘以便检查镜像
pub fn mounted(data_blocks: usize) -> (FileSystem, Arc<RamDisk>) {
    let disk = formatted_disk(data_blocks);
    let mut fs = FileSystem::new();
    fs.mount(disk.clone()).unwrap();
    (fs, disk)
}

/// 可辨认的字节序列，便于发现错位
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
