//! Constants used in ecsfs

pub use block_dev::BLOCK_SIZE;

/// 超级块开头的签名
pub const SIGNATURE: &[u8; 8] = b"ECS150FS";

/// 文件名字段的字节量，含结尾的NUL
pub const FILENAME_LEN: usize = 16;

/// 根目录的槽位数
pub const FILE_MAX_COUNT: usize = 128;

/// 同时打开的文件描述符上限
pub const OPEN_MAX_COUNT: usize = 32;

/// 一个FAT条目的字节量
pub const FAT_ENTRY_SIZE: usize = 2;

/// 一个块能容纳多少条FAT条目
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / FAT_ENTRY_SIZE;

/// 一条根目录记录的字节量
pub const DIR_ENTRY_SIZE: usize = 32;

/// 数据块数量的上限，保证块总数仍能用`u16`记录
pub const MAX_DATA_BLOCKS: usize = 65501;
