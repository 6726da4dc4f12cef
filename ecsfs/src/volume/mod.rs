//! 卷的布局
//!
//! 超级块 | FAT区 | 根目录 | 数据区

pub mod fat;
pub mod root_dir;
pub mod super_block;

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::root_dir::{DirEntry, RootDir};
    use super::super_block::SuperBlock;
    use crate::config::{BLOCK_SIZE, DIR_ENTRY_SIZE, FILE_MAX_COUNT};

    #[test]
    fn volume() {
        assert_eq!(BLOCK_SIZE, FILE_MAX_COUNT * DIR_ENTRY_SIZE);

        let sb = SuperBlock::with_data_blocks(8).unwrap();
        assert_eq!(BLOCK_SIZE, sb.encode().len());

        let mut root = RootDir::new();
        root.insert(DirEntry::new(String::from("a"))).unwrap();
        assert_eq!(BLOCK_SIZE, root.encode().len());
    }
}
