#![no_std]

extern crate alloc;

/* ecsfs 的整体架构，自上而下 */

// 控制层：挂载、卸载与文件命名空间
mod control;

// 文件层：文件描述符与按字节读写
mod fd;
mod file;

// 卷布局层：超级块、FAT与根目录的磁盘格式
pub mod volume;

mod block;
mod cluster;
pub mod config;
mod error;

pub use block_dev::{BlockDevice, BlockError, RamDisk};

pub use self::{
    block::BlockId,
    cluster::{ClusterId, FatEntry},
    control::{FileInfo, FileSystem, SharedFileSystem, VolumeInfo},
    error::{Error, Result},
    fd::Fd,
};
