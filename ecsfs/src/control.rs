use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;

use crate::block::{self, BlockId, DataBlock};
use crate::config::BLOCK_SIZE;
use crate::fd::FdTable;
use crate::volume::fat::Fat;
use crate::volume::root_dir::{self, DirEntry, RootDir};
use crate::volume::super_block::SuperBlock;
use crate::{ClusterId, Error, FatEntry, Result};

/// 多个调用者共享时，所有卷操作都经过这把锁串行执行
pub type SharedFileSystem = spin::Mutex<FileSystem>;

/// 卷控制器，至多挂载一个卷
#[derive(Debug, Default)]
pub struct FileSystem {
    volume: Option<Volume>,
}

/// 已挂载的卷：超级块、FAT与根目录常驻内存，直到卸载时写回
#[derive(Debug)]
pub(crate) struct Volume {
    pub dev: Arc<dyn BlockDevice>,
    pub sb: SuperBlock,
    pub fat: Fat,
    pub root: RootDir,
    pub fds: FdTable,
}

/// 卷的概况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: usize,
    pub fat_blocks: usize,
    pub root_dir_block: usize,
    pub data_start_block: usize,
    pub data_blocks: usize,
    pub fat_free: usize,
    pub root_dir_free: usize,
    pub root_dir_capacity: usize,
}

/// 根目录中的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
    pub first_block: Option<ClusterId>,
}

impl FileSystem {
    pub const fn new() -> Self {
        Self { volume: None }
    }

    /// 在块设备上建立一个含`data_blocks`个数据块的空卷。
    /// 设备的块数必须与卷的块总数一致。
    pub fn format(dev: &Arc<dyn BlockDevice>, data_blocks: usize) -> Result<()> {
        let sb = SuperBlock::with_data_blocks(data_blocks)?;
        if sb.total_blocks() != dev.block_count() {
            log::warn!(
                "a volume of {data_blocks} data blocks takes {} blocks, the device has {}",
                sb.total_blocks(),
                dev.block_count()
            );
            return Err(Error::FormatInvalid);
        }

        BlockId::new(0).write(dev.as_ref(), &sb.encode())?;
        block::write_run(
            dev.as_ref(),
            sb.fat_area().start,
            &Fat::new(data_blocks).encode(sb.fat_blocks()),
        )?;
        sb.root_dir().write(dev.as_ref(), &RootDir::new().encode())?;

        log::info!(
            "formatted volume: {} blocks, {data_blocks} data blocks",
            sb.total_blocks()
        );
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    /// 挂载卷。
    /// 校验失败时不保留任何卷状态。
    pub fn mount(&mut self, dev: Arc<dyn BlockDevice>) -> Result<()> {
        if self.volume.is_some() {
            return Err(Error::AlreadyMounted);
        }

        let volume = Volume::load(dev)?;
        log::info!(
            "mounted volume: {} blocks, {} of {} data blocks free",
            volume.sb.total_blocks(),
            volume.fat.free_count(),
            volume.sb.data_blocks()
        );
        self.volume = Some(volume);
        Ok(())
    }

    /// 将FAT与根目录写回设备并卸载，交还块设备。
    /// 写回失败时卷仍保持挂载。
    pub fn unmount(&mut self) -> Result<Arc<dyn BlockDevice>> {
        let volume = self.volume()?;
        if !volume.fds.is_empty() {
            log::debug!("{} descriptors still open", volume.fds.len());
            return Err(Error::VolumeBusy);
        }
        volume.flush()?;

        let volume = self.volume.take().ok_or(Error::NotMounted)?;
        log::info!("unmounted volume");
        Ok(volume.dev)
    }

    /// 将FAT与根目录写回设备，卷保持挂载
    pub fn sync(&self) -> Result<()> {
        self.volume()?.flush()
    }

    pub fn info(&self) -> Result<VolumeInfo> {
        let volume = self.volume()?;
        let sb = &volume.sb;
        Ok(VolumeInfo {
            total_blocks: sb.total_blocks(),
            fat_blocks: sb.fat_blocks(),
            root_dir_block: sb.root_dir().into(),
            data_start_block: sb.data_area().into(),
            data_blocks: sb.data_blocks(),
            fat_free: volume.fat.free_count(),
            root_dir_free: volume.root.free_count(),
            root_dir_capacity: volume.root.capacity(),
        })
    }

    /// 在根目录中创建空文件，此时不分配数据块
    pub fn create(&mut self, name: &str) -> Result<()> {
        let volume = self.volume_mut()?;
        root_dir::validate_name(name)?;

        let slot = volume.root.insert(DirEntry::new(String::from(name)))?;
        log::debug!("create {name:?} in slot {slot}");
        Ok(())
    }

    /// 删除文件并释放其块链
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let volume = self.volume_mut()?;
        root_dir::validate_name(name)?;

        let slot = volume.root.find(name).ok_or(Error::NameNotFound)?;
        if volume.fds.is_open(slot) {
            return Err(Error::FileBusy);
        }

        let entry = volume.root.remove(slot).ok_or(Error::NameNotFound)?;
        if let Some(head) = entry.head {
            volume.fat.free(head);
        }
        log::debug!("delete {name:?} from slot {slot}");
        Ok(())
    }

    /// 按槽位顺序列出所有文件
    pub fn ls(&self) -> Result<Vec<FileInfo>> {
        let volume = self.volume()?;
        Ok(volume
            .root
            .iter()
            .map(|(_, entry)| FileInfo {
                name: entry.name.clone(),
                size: entry.size(),
                first_block: entry.head,
            })
            .collect())
    }

    /// 按文件名获取文件大小
    pub fn stat_by_name(&self, name: &str) -> Result<usize> {
        let volume = self.volume()?;
        let slot = volume.root.find(name).ok_or(Error::NameNotFound)?;
        Ok(volume.root.entry(slot).size())
    }
}

impl FileSystem {
    pub(crate) fn volume(&self) -> Result<&Volume> {
        self.volume.as_ref().ok_or(Error::NotMounted)
    }

    pub(crate) fn volume_mut(&mut self) -> Result<&mut Volume> {
        self.volume.as_mut().ok_or(Error::NotMounted)
    }
}

impl Volume {
    fn load(dev: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut block: DataBlock = [0; BLOCK_SIZE];
        BlockId::new(0).read(dev.as_ref(), &mut block)?;
        let sb = SuperBlock::decode(&block)?;
        sb.validate(dev.block_count())?;

        let fat_image = block::read_run(dev.as_ref(), sb.fat_area().start, sb.fat_blocks())?;
        let fat = Fat::decode(&fat_image, sb.data_blocks())?;

        sb.root_dir().read(dev.as_ref(), &mut block)?;
        let root = RootDir::decode(&block, sb.data_blocks())?;

        Self::check_files(&fat, &root)?;

        Ok(Self {
            dev,
            sb,
            fat,
            root,
            fds: FdTable::new(),
        })
    }

    /// 文件的块链互不相交，且长度恰好容纳文件大小；空文件至多占一个块
    fn check_files(fat: &Fat, root: &RootDir) -> Result<()> {
        if !fat.check_chains(root.iter().filter_map(|(_, entry)| entry.head)) {
            return Err(Error::FormatInvalid);
        }

        for (slot, entry) in root.iter() {
            let blocks = entry.head.map_or(0, |head| fat.chain_len(head));
            let needed = entry.size().div_ceil(BLOCK_SIZE);
            if blocks < needed || blocks > needed.max(1) {
                log::warn!(
                    "file {:?} in slot {slot} claims {} bytes but owns {blocks} blocks",
                    entry.name,
                    entry.size
                );
                return Err(Error::FormatInvalid);
            }
        }

        Ok(())
    }

    /// 写回超级块、FAT区与根目录
    fn flush(&self) -> Result<()> {
        let dev = self.dev.as_ref();
        BlockId::new(0).write(dev, &self.sb.encode())?;
        block::write_run(
            dev,
            self.sb.fat_area().start,
            &self.fat.encode(self.sb.fat_blocks()),
        )?;
        self.sb.root_dir().write(dev, &self.root.encode())?;
        log::debug!("flushed FAT and root directory");
        Ok(())
    }
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_blocks)?;
        writeln!(f, "rdir_blk={}", self.root_dir_block)?;
        writeln!(f, "data_blk={}", self.data_start_block)?;
        writeln!(f, "data_blk_count={}", self.data_blocks)?;
        writeln!(f, "fat_free_ratio={}/{}", self.fat_free, self.data_blocks)?;
        write!(
            f,
            "rdir_free_ratio={}/{}",
            self.root_dir_free, self.root_dir_capacity
        )
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first_block = self.first_block.map_or(FatEntry::EOC_RAW, u16::from);
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name, self.size, first_block
        )
    }
}
