mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ecsfs::config::BLOCK_SIZE;
use ecsfs::{BlockDevice, BlockError, Error, Fd, FileSystem, RamDisk};

use common::{formatted_disk, mounted, pattern};

/// 可以随时让写操作失败的内存盘
#[derive(Debug)]
struct FailingDisk {
    inner: RamDisk,
    fail_writes: AtomicBool,
}

impl BlockDevice for FailingDisk {
    fn block_count(&self) -> usize {
        self.inner.block_count()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(BlockError::Io { block_id });
        }
        self.inner.write_block(block_id, buf)
    }
}

fn open_new(fs: &mut FileSystem, name: &str) -> Fd {
    fs.create(name).unwrap();
    fs.open(name).unwrap()
}

fn round_trip(len: usize, offset: usize) {
    let (mut fs, _) = mounted(16);
    let fd = open_new(&mut fs, "f");
    let data = pattern(offset + len);

    assert_eq!(offset + len, fs.write(fd, &data).unwrap());
    assert_eq!(offset + len, fs.stat(fd).unwrap());

    fs.seek(fd, offset).unwrap();
    let mut buf = vec![0; len];
    assert_eq!(len, fs.read(fd, &mut buf).unwrap());
    assert_eq!(data[offset..], buf[..]);
    assert_eq!(offset + len, fs.tell(fd).unwrap());
}

#[test]
fn within_block() {
    round_trip(100, 0);
    round_trip(100, 200);
}

#[test]
fn across_boundary() {
    round_trip(200, BLOCK_SIZE - 100);
}

#[test]
fn across_many_blocks() {
    round_trip(5 * BLOCK_SIZE + 17, 0);
    round_trip(3 * BLOCK_SIZE, BLOCK_SIZE / 2);
}

#[test]
fn overwrite_one_byte() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    let mut data = pattern(BLOCK_SIZE);
    fs.write(fd, &data).unwrap();

    fs.seek(fd, 10).unwrap();
    assert_eq!(1, fs.write(fd, &[0xEE]).unwrap());
    assert_eq!(11, fs.tell(fd).unwrap());
    assert_eq!(BLOCK_SIZE, fs.stat(fd).unwrap());
    assert_eq!(6, fs.info().unwrap().fat_free);

    data[10] = 0xEE;
    let mut buf = vec![0; BLOCK_SIZE];
    fs.seek(fd, 0).unwrap();
    assert_eq!(BLOCK_SIZE, fs.read(fd, &mut buf).unwrap());
    assert_eq!(data, buf);
}

#[test]
fn append_extends() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    fs.write(fd, &pattern(10)).unwrap();
    fs.write(fd, &pattern(BLOCK_SIZE)).unwrap();
    assert_eq!(BLOCK_SIZE + 10, fs.stat(fd).unwrap());
    assert_eq!(5, fs.info().unwrap().fat_free);

    let mut expected = pattern(10);
    expected.extend(pattern(BLOCK_SIZE));
    let mut buf = vec![0; BLOCK_SIZE + 10];
    fs.seek(fd, 0).unwrap();
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(expected, buf);
}

#[test]
fn first_write_allocates_one_block() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    assert_eq!(None, fs.ls().unwrap()[0].first_block);

    assert_eq!(1, fs.write(fd, b"x").unwrap());
    assert_eq!(6, fs.info().unwrap().fat_free);
    let head = fs.ls().unwrap()[0].first_block.unwrap();
    assert_eq!(1, u16::from(head));
}

#[test]
fn disk_full_short_write() {
    // 0号数据块保留，只剩3块可用
    let (mut fs, _) = mounted(4);
    let fd = open_new(&mut fs, "f");
    let data = pattern(5 * BLOCK_SIZE);

    assert_eq!(3 * BLOCK_SIZE, fs.write(fd, &data).unwrap());
    assert_eq!(3 * BLOCK_SIZE, fs.stat(fd).unwrap());
    assert_eq!(0, fs.info().unwrap().fat_free);
    assert_eq!(0, fs.write(fd, &data).unwrap());

    // 其他文件连首块也分不到
    let other = open_new(&mut fs, "g");
    assert_eq!(0, fs.write(other, b"x").unwrap());
    assert_eq!(0, fs.stat(other).unwrap());

    let mut buf = vec![0; 3 * BLOCK_SIZE];
    fs.seek(fd, 0).unwrap();
    assert_eq!(3 * BLOCK_SIZE, fs.read(fd, &mut buf).unwrap());
    assert_eq!(data[..3 * BLOCK_SIZE], buf[..]);
}

#[test]
fn disk_full_partial_block() {
    let (mut fs, _) = mounted(4);
    let fd = open_new(&mut fs, "f");
    fs.write(fd, &pattern(2 * BLOCK_SIZE + 100)).unwrap();

    assert_eq!(BLOCK_SIZE - 100, fs.write(fd, &pattern(BLOCK_SIZE)).unwrap());
    assert_eq!(3 * BLOCK_SIZE, fs.stat(fd).unwrap());
}

#[test]
fn seek_bounds() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    assert_eq!(Ok(()), fs.seek(fd, 0));
    assert_eq!(Err(Error::OffsetOutOfRange), fs.seek(fd, 1));

    fs.write(fd, &pattern(20)).unwrap();
    assert_eq!(Ok(()), fs.seek(fd, 20));
    assert_eq!(Err(Error::OffsetOutOfRange), fs.seek(fd, 21));
    assert_eq!(20, fs.stat(fd).unwrap());
}

#[test]
fn read_past_end() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    let mut buf = [0; 16];
    assert_eq!(0, fs.read(fd, &mut buf).unwrap());

    fs.write(fd, &pattern(10)).unwrap();
    assert_eq!(0, fs.read(fd, &mut buf).unwrap());

    fs.seek(fd, 4).unwrap();
    assert_eq!(6, fs.read(fd, &mut buf).unwrap());
    assert_eq!(pattern(10)[4..], buf[..6]);
    assert_eq!(10, fs.tell(fd).unwrap());
}

#[test]
fn zero_length() {
    let (mut fs, _) = mounted(8);
    let fd = open_new(&mut fs, "f");
    assert_eq!(0, fs.write(fd, &[]).unwrap());
    assert_eq!(7, fs.info().unwrap().fat_free);
    assert_eq!(None, fs.ls().unwrap()[0].first_block);

    fs.write(fd, b"abc").unwrap();
    fs.seek(fd, 1).unwrap();
    assert_eq!(0, fs.read(fd, &mut []).unwrap());
    assert_eq!(1, fs.tell(fd).unwrap());
}

#[test]
fn independent_cursors() {
    let (mut fs, _) = mounted(8);
    let writer = open_new(&mut fs, "f");
    let reader = fs.open("f").unwrap();

    fs.write(writer, b"hello world").unwrap();
    assert_eq!(0, fs.tell(reader).unwrap());
    assert_eq!(11, fs.stat(reader).unwrap());

    let mut buf = [0; 5];
    fs.read(reader, &mut buf).unwrap();
    assert_eq!(b"hello", &buf);
    assert_eq!(5, fs.tell(reader).unwrap());
    assert_eq!(11, fs.tell(writer).unwrap());
}

#[test]
fn device_failure_keeps_volume_consistent() {
    let disk = Arc::new(FailingDisk {
        inner: RamDisk::from_image(&formatted_disk(8).image()),
        fail_writes: AtomicBool::new(false),
    });
    let mut fs = FileSystem::new();
    fs.mount(disk.clone()).unwrap();
    let fd = open_new(&mut fs, "f");
    fs.write(fd, &pattern(10)).unwrap();

    disk.fail_writes.store(true, Ordering::Relaxed);
    // 数据区始于3号块，文件的首块是1号数据块
    assert_eq!(
        Err(Error::Device(BlockError::Io { block_id: 4 })),
        fs.write(fd, &pattern(2 * BLOCK_SIZE))
    );
    // 大小与偏移量不变，延长的块被退还
    assert_eq!(10, fs.stat(fd).unwrap());
    assert_eq!(10, fs.tell(fd).unwrap());
    assert_eq!(6, fs.info().unwrap().fat_free);

    // 空文件首次写入失败时连首块也退还
    let other = open_new(&mut fs, "g");
    assert!(matches!(fs.write(other, b"x"), Err(Error::Device(_))));
    assert_eq!(None, fs.ls().unwrap()[1].first_block);

    disk.fail_writes.store(false, Ordering::Relaxed);
    fs.close(fd).unwrap();
    fs.close(other).unwrap();
    let dev = fs.unmount().unwrap();
    fs.mount(dev).unwrap();
    assert_eq!(Ok(10), fs.stat_by_name("f"));
}
