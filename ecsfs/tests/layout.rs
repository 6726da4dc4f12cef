mod common;

use std::sync::Arc;

use ecsfs::config::{BLOCK_SIZE, DIR_ENTRY_SIZE, SIGNATURE};
use ecsfs::{BlockDevice, Error, FileSystem, RamDisk};

use common::{formatted_disk, mounted, pattern};

#[test]
fn format_image() {
    let disk = formatted_disk(8192);
    let image = disk.image();
    assert_eq!(8198 * BLOCK_SIZE, image.len());

    // 超级块
    assert_eq!(SIGNATURE, &image[..8]);
    assert_eq!([0x06_u8, 0x20, 0x05, 0x00, 0x06, 0x00, 0x00, 0x20, 0x04], image[8..17]);
    assert!(image[17..BLOCK_SIZE].iter().all(|&b| b == 0));

    // FAT区：仅0号条目为链尾
    let fat = &image[BLOCK_SIZE..5 * BLOCK_SIZE];
    assert_eq!([0xFF_u8, 0xFF], fat[..2]);
    assert!(fat[2..].iter().all(|&b| b == 0));

    // 根目录：空槽的首块号为链尾
    let root = &image[5 * BLOCK_SIZE..6 * BLOCK_SIZE];
    for record in root.chunks_exact(DIR_ENTRY_SIZE) {
        assert!(record[..20].iter().all(|&b| b == 0));
        assert_eq!([0xFF_u8, 0xFF], record[20..22]);
        assert!(record[22..].iter().all(|&b| b == 0));
    }
}

#[test]
fn format_rejects_size_mismatch() {
    let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(12));
    assert_eq!(Err(Error::FormatInvalid), FileSystem::format(&dev, 8));
    assert_eq!(Err(Error::FormatInvalid), FileSystem::format(&dev, 0));
}

#[test]
fn flushed_records() {
    let (mut fs, disk) = mounted(8);
    fs.create("a.txt").unwrap();
    fs.create("b").unwrap();
    let fd = fs.open("b").unwrap();
    assert_eq!(BLOCK_SIZE + 3, fs.write(fd, &pattern(BLOCK_SIZE + 3)).unwrap());
    fs.close(fd).unwrap();
    fs.sync().unwrap();

    let image = disk.image();
    // 8个数据块占1块FAT，根目录位于2号块，数据区始于3号块
    let fat = &image[BLOCK_SIZE..2 * BLOCK_SIZE];
    assert_eq!([0xFF_u8, 0xFF, 0x02, 0x00, 0xFF, 0xFF, 0x00, 0x00], fat[..8]);

    let root = &image[2 * BLOCK_SIZE..3 * BLOCK_SIZE];
    assert_eq!(b"a.txt\0\0\0\0\0\0\0\0\0\0\0", &root[..16]);
    assert_eq!([0_u8; 4], root[16..20]);
    assert_eq!([0xFF_u8, 0xFF], root[20..22]);

    let record = &root[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE];
    assert_eq!(b"b\0", &record[..2]);
    assert_eq!(((BLOCK_SIZE + 3) as u32).to_le_bytes(), record[16..20]);
    assert_eq!([0x01_u8, 0x00], record[20..22]);

    // 文件内容依块链存放在数据区的1、2号块
    let data = pattern(BLOCK_SIZE + 3);
    assert_eq!(data[..BLOCK_SIZE], image[4 * BLOCK_SIZE..5 * BLOCK_SIZE]);
    assert_eq!(data[BLOCK_SIZE..], image[5 * BLOCK_SIZE..5 * BLOCK_SIZE + 3]);
}

#[test]
fn info() {
    let (fs, _) = mounted(8192);
    let info = fs.info().unwrap();
    assert_eq!(8198, info.total_blocks);
    assert_eq!(8191, info.fat_free);
    assert_eq!(
        "FS Info:\n\
         total_blk_count=8198\n\
         fat_blk_count=4\n\
         rdir_blk=5\n\
         data_blk=6\n\
         data_blk_count=8192\n\
         fat_free_ratio=8191/8192\n\
         rdir_free_ratio=128/128",
        info.to_string()
    );
}

#[test]
fn listing() {
    let (mut fs, _) = mounted(8);
    fs.create("empty").unwrap();
    fs.create("data").unwrap();
    let fd = fs.open("data").unwrap();
    fs.write(fd, b"hello").unwrap();

    let lines: Vec<_> = fs.ls().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(
        [
            "file: empty, size: 0, data_blk: 65535",
            "file: data, size: 5, data_blk: 1",
        ],
        lines[..]
    );
}
