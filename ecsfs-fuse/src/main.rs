mod block_file;
mod cli;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use block_dev::{BlockDevice, BLOCK_SIZE};
use clap::Parser;
use ecsfs::volume::super_block::SuperBlock;
use ecsfs::FileSystem;
use typed_bytesize::ByteSizeIec;

use self::block_file::BlockFile;
use self::cli::{Cli, Command, VolumeCommand};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("image={:?}", cli.image);

    match cli.command {
        Command::Format { data_blocks } => format(&cli.image, data_blocks),
        Command::Volume(command) => {
            let dev = BlockFile::open(&cli.image)
                .with_context(|| format!("cannot open {:?}", cli.image))?;
            let mut fs = FileSystem::new();
            fs.mount(Arc::new(dev))
                .with_context(|| format!("cannot mount {:?}", cli.image))?;

            run(&mut fs, command)?;
            fs.unmount()?;
            Ok(())
        }
    }
}

/// 给定数据块数时新建恰好容纳它的镜像，否则按已有镜像的块数选取数据块数
fn format(image: &Path, data_blocks: Option<usize>) -> Result<()> {
    let (dev, data_blocks) = match data_blocks {
        Some(data_blocks) => {
            let total = SuperBlock::with_data_blocks(data_blocks)
                .with_context(|| format!("cannot lay out {data_blocks} data blocks"))?
                .total_blocks();
            let dev = BlockFile::create(image, total)
                .with_context(|| format!("cannot create {image:?}"))?;
            (dev, data_blocks)
        }
        None => {
            let dev = BlockFile::open(image).with_context(|| format!("cannot open {image:?}"))?;
            let Some(data_blocks) = SuperBlock::fit(dev.block_count()) else {
                bail!(
                    "no volume layout fills the {} blocks of {image:?}",
                    dev.block_count()
                );
            };
            (dev, data_blocks)
        }
    };

    let total = dev.block_count();
    let dev: Arc<dyn BlockDevice> = Arc::new(dev);
    FileSystem::format(&dev, data_blocks)?;

    println!(
        "formatted {image:?}: {total} blocks, {data_blocks} data blocks, {}",
        ByteSizeIec((total * BLOCK_SIZE) as u64)
    );
    Ok(())
}

fn run(fs: &mut FileSystem, command: VolumeCommand) -> Result<()> {
    match command {
        VolumeCommand::Info => println!("{}", fs.info()?),
        VolumeCommand::Ls => {
            println!("FS Ls:");
            for file in fs.ls()? {
                println!("{file}");
            }
        }
        VolumeCommand::Add { source, name } => {
            let name = match name {
                Some(name) => name,
                None => source
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(String::from)
                    .with_context(|| format!("{source:?} has no usable file name"))?,
            };
            let data = std::fs::read(&source).with_context(|| format!("cannot read {source:?}"))?;

            fs.create(&name)?;
            let fd = fs.open(&name)?;
            let written = fs.write(fd, &data)?;
            fs.close(fd)?;

            println!("wrote {written} bytes to {name:?}");
            if written < data.len() {
                log::warn!("disk full, {} bytes left out", data.len() - written);
            }
        }
        VolumeCommand::Cat { name } => {
            let fd = fs.open(&name)?;
            let mut data = vec![0; fs.stat(fd)?];
            let read = fs.read(fd, &mut data)?;
            fs.close(fd)?;
            if read != data.len() {
                bail!("short read of {name:?}: {read} of {} bytes", data.len());
            }
            io::stdout().write_all(&data)?;
        }
        VolumeCommand::Rm { name } => fs.delete(&name)?,
        VolumeCommand::Stat { name } => {
            let size = fs.stat_by_name(&name)?;
            println!("{name}: {size} bytes ({})", ByteSizeIec(size as u64));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_image(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ecsfs-fuse-{tag}-{}.img", std::process::id()))
    }

    fn data_blocks(image: &Path) -> usize {
        let mut fs = FileSystem::new();
        fs.mount(Arc::new(BlockFile::open(image).unwrap())).unwrap();
        fs.info().unwrap().data_blocks
    }

    #[test]
    fn format_new_image() {
        let image = temp_image("new");
        format(&image, Some(8)).unwrap();
        assert_eq!(11 * BLOCK_SIZE as u64, std::fs::metadata(&image).unwrap().len());
        assert_eq!(8, data_blocks(&image));
        std::fs::remove_file(&image).unwrap();
    }

    #[test]
    fn format_in_place() {
        let image = temp_image("in-place");
        BlockFile::create(&image, 2053).unwrap();
        format(&image, None).unwrap();
        assert_eq!(2049, data_blocks(&image));

        // 2052个块无法被恰好占满
        BlockFile::create(&image, 2052).unwrap();
        assert!(format(&image, None).is_err());
        std::fs::remove_file(&image).unwrap();
    }
}
