use core::fmt;

use derive_more::{From, Into};

/// 数据块在数据区内的编号，同时也是其FAT条目的索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct ClusterId(u16);

impl From<ClusterId> for usize {
    fn from(id: ClusterId) -> Self {
        id.0 as usize
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ClusterId {
    /// 0号条目保留，恒为链尾，从不分配给文件
    pub const RESERVED: Self = Self(0);

    /// 最小的可分配编号
    pub const MIN: Self = Self(1);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// FAT条目
///
/// 磁盘上`0`表示空闲，`0xFFFF`表示链尾，其余值为下一块的编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FatEntry {
    #[default]
    Free,
    EndOfChain,
    Next(ClusterId),
}

impl FatEntry {
    pub const FREE_RAW: u16 = 0;

    pub const EOC_RAW: u16 = 0xFFFF;

    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            Self::FREE_RAW => Self::Free,
            Self::EOC_RAW => Self::EndOfChain,
            next => Self::Next(ClusterId(next)),
        }
    }

    pub const fn into_raw(self) -> u16 {
        match self {
            Self::Free => Self::FREE_RAW,
            Self::EndOfChain => Self::EOC_RAW,
            Self::Next(ClusterId(next)) => next,
        }
    }

    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}
