//! 编译模型时分配给库所与迁移的稠密索引。
//!
//! 索引即声明顺序中的位置，只对产生它们的 [`Net`](crate::net::Net) 有意义；
//! 对外接口始终使用模型中的字符串 id。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::index_vec::Idx;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }

        impl Idx for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_usize(idx: usize) -> Self {
                match u32::try_from(idx) {
                    Ok(raw) => Self(raw),
                    Err(_) => panic!(concat!(stringify!($name), " {} exceeds u32"), idx),
                }
            }
        }
    };
}

define_id!(PlaceId, "p#");
define_id!(TransitionId, "t#");
