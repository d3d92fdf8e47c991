//! 标识：编译后网中每个库所的托肯数。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::ids::PlaceId;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::Weight;

/// 按所属网的库所顺序存储的稠密标识。
///
/// 相等与哈希只依赖稠密向量，因此由键序不同的映射构造的两个标识，
/// 只要各库所托肯数一致即相等。
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking(Vec<Weight>);

impl Marking {
    pub fn new(tokens: IndexVec<PlaceId, Weight>) -> Self {
        Self(tokens.as_slice().to_vec())
    }

    /// 按库所顺序给出的托肯数。
    pub fn from_vec(tokens: Vec<Weight>) -> Self {
        Self(tokens)
    }

    pub fn zeroed(places: usize) -> Self {
        Self(vec![0; places])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0.get(place.index()).copied().unwrap_or(0)
    }

    pub(crate) fn tokens_mut(&mut self, place: PlaceId) -> Option<&mut Weight> {
        self.0.get_mut(place.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Weight)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, tokens)| (PlaceId::from_usize(idx), *tokens))
    }

    /// 单个库所持有的最大托肯数。
    pub fn max_tokens(&self) -> Weight {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, &tokens);
        }
        map.finish()
    }
}
