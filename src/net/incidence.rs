//! 按变迁索引的稀疏前置/后置关系.
//!
//! `Pre(t)` 与 `Post(t)` 存为 `(库所, 权重)` 短列表，使可激发判定与发射
//! 的代价均为 `O(|t 的弧数|)`。
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::{ArcDirection, Weight};

pub type ArcList = SmallVec<[(PlaceId, Weight); 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incidence {
    pre: IndexVec<TransitionId, ArcList>,
    post: IndexVec<TransitionId, ArcList>,
}

impl Incidence {
    pub fn new(transitions: usize) -> Self {
        Self {
            pre: IndexVec::from_elem(ArcList::new(), transitions),
            post: IndexVec::from_elem(ArcList::new(), transitions),
        }
    }

    /// 在 `place` 与 `transition` 之间的弧上累加 `weight`；同向平行弧权重相加。
    pub fn add(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        weight: Weight,
        direction: ArcDirection,
    ) {
        let list = match direction {
            ArcDirection::PlaceToTransition => &mut self.pre[transition],
            ArcDirection::TransitionToPlace => &mut self.post[transition],
        };
        match list.iter_mut().find(|(p, _)| *p == place) {
            Some((_, existing)) => *existing = existing.saturating_add(weight),
            None => list.push((place, weight)),
        }
    }

    pub fn inputs(&self, transition: TransitionId) -> &[(PlaceId, Weight)] {
        &self.pre[transition]
    }

    pub fn outputs(&self, transition: TransitionId) -> &[(PlaceId, Weight)] {
        &self.post[transition]
    }

    /// 输入弧 `place -> transition` 的权重，不存在时为 0。
    pub fn input_weight(&self, place: PlaceId, transition: TransitionId) -> Weight {
        weight_in(self.inputs(transition), place)
    }

    pub fn output_weight(&self, place: PlaceId, transition: TransitionId) -> Weight {
        weight_in(self.outputs(transition), place)
    }

    /// 与 `transition` 相邻的库所（任一方向）。
    pub fn adjacent_places(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.inputs(transition)
            .iter()
            .chain(self.outputs(transition))
            .map(|(place, _)| *place)
    }
}

fn weight_in(list: &[(PlaceId, Weight)], place: PlaceId) -> Weight {
    list.iter()
        .find(|(p, _)| *p == place)
        .map(|(_, w)| *w)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::index_vec::Idx;

    #[test]
    fn parallel_arcs_accumulate() {
        let p = PlaceId::from_usize(0);
        let t = TransitionId::from_usize(0);
        let mut incidence = Incidence::new(1);
        incidence.add(p, t, 1, ArcDirection::PlaceToTransition);
        incidence.add(p, t, 2, ArcDirection::PlaceToTransition);
        incidence.add(p, t, 1, ArcDirection::TransitionToPlace);

        assert_eq!(incidence.input_weight(p, t), 3);
        assert_eq!(incidence.output_weight(p, t), 1);
        assert_eq!(incidence.inputs(t).len(), 1);
        assert_eq!(incidence.adjacent_places(t).count(), 2);
    }
}
