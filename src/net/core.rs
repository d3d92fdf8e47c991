//! 编译后的网：结构校验、可发生集与发生语义。
use std::collections::BTreeMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::Idx;
use crate::net::marking::Marking;
use crate::net::structure::{ArcDirection, NetModel, Place, Transition, Weight};

/// 结构校验失败；任一错误都会拒绝整个模型。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("node id '{0}' is declared more than once")]
    DuplicateNode(String),
    #[error("arc id '{0}' is declared more than once")]
    DuplicateArc(String),
    #[error("arc '{arc}' references unknown node '{node}'")]
    DanglingArc { arc: String, node: String },
    #[error("arc '{arc}' must connect a place and a transition (got {src} -> {dst})")]
    InvalidArc {
        arc: String,
        src: String,
        dst: String,
    },
    #[error("arc '{0}' has weight 0; weights must be at least 1")]
    ZeroWeight(String),
    #[error("{count} {kind} exceed the supported index range")]
    TooManyNodes { kind: &'static str, count: usize },
}

/// 标识符为 `u32`，超出范围的节点数在此拒绝，不在后续截断。
fn check_index_space(kind: &'static str, count: usize) -> Result<(), NetError> {
    u32::try_from(count)
        .map(|_| ())
        .map_err(|_| NetError::TooManyNodes { kind, count })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkingError {
    #[error("unknown place '{0}'")]
    UnknownPlace(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("unknown transition '{0}'")]
    UnknownTransition(String),
    #[error("transition '{0}' is not enabled under the supplied marking")]
    NotEnabled(String),
    #[error("firing would overflow the token count of place '{0}'")]
    TokenOverflow(String),
    #[error("marking has {found} places but the net has {expected}")]
    ForeignMarking { expected: usize, found: usize },
}

/// Petri 网连通性诊断报告：孤立节点，以及在任意标识下均可发射的迁移。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub isolated_places: Vec<String>,
    pub isolated_transitions: Vec<String>,
    pub source_transitions: Vec<String>,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.source_transitions.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Node {
    Place(PlaceId),
    Transition(TransitionId),
}

/// 已校验的网。库所与迁移的索引沿用源模型中的声明顺序。
#[derive(Debug, Clone)]
pub struct Net {
    places: IndexMap<String, Place>,
    transitions: IndexMap<String, Transition>,
    incidence: Incidence,
}

impl Net {
    pub fn new(model: &NetModel) -> Result<Self, NetError> {
        let mut places = IndexMap::with_capacity(model.places.len());
        for place in &model.places {
            match places.entry(place.id.clone()) {
                Entry::Occupied(_) => return Err(NetError::DuplicateNode(place.id.clone())),
                Entry::Vacant(entry) => {
                    entry.insert(place.clone());
                }
            }
        }

        let mut transitions = IndexMap::with_capacity(model.transitions.len());
        for transition in &model.transitions {
            if places.contains_key(&transition.id) {
                return Err(NetError::DuplicateNode(transition.id.clone()));
            }
            match transitions.entry(transition.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(NetError::DuplicateNode(transition.id.clone()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(transition.clone());
                }
            }
        }

        check_index_space("places", places.len())?;
        check_index_space("transitions", transitions.len())?;

        let lookup = |id: &str| -> Option<Node> {
            if let Some(idx) = places.get_index_of(id) {
                Some(Node::Place(PlaceId::from_usize(idx)))
            } else {
                transitions
                    .get_index_of(id)
                    .map(|idx| Node::Transition(TransitionId::from_usize(idx)))
            }
        };

        let mut incidence = Incidence::new(transitions.len());
        let mut arc_ids = FxHashSet::default();
        for arc in &model.arcs {
            if !arc_ids.insert(arc.id.as_str()) {
                return Err(NetError::DuplicateArc(arc.id.clone()));
            }
            let dangling = |node: &str| NetError::DanglingArc {
                arc: arc.id.clone(),
                node: node.to_owned(),
            };
            let src = lookup(&arc.src).ok_or_else(|| dangling(&arc.src))?;
            let dst = lookup(&arc.dst).ok_or_else(|| dangling(&arc.dst))?;
            let (place, transition, direction) = match (src, dst) {
                (Node::Place(p), Node::Transition(t)) => (p, t, ArcDirection::PlaceToTransition),
                (Node::Transition(t), Node::Place(p)) => (p, t, ArcDirection::TransitionToPlace),
                _ => {
                    return Err(NetError::InvalidArc {
                        arc: arc.id.clone(),
                        src: arc.src.clone(),
                        dst: arc.dst.clone(),
                    });
                }
            };
            if arc.weight == 0 {
                return Err(NetError::ZeroWeight(arc.id.clone()));
            }
            incidence.add(place, transition, arc.weight, direction);
        }

        log::debug!(
            "compiled net with {} places, {} transitions, {} arcs",
            places.len(),
            transitions.len(),
            model.arcs.len()
        );

        Ok(Self {
            places,
            transitions,
            incidence,
        })
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place_id(&self, id: &str) -> Option<PlaceId> {
        self.places.get_index_of(id).map(PlaceId::from_usize)
    }

    pub fn transition_id(&self, id: &str) -> Option<TransitionId> {
        self.transitions
            .get_index_of(id)
            .map(TransitionId::from_usize)
    }

    pub fn place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get_index(place.index()).map(|(_, p)| p)
    }

    pub fn transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions
            .get_index(transition.index())
            .map(|(_, t)| t)
    }

    /// 库所的字符串 id；越界索引以索引本身显示。
    pub fn place_name(&self, place: PlaceId) -> String {
        self.place(place)
            .map(|p| p.id.clone())
            .unwrap_or_else(|| place.to_string())
    }

    pub fn transition_name(&self, transition: TransitionId) -> String {
        self.transition(transition)
            .map(|t| t.id.clone())
            .unwrap_or_else(|| transition.to_string())
    }

    pub fn places(&self) -> impl Iterator<Item = (PlaceId, &Place)> + '_ {
        self.places
            .values()
            .enumerate()
            .map(|(idx, p)| (PlaceId::from_usize(idx), p))
    }

    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> + '_ {
        self.transitions
            .values()
            .enumerate()
            .map(|(idx, t)| (TransitionId::from_usize(idx), t))
    }

    pub fn incidence(&self) -> &Incidence {
        &self.incidence
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(self.places.values().map(|p| p.tokens).collect())
    }

    /// 由稀疏标识构造稠密标识，`map` 中缺失的库所为 0。
    pub fn marking_from_map(&self, map: &BTreeMap<String, Weight>) -> Result<Marking, MarkingError> {
        let mut marking = Marking::zeroed(self.places_len());
        for (id, tokens) in map {
            let slot = self
                .place_id(id)
                .and_then(|place| marking.tokens_mut(place))
                .ok_or_else(|| MarkingError::UnknownPlace(id.clone()))?;
            *slot = *tokens;
        }
        Ok(marking)
    }

    pub fn marking_to_map(&self, marking: &Marking) -> BTreeMap<String, Weight> {
        self.places
            .keys()
            .enumerate()
            .map(|(idx, id)| (id.clone(), marking.tokens(PlaceId::from_usize(idx))))
            .collect()
    }

    pub fn is_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        if transition.index() >= self.transitions_len() {
            return false;
        }
        self.incidence
            .inputs(transition)
            .iter()
            .all(|&(place, weight)| marking.tokens(place) >= weight)
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        (0..self.transitions_len())
            .map(TransitionId::from_usize)
            .filter(|&t| self.is_enabled(t, marking))
            .collect()
    }

    pub fn enabled_ids(&self, marking: &Marking) -> Vec<String> {
        self.enabled_transitions(marking)
            .into_iter()
            .map(|t| self.transition_name(t))
            .collect()
    }

    /// 应用发生规则。输入标识不会被修改；出错时不产生后继标识。
    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        if transition.index() >= self.transitions_len() {
            return Err(FireError::UnknownTransition(transition.to_string()));
        }
        if marking.len() != self.places_len() {
            return Err(FireError::ForeignMarking {
                expected: self.places_len(),
                found: marking.len(),
            });
        }
        if !self.is_enabled(transition, marking) {
            return Err(FireError::NotEnabled(self.transition_name(transition)));
        }

        let mut next = marking.clone();
        for &(place, weight) in self.incidence.inputs(transition) {
            let tokens = next
                .tokens_mut(place)
                .ok_or_else(|| FireError::NotEnabled(self.transition_name(transition)))?;
            *tokens = tokens
                .checked_sub(weight)
                .ok_or_else(|| FireError::NotEnabled(self.transition_name(transition)))?;
        }
        for &(place, weight) in self.incidence.outputs(transition) {
            let overflow = || FireError::TokenOverflow(self.place_name(place));
            let tokens = next.tokens_mut(place).ok_or_else(overflow)?;
            *tokens = tokens.checked_add(weight).ok_or_else(overflow)?;
        }
        Ok(next)
    }

    /// 以字符串 id 调用 [`fire_transition`](Self::fire_transition)。
    pub fn fire(&self, marking: &Marking, transition: &str) -> Result<Marking, FireError> {
        let id = self
            .transition_id(transition)
            .ok_or_else(|| FireError::UnknownTransition(transition.to_owned()))?;
        self.fire_transition(marking, id)
    }

    pub fn diagnose(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();
        let mut connected = vec![false; self.places_len()];
        for (transition, t) in self.transitions() {
            let inputs = self.incidence.inputs(transition);
            let outputs = self.incidence.outputs(transition);
            if inputs.is_empty() && outputs.is_empty() {
                report.isolated_transitions.push(t.id.clone());
            } else if inputs.is_empty() {
                report.source_transitions.push(t.id.clone());
            }
            for place in self.incidence.adjacent_places(transition) {
                connected[place.index()] = true;
            }
        }
        for (place, p) in self.places() {
            if !connected[place.index()] {
                report.isolated_places.push(p.id.clone());
            }
        }
        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose();
        if !report.has_issues() {
            log::info!("net structure check passed");
            return;
        }
        for id in &report.isolated_places {
            log::warn!("place '{}' has no arcs", id);
        }
        for id in &report.isolated_transitions {
            log::warn!("transition '{}' has no arcs and is always enabled", id);
        }
        for id in &report.source_transitions {
            log::warn!(
                "transition '{}' has no input arcs; it is enabled in every marking",
                id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::Arc;

    fn producer_consumer() -> NetModel {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("P1", 1))
            .add_place(Place::new("P2", 0))
            .add_transition(Transition::new("T1"))
            .add_arc(Arc::new("a1", "P1", "T1", 1))
            .add_arc(Arc::new("a2", "T1", "P2", 1));
        model
    }

    #[test]
    fn fire_moves_tokens_along_arcs() {
        let net = Net::new(&producer_consumer()).unwrap();
        let m0 = net.initial_marking();
        assert_eq!(net.enabled_ids(&m0), vec!["T1".to_string()]);

        let m1 = net.fire(&m0, "T1").unwrap();
        let map = net.marking_to_map(&m1);
        assert_eq!(map["P1"], 0);
        assert_eq!(map["P2"], 1);
        assert!(net.enabled_transitions(&m1).is_empty());
    }

    #[test]
    fn overflowing_output_fails_without_side_effects() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", Weight::MAX))
            .add_transition(Transition::new("gen"))
            .add_arc(Arc::new("a", "gen", "p", 1));
        let net = Net::new(&model).unwrap();
        let full = net.initial_marking();
        let before = full.clone();
        assert_eq!(
            net.fire(&full, "gen"),
            Err(FireError::TokenOverflow("p".into()))
        );
        assert_eq!(full, before);
    }

    #[test]
    fn node_counts_must_fit_ids() {
        assert_eq!(check_index_space("places", 3), Ok(()));
        assert_eq!(check_index_space("places", u32::MAX as usize), Ok(()));
        if let Some(count) = (u32::MAX as usize).checked_add(1) {
            assert_eq!(
                check_index_space("transitions", count),
                Err(NetError::TooManyNodes {
                    kind: "transitions",
                    count,
                })
            );
        }
    }

    #[test]
    fn firing_disabled_transition_fails_without_side_effects() {
        let net = Net::new(&producer_consumer()).unwrap();
        let empty = Marking::zeroed(net.places_len());
        let before = empty.clone();
        assert_eq!(
            net.fire(&empty, "T1"),
            Err(FireError::NotEnabled("T1".into()))
        );
        assert_eq!(empty, before);
        assert_eq!(
            net.fire(&empty, "T9"),
            Err(FireError::UnknownTransition("T9".into()))
        );
    }

    #[test]
    fn weighted_arcs_require_enough_tokens() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", 1))
            .add_place(Place::new("q", 0))
            .add_transition(Transition::new("t"))
            .add_arc(Arc::new("in", "p", "t", 2))
            .add_arc(Arc::new("out", "t", "q", 3));
        let net = Net::new(&model).unwrap();
        let m0 = net.initial_marking();
        assert!(net.enabled_transitions(&m0).is_empty());

        let mut tokens = BTreeMap::new();
        tokens.insert("p".to_string(), 5);
        let m = net.marking_from_map(&tokens).unwrap();
        let next = net.fire(&m, "t").unwrap();
        assert_eq!(net.marking_to_map(&next)["p"], 3);
        assert_eq!(net.marking_to_map(&next)["q"], 3);
    }

    #[test]
    fn transition_without_inputs_is_always_enabled() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", 0))
            .add_transition(Transition::new("gen"))
            .add_arc(Arc::new("a", "gen", "p", 1));
        let net = Net::new(&model).unwrap();
        let m = Marking::zeroed(1);
        assert_eq!(net.enabled_ids(&m), vec!["gen".to_string()]);
        assert_eq!(net.diagnose().source_transitions, vec!["gen".to_string()]);
    }

    #[test]
    fn enabled_query_is_stable() {
        let net = Net::new(&producer_consumer()).unwrap();
        let m = net.initial_marking();
        assert_eq!(net.enabled_transitions(&m), net.enabled_transitions(&m));
    }

    #[test]
    fn structural_errors_are_reported() {
        let mut dangling = producer_consumer();
        dangling.add_arc(Arc::new("a3", "T1", "P9", 1));
        assert_eq!(
            Net::new(&dangling).unwrap_err(),
            NetError::DanglingArc {
                arc: "a3".into(),
                node: "P9".into()
            }
        );

        let mut place_to_place = producer_consumer();
        place_to_place.add_arc(Arc::new("a3", "P1", "P2", 1));
        assert!(matches!(
            Net::new(&place_to_place),
            Err(NetError::InvalidArc { .. })
        ));

        let mut duplicate = producer_consumer();
        duplicate.add_transition(Transition::new("P1"));
        assert_eq!(
            Net::new(&duplicate).unwrap_err(),
            NetError::DuplicateNode("P1".into())
        );

        let mut zero = producer_consumer();
        zero.arcs[0].weight = 0;
        assert_eq!(
            Net::new(&zero).unwrap_err(),
            NetError::ZeroWeight("a1".into())
        );

        let mut same_arc = producer_consumer();
        same_arc.add_arc(Arc::new("a1", "P1", "T1", 1));
        assert_eq!(
            Net::new(&same_arc).unwrap_err(),
            NetError::DuplicateArc("a1".into())
        );
    }

    #[test]
    fn sparse_markings_fill_missing_places_with_zero() {
        let net = Net::new(&producer_consumer()).unwrap();
        let mut map = BTreeMap::new();
        map.insert("P2".to_string(), 4);
        let m = net.marking_from_map(&map).unwrap();
        assert_eq!(m.tokens(net.place_id("P1").unwrap()), 0);
        assert_eq!(m.tokens(net.place_id("P2").unwrap()), 4);

        map.insert("nope".to_string(), 1);
        assert_eq!(
            net.marking_from_map(&map),
            Err(MarkingError::UnknownPlace("nope".into()))
        );
    }

    #[test]
    fn firing_only_touches_adjacent_places() {
        let mut model = producer_consumer();
        model.add_place(Place::new("bystander", 7));
        let net = Net::new(&model).unwrap();
        let before = net.initial_marking();
        let after = net.fire(&before, "T1").unwrap();
        let t = net.transition_id("T1").unwrap();
        let adjacent: Vec<_> = net.incidence().adjacent_places(t).collect();
        for (place, tokens) in before.iter() {
            if !adjacent.contains(&place) {
                assert_eq!(after.tokens(place), tokens);
            }
        }
    }

    #[test]
    fn foreign_marking_is_rejected() {
        let net = Net::new(&producer_consumer()).unwrap();
        let t = net.transition_id("T1").unwrap();
        assert_eq!(
            net.fire_transition(&Marking::zeroed(5), t),
            Err(FireError::ForeignMarking {
                expected: 2,
                found: 5
            })
        );
    }
}
