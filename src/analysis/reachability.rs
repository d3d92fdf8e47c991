//! 可达标识的有界广度优先枚举.
//!
//! 一旦将超过 `max_depth` 或 `max_states` 即停止扩展，并记入 `hit_limits`；
//! 触及上限是正常结果而非错误。无法表示的后继（托肯溢出）同样按触及上限处理。
//! 已访问集合对标识去重，每个标识至多扩展一次，其深度即到起始标识的最短距离。
use std::collections::{BTreeMap, VecDeque};

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::boundness::{self, PlaceVerdict, Verdict};
use crate::net::{FireError, Idx, Marking, Net, TransitionId, Weight};

/// 已访问标识按发现顺序的编号，起始标识为 `0`。
pub type StateIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExploreError {
    #[error("invalid exploration config: {0}")]
    InvalidConfig(String),
    #[error("start marking has {found} places but the net has {expected}")]
    ForeignMarking { expected: usize, found: usize },
    #[error(transparent)]
    Fire(#[from] FireError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreConfig {
    /// k-有界判定的阈值；为 `None` 时只报告观察到的界。
    #[serde(default)]
    pub k: Option<Weight>,
    pub max_depth: usize,
    pub max_states: usize,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            k: None,
            max_depth: 1_000,
            max_states: 10_000,
        }
    }
}

impl ExploreConfig {
    pub fn new(k: Option<Weight>, max_depth: usize, max_states: usize) -> Self {
        Self {
            k,
            max_depth,
            max_states,
        }
    }

    pub fn validate(&self) -> Result<(), ExploreError> {
        if self.max_depth == 0 {
            return Err(ExploreError::InvalidConfig(
                "maxDepth must be positive".into(),
            ));
        }
        if self.max_states == 0 {
            return Err(ExploreError::InvalidConfig(
                "maxStates must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// 搜索过程中的回调，默认实现均为空操作。
pub trait ExploreObserver {
    /// 新标识加入已访问集合。
    fn on_state(&mut self, _state: StateIndex, _marking: &Marking, _depth: usize) {}

    /// 在 `from` 中发射 `transition` 到达已访问状态 `to`。
    fn on_edge(&mut self, _from: StateIndex, _transition: TransitionId, _to: StateIndex) {}

    /// `state` 中没有可激发迁移。
    fn on_deadlock(&mut self, _state: StateIndex) {}
}

impl ExploreObserver for () {}

/// 搜索中找到的具体标识，以及从起始标识到达它的最短发射序列。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub marking: BTreeMap<String, Weight>,
    pub depth: usize,
    pub trace: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreReport {
    /// 是否存在没有可激发迁移的已访问标识。
    pub deadlocked: bool,
    pub is_k_bounded: Option<Verdict>,
    pub is_safe: Verdict,
    pub bound: Option<Weight>,
    pub per_place_max: BTreeMap<String, Weight>,
    pub place_verdicts: Vec<PlaceVerdict>,
    /// 各库所最大值中的最大者，即与已探索部分一致的最小 `k`。
    pub minimal_k_observed: Weight,
    pub explored_states: usize,
    pub depth_reached: usize,
    pub hit_limits: bool,
    pub k: Option<Weight>,
    pub deadlock_witness: Option<Witness>,
    pub k_witness: Option<Witness>,
    pub unsafe_witness: Option<Witness>,
}

#[derive(Debug, Clone, Copy)]
struct StateMeta {
    parent: Option<(StateIndex, TransitionId)>,
    depth: usize,
}

pub struct Explorer<'a> {
    net: &'a Net,
    config: ExploreConfig,
}

impl<'a> Explorer<'a> {
    pub fn new(net: &'a Net, config: ExploreConfig) -> Result<Self, ExploreError> {
        config.validate()?;
        Ok(Self { net, config })
    }

    pub fn run(&self, start: &Marking) -> Result<ExploreReport, ExploreError> {
        self.run_with(start, &mut ())
    }

    pub fn run_with<O>(&self, start: &Marking, observer: &mut O) -> Result<ExploreReport, ExploreError>
    where
        O: ExploreObserver + ?Sized,
    {
        let net = self.net;
        if start.len() != net.places_len() {
            return Err(ExploreError::ForeignMarking {
                expected: net.places_len(),
                found: start.len(),
            });
        }
        let ExploreConfig {
            k,
            max_depth,
            max_states,
        } = self.config;
        log::debug!(
            "exploring from {:?} (k={:?}, max_depth={}, max_states={})",
            start,
            k,
            max_depth,
            max_states
        );

        let mut states: IndexSet<Marking, FxBuildHasher> = IndexSet::default();
        let mut meta: Vec<StateMeta> = Vec::new();
        let mut frontier: VecDeque<StateIndex> = VecDeque::new();
        let mut per_place_max: Vec<Weight> = start.iter().map(|(_, tokens)| tokens).collect();
        let mut tracker = WitnessTracker::new(k);

        states.insert(start.clone());
        meta.push(StateMeta {
            parent: None,
            depth: 0,
        });
        tracker.observe(0, start);
        observer.on_state(0, start, 0);
        frontier.push_back(0);

        let mut deadlock_state = None;
        let mut depth_reached = 0;
        let mut hit_limits = false;

        while let Some(current) = frontier.pop_front() {
            let depth = meta[current].depth;
            depth_reached = depth_reached.max(depth);
            let Some(marking) = states.get_index(current).cloned() else {
                continue;
            };

            let enabled = net.enabled_transitions(&marking);
            if enabled.is_empty() {
                log::trace!("deadlock at state {} (depth {})", current, depth);
                deadlock_state.get_or_insert(current);
                observer.on_deadlock(current);
                continue;
            }

            for transition in enabled {
                let next = match net.fire_transition(&marking, transition) {
                    Ok(next) => next,
                    Err(FireError::TokenOverflow(place)) => {
                        log::warn!(
                            "firing {} overflows place {}; successor dropped",
                            net.transition_name(transition),
                            place
                        );
                        hit_limits = true;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };
                if let Some(known) = states.get_index_of(&next) {
                    observer.on_edge(current, transition, known);
                    continue;
                }
                if depth >= max_depth || states.len() >= max_states {
                    hit_limits = true;
                    continue;
                }

                for (place, tokens) in next.iter() {
                    let slot = &mut per_place_max[place.index()];
                    *slot = (*slot).max(tokens);
                }
                let (index, _) = states.insert_full(next);
                meta.push(StateMeta {
                    parent: Some((current, transition)),
                    depth: depth + 1,
                });
                if let Some(inserted) = states.get_index(index) {
                    tracker.observe(index, inserted);
                    observer.on_state(index, inserted, depth + 1);
                }
                observer.on_edge(current, transition, index);
                frontier.push_back(index);
            }
        }

        let exhaustive = !hit_limits;
        let summary = boundness::summarize(net, &per_place_max, k, exhaustive);
        let witness = |state: Option<StateIndex>| {
            state.and_then(|state| build_witness(net, &states, &meta, state))
        };

        let report = ExploreReport {
            deadlocked: deadlock_state.is_some(),
            is_k_bounded: summary.is_k_bounded,
            is_safe: summary.is_safe,
            bound: summary.bound,
            per_place_max: net
                .places()
                .map(|(place, p)| (p.id.clone(), per_place_max[place.index()]))
                .collect(),
            place_verdicts: summary.places,
            minimal_k_observed: summary.minimal_k_observed,
            explored_states: states.len(),
            depth_reached,
            hit_limits,
            k,
            deadlock_witness: witness(deadlock_state),
            k_witness: witness(tracker.exceeds_k),
            unsafe_witness: witness(tracker.unsafe_state),
        };

        log::info!(
            "explored {} states (depth {}), deadlocked={}, safe={}, hit_limits={}",
            report.explored_states,
            report.depth_reached,
            report.deadlocked,
            report.is_safe,
            report.hit_limits
        );
        Ok(report)
    }
}

/// 不带回调地执行一次完整探索。
pub fn explore(net: &Net, start: &Marking, config: ExploreConfig) -> Result<ExploreReport, ExploreError> {
    Explorer::new(net, config)?.run(start)
}

/// 最先破坏 k-有界性与安全性的已访问状态。
struct WitnessTracker {
    k: Option<Weight>,
    exceeds_k: Option<StateIndex>,
    unsafe_state: Option<StateIndex>,
}

impl WitnessTracker {
    fn new(k: Option<Weight>) -> Self {
        Self {
            k,
            exceeds_k: None,
            unsafe_state: None,
        }
    }

    fn observe(&mut self, state: StateIndex, marking: &Marking) {
        let max = marking.max_tokens();
        if self.unsafe_state.is_none() && max > 1 {
            self.unsafe_state = Some(state);
        }
        if let Some(k) = self.k {
            if self.exceeds_k.is_none() && max > k {
                self.exceeds_k = Some(state);
            }
        }
    }
}

fn build_witness(
    net: &Net,
    states: &IndexSet<Marking, FxBuildHasher>,
    meta: &[StateMeta],
    state: StateIndex,
) -> Option<Witness> {
    let marking = states.get_index(state)?;
    let mut trace = Vec::new();
    let mut cursor = state;
    while let Some((parent, transition)) = meta.get(cursor)?.parent {
        trace.push(net.transition_name(transition));
        cursor = parent;
    }
    trace.reverse();
    Some(Witness {
        marking: net.marking_to_map(marking),
        depth: meta.get(state)?.depth,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Arc, NetModel, Place, Transition};

    fn producer_consumer() -> Net {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("P1", 1))
            .add_place(Place::new("P2", 0))
            .add_transition(Transition::new("T1"))
            .add_arc(Arc::new("a1", "P1", "T1", 1))
            .add_arc(Arc::new("a2", "T1", "P2", 1));
        Net::new(&model).unwrap()
    }

    /// `gen` has no inputs and adds a token to `p` on every firing.
    fn generator() -> Net {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", 0))
            .add_transition(Transition::new("gen"))
            .add_arc(Arc::new("a", "gen", "p", 1));
        Net::new(&model).unwrap()
    }

    /// Two places passing one token back and forth.
    fn ping_pong() -> Net {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("ping", 1))
            .add_place(Place::new("pong", 0))
            .add_transition(Transition::new("hit"))
            .add_transition(Transition::new("back"))
            .add_arc(Arc::new("a1", "ping", "hit", 1))
            .add_arc(Arc::new("a2", "hit", "pong", 1))
            .add_arc(Arc::new("a3", "pong", "back", 1))
            .add_arc(Arc::new("a4", "back", "ping", 1));
        Net::new(&model).unwrap()
    }

    #[test]
    fn single_firing_net_is_explored_exactly() {
        let net = producer_consumer();
        let report = explore(
            &net,
            &net.initial_marking(),
            ExploreConfig::new(Some(1), 10, 10),
        )
        .unwrap();

        assert_eq!(report.explored_states, 2);
        assert!(report.deadlocked);
        assert_eq!(report.is_safe, Verdict::Yes);
        assert_eq!(report.is_k_bounded, Some(Verdict::Yes));
        assert!(!report.hit_limits);
        assert_eq!(report.depth_reached, 1);
        assert_eq!(report.bound, Some(1));

        let witness = report.deadlock_witness.unwrap();
        assert_eq!(witness.trace, vec!["T1".to_string()]);
        assert_eq!(witness.marking["P2"], 1);
    }

    #[test]
    fn state_limit_truncates_search() {
        let net = producer_consumer();
        let report = explore(
            &net,
            &net.initial_marking(),
            ExploreConfig::new(Some(1), 10, 1),
        )
        .unwrap();

        assert!(report.hit_limits);
        assert_eq!(report.explored_states, 1);
        assert_eq!(report.is_safe, Verdict::Unknown);
        assert_eq!(report.is_k_bounded, Some(Verdict::Unknown));
        assert!(!report.deadlocked);
    }

    #[test]
    fn unbounded_growth_is_no_with_witness_and_never_yes() {
        let net = generator();
        let report = explore(
            &net,
            &net.initial_marking(),
            ExploreConfig::new(Some(3), 50, 10),
        )
        .unwrap();

        assert!(report.hit_limits);
        assert_eq!(report.is_k_bounded, Some(Verdict::No));
        assert_eq!(report.is_safe, Verdict::No);
        assert_eq!(report.per_place_max["p"], 9);
        assert_eq!(report.minimal_k_observed, 9);

        let witness = report.k_witness.unwrap();
        assert_eq!(witness.marking["p"], 4);
        assert_eq!(witness.trace.len(), 4);
        assert_eq!(report.unsafe_witness.unwrap().depth, 2);
    }

    #[test]
    fn depth_limit_is_reported() {
        let net = generator();
        let report = explore(
            &net,
            &net.initial_marking(),
            ExploreConfig::new(Some(100), 3, 1_000),
        )
        .unwrap();

        assert!(report.hit_limits);
        assert_eq!(report.depth_reached, 3);
        assert_eq!(report.explored_states, 4);
        assert_eq!(report.is_k_bounded, Some(Verdict::Unknown));
    }

    #[test]
    fn overflowing_successor_counts_as_limit() {
        let net = generator();
        let start = Marking::from_vec(vec![Weight::MAX]);
        let report = explore(&net, &start, ExploreConfig::new(Some(3), 10, 10)).unwrap();

        assert!(report.hit_limits);
        assert_eq!(report.explored_states, 1);
        assert!(!report.deadlocked);
        assert_eq!(report.is_k_bounded, Some(Verdict::No));
        assert_eq!(report.bound, None);
        let witness = report.k_witness.unwrap();
        assert_eq!(witness.depth, 0);
        assert!(witness.trace.is_empty());
        assert_eq!(witness.marking["p"], Weight::MAX);
    }

    #[test]
    fn cyclic_net_is_exhausted_without_deadlock() {
        let net = ping_pong();
        let report = explore(&net, &net.initial_marking(), ExploreConfig::default()).unwrap();

        assert_eq!(report.explored_states, 2);
        assert!(!report.deadlocked);
        assert!(!report.hit_limits);
        assert_eq!(report.is_safe, Verdict::Yes);
        assert_eq!(report.is_k_bounded, None);
        assert!(report.deadlock_witness.is_none());
    }

    #[test]
    fn self_loop_keeps_token_count_constant() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", 1))
            .add_transition(Transition::new("t"))
            .add_arc(Arc::new("in", "p", "t", 1))
            .add_arc(Arc::new("out", "t", "p", 1));
        let net = Net::new(&model).unwrap();
        let report = explore(&net, &net.initial_marking(), ExploreConfig::default()).unwrap();

        assert_eq!(report.explored_states, 1);
        assert_eq!(report.per_place_max["p"], 1);
        assert!(!report.deadlocked);
        assert!(!report.hit_limits);
    }

    #[test]
    fn exact_verdicts_do_not_change_with_larger_limits() {
        let net = ping_pong();
        let small = explore(&net, &net.initial_marking(), ExploreConfig::new(Some(1), 5, 5)).unwrap();
        let large =
            explore(&net, &net.initial_marking(), ExploreConfig::new(Some(1), 500, 500)).unwrap();
        assert!(!small.hit_limits);
        assert_eq!(small.is_k_bounded, large.is_k_bounded);
        assert_eq!(small.is_safe, large.is_safe);
        assert_eq!(small.per_place_max, large.per_place_max);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let net = producer_consumer();
        let start = net.initial_marking();
        assert!(matches!(
            explore(&net, &start, ExploreConfig::new(None, 0, 10)),
            Err(ExploreError::InvalidConfig(_))
        ));
        assert!(matches!(
            explore(&net, &start, ExploreConfig::new(None, 10, 0)),
            Err(ExploreError::InvalidConfig(_))
        ));
    }

    #[derive(Default)]
    struct Counter {
        states: usize,
        edges: usize,
        deadlocks: usize,
    }

    impl ExploreObserver for Counter {
        fn on_state(&mut self, _: StateIndex, _: &Marking, _: usize) {
            self.states += 1;
        }
        fn on_edge(&mut self, _: StateIndex, _: TransitionId, _: StateIndex) {
            self.edges += 1;
        }
        fn on_deadlock(&mut self, _: StateIndex) {
            self.deadlocks += 1;
        }
    }

    #[test]
    fn observer_sees_every_state_and_edge() {
        let net = ping_pong();
        let explorer = Explorer::new(&net, ExploreConfig::default()).unwrap();
        let mut counter = Counter::default();
        let report = explorer.run_with(&net.initial_marking(), &mut counter).unwrap();
        assert_eq!(counter.states, report.explored_states);
        assert_eq!(counter.edges, 2);
        assert_eq!(counter.deadlocks, 0);
    }
}
