//! 探索过程中记录的可达图，支持 DOT 导出。
use std::fs;
use std::path::Path;

use itertools::Itertools;
use petgraph::Graph;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, NodeIndex};
use rustc_hash::FxHashSet;

use crate::analysis::reachability::{
    ExploreConfig, ExploreError, ExploreObserver, ExploreReport, Explorer, StateIndex,
};
use crate::net::{Marking, Net, TransitionId};

#[derive(Debug, Clone)]
pub struct StateNode {
    pub index: StateIndex,
    pub depth: usize,
    pub marking: Marking,
    /// 每个非空库所的 `库所:托肯数`。
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct StateEdge {
    pub transition: TransitionId,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct StateGraph {
    pub graph: Graph<StateNode, StateEdge>,
    pub deadlocks: FxHashSet<NodeIndex>,
}

struct Recorder<'a> {
    net: &'a Net,
    graph: Graph<StateNode, StateEdge>,
    nodes: Vec<NodeIndex>,
    deadlocks: FxHashSet<NodeIndex>,
}

impl ExploreObserver for Recorder<'_> {
    fn on_state(&mut self, state: StateIndex, marking: &Marking, depth: usize) {
        let label = marking
            .iter()
            .filter(|(_, tokens)| *tokens > 0)
            .map(|(place, tokens)| format!("{}:{}", self.net.place_name(place), tokens))
            .join(", ");
        let node = self.graph.add_node(StateNode {
            index: state,
            depth,
            marking: marking.clone(),
            label,
        });
        debug_assert_eq!(self.nodes.len(), state);
        self.nodes.push(node);
    }

    fn on_edge(&mut self, from: StateIndex, transition: TransitionId, to: StateIndex) {
        if let (Some(&source), Some(&target)) = (self.nodes.get(from), self.nodes.get(to)) {
            self.graph.add_edge(
                source,
                target,
                StateEdge {
                    transition,
                    label: self.net.transition_name(transition),
                },
            );
        }
    }

    fn on_deadlock(&mut self, state: StateIndex) {
        if let Some(&node) = self.nodes.get(state) {
            self.deadlocks.insert(node);
        }
    }
}

impl StateGraph {
    /// 按 `config` 从 `start` 开始探索，并把访问到的标识与发射记录为图。
    pub fn explore(
        net: &Net,
        start: &Marking,
        config: ExploreConfig,
    ) -> Result<(Self, ExploreReport), ExploreError> {
        let explorer = Explorer::new(net, config)?;
        let mut recorder = Recorder {
            net,
            graph: Graph::new(),
            nodes: Vec::new(),
            deadlocks: FxHashSet::default(),
        };
        let report = explorer.run_with(start, &mut recorder)?;
        let graph = Self {
            graph: recorder.graph,
            deadlocks: recorder.deadlocks,
        };
        Ok((graph, report))
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, edge: EdgeReference<'_, StateEdge>| {
                    format!("label=\"{}\"", escape(&edge.weight().label))
                },
                &|_, (idx, node): (NodeIndex, &StateNode)| {
                    let mut attrs = format!(
                        "label=\"s{}\\n{}\"",
                        node.index,
                        escape(&node.label)
                    );
                    if self.deadlocks.contains(&idx) {
                        attrs.push_str(", style=filled, fillcolor=\"#ffcdd2\"");
                    }
                    attrs
                },
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.dot())
    }
}
