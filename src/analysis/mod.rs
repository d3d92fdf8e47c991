pub mod boundness;
pub mod reachability;
pub mod state_graph;

pub use boundness::{PlaceVerdict, Verdict};
pub use reachability::{
    ExploreConfig, ExploreError, ExploreObserver, ExploreReport, Explorer, StateIndex, Witness,
    explore,
};
pub use state_graph::StateGraph;
