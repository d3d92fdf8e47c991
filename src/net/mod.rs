//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设库所集合 `P`、迁移集合 `T`，带权弧由 `Pre, Post ∈ ℕ^{|P|×|T|}` 给出。
//! 对任意标识 `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`；没有输入弧的
//!   迁移在任何标识下都可激发；
//! * 可激发的 `t` **发射** 后得到 `M' = M - Pre[:, t] + Post[:, t]`，一步完成。
//!
//! [`NetModel`] 是编辑器交来的可编辑形式，[`Net`] 是所有查询所用的已校验形式。
//!
//! ## 示例
//!
//! ```rust
//! use petri_engine::net::*;
//!
//! let mut model = NetModel::new();
//! model
//!     .add_place(Place::new("p0", 1))
//!     .add_place(Place::new("p1", 0))
//!     .add_transition(Transition::new("t0"))
//!     .add_arc(Arc::new("a0", "p0", "t0", 1))
//!     .add_arc(Arc::new("a1", "t0", "p1", 1));
//!
//! let net = Net::new(&model).unwrap();
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_ids(&marking), vec!["t0".to_string()]);
//! let next = net.fire(&marking, "t0").unwrap();
//! assert_eq!(net.marking_to_map(&next)["p0"], 0);
//! assert_eq!(net.marking_to_map(&next)["p1"], 1);
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod marking;
pub mod structure;

pub use self::core::{DiagnosticReport, FireError, MarkingError, Net, NetError};
pub use ids::{PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use marking::Marking;
pub use structure::{Arc, ArcDirection, NetModel, Place, Transition, Weight};
