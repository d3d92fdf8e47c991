//! 可编辑的 P/T 网模型：库所、迁移与带权弧。
//!
//! [`NetModel`] 是编辑器持有、在网络上传输的形式，本身不做校验；
//! [`Net::new`](crate::net::Net::new) 一次性校验并编译为可发射、可探索的网。
use serde::{Deserialize, Serialize};

pub type Weight = u64;

fn default_weight() -> Weight {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub tokens: Weight,
}

impl Place {
    pub fn new(id: impl Into<String>, tokens: Weight) -> Self {
        Self {
            id: id.into(),
            label: None,
            tokens,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 用于显示的标签，缺省时回退为 id。
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Transition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// 库所到迁移（输入）或迁移到库所（输出）的弧，方向由哪一端是库所决定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub id: String,
    pub src: String,
    pub dst: String,
    #[serde(default = "default_weight")]
    pub weight: Weight,
}

impl Arc {
    pub fn new(
        id: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        weight: Weight,
    ) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            dst: dst.into(),
            weight,
        }
    }

    pub fn touches(&self, node: &str) -> bool {
        self.src == node || self.dst == node
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetModel {
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

impl NetModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, place: Place) -> &mut Self {
        self.places.push(place);
        self
    }

    pub fn add_transition(&mut self, transition: Transition) -> &mut Self {
        self.transitions.push(transition);
        self
    }

    pub fn add_arc(&mut self, arc: Arc) -> &mut Self {
        self.arcs.push(arc);
        self
    }

    /// 删除 `id` 对应的库所或迁移及其所有关联弧；节点不存在时返回 `false`。
    pub fn remove_node(&mut self, id: &str) -> bool {
        let places_before = self.places.len();
        let transitions_before = self.transitions.len();
        self.places.retain(|p| p.id != id);
        self.transitions.retain(|t| t.id != id);
        let removed =
            places_before != self.places.len() || transitions_before != self.transitions.len();
        if removed {
            self.arcs.retain(|a| !a.touches(id));
        }
        removed
    }

    pub fn remove_arc(&mut self, id: &str) -> bool {
        let before = self.arcs.len();
        self.arcs.retain(|a| a.id != id);
        before != self.arcs.len()
    }

    /// 设置库所的初始托肯数。
    pub fn set_tokens(&mut self, place: &str, tokens: Weight) -> bool {
        match self.places.iter_mut().find(|p| p.id == place) {
            Some(p) => {
                p.tokens = tokens;
                true
            }
            None => false,
        }
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_node_drops_incident_arcs() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p1", 1))
            .add_place(Place::new("p2", 0))
            .add_transition(Transition::new("t1"))
            .add_arc(Arc::new("a1", "p1", "t1", 1))
            .add_arc(Arc::new("a2", "t1", "p2", 1));

        assert!(model.remove_node("p1"));
        assert_eq!(model.places.len(), 1);
        assert_eq!(model.arcs.len(), 1);
        assert_eq!(model.arcs[0].id, "a2");
        assert!(!model.remove_node("p1"));
    }

    #[test]
    fn weight_and_tokens_default_when_missing() {
        let json = r#"{
            "places": [{"id": "p1", "label": "start"}],
            "transitions": [{"id": "t1"}],
            "arcs": [{"id": "a1", "src": "p1", "dst": "t1"}]
        }"#;
        let model: NetModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.places[0].tokens, 0);
        assert_eq!(model.places[0].display_name(), "start");
        assert_eq!(model.transitions[0].display_name(), "t1");
        assert_eq!(model.arcs[0].weight, 1);
    }

    #[test]
    fn negative_tokens_are_rejected_by_deserialization() {
        let json = r#"{"places": [{"id": "p1", "tokens": -1}]}"#;
        assert!(serde_json::from_str::<NetModel>(json).is_err());
    }

    #[test]
    fn set_tokens_reports_missing_place() {
        let mut model = NetModel::new();
        model.add_place(Place::new("p1", 0));
        assert!(model.set_tokens("p1", 3));
        assert_eq!(model.place("p1").map(|p| p.tokens), Some(3));
        assert!(!model.set_tokens("nope", 3));
    }
}
