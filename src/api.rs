//! 引擎的请求/响应约定.
//!
//! 每个请求携带完整的网模型以及可选的稀疏标识，调用之间不保留任何状态。
//! 未给出标识时使用模型自身的托肯数。这些函数与传输层无关，HTTP 绑定见
//! [`crate::server`]。
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{ExploreError, ExploreReport, explore};
use crate::config::ExploreSettings;
use crate::net::{FireError, Marking, MarkingError, Net, NetError, NetModel, Weight};

pub type SparseMarking = BTreeMap<String, Weight>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidNet(#[from] NetError),
    #[error(transparent)]
    Marking(#[from] MarkingError),
    #[error(transparent)]
    Fire(#[from] FireError),
    #[error(transparent)]
    Explore(#[from] ExploreError),
    #[error("exploration worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    /// 返回给客户端的稳定错误名。
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidNet(_) => "InvalidNet",
            ApiError::Marking(MarkingError::UnknownPlace(_)) => "UnknownPlace",
            ApiError::Fire(FireError::UnknownTransition(_)) => "UnknownTransition",
            ApiError::Fire(FireError::NotEnabled(_)) => "NotEnabled",
            ApiError::Explore(ExploreError::InvalidConfig(_)) => "InvalidConfig",
            ApiError::Fire(FireError::TokenOverflow(_))
            | ApiError::Explore(ExploreError::Fire(FireError::TokenOverflow(_))) => {
                "TokenOverflow"
            }
            ApiError::Fire(_) | ApiError::Explore(_) | ApiError::Worker(_) => "Internal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetRequest {
    pub net: NetModel,
    #[serde(default)]
    pub marking: Option<SparseMarking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledResponse {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireRequest {
    pub net: NetModel,
    #[serde(alias = "transition_id")]
    pub transition_id: String,
    #[serde(default)]
    pub marking: Option<SparseMarking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireResponse {
    pub marking: SparseMarking,
    /// 请求中的模型，托肯数替换为 `marking`。
    pub net: NetModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    pub enabled: Vec<String>,
    /// 所给标识本身没有可激发迁移。
    pub deadlocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KBoundedRequest {
    pub net: NetModel,
    #[serde(default)]
    pub marking: Option<SparseMarking>,
    #[serde(default)]
    pub k: Option<Weight>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub max_states: Option<usize>,
}

fn compile(model: &NetModel, marking: Option<&SparseMarking>) -> Result<(Net, Marking), ApiError> {
    let net = Net::new(model)?;
    let marking = match marking {
        Some(map) => net.marking_from_map(map)?,
        None => net.initial_marking(),
    };
    Ok((net, marking))
}

pub fn enabled(request: &NetRequest) -> Result<EnabledResponse, ApiError> {
    let (net, marking) = compile(&request.net, request.marking.as_ref())?;
    Ok(EnabledResponse {
        enabled: net.enabled_ids(&marking),
    })
}

pub fn fire(request: &FireRequest) -> Result<FireResponse, ApiError> {
    let (net, marking) = compile(&request.net, request.marking.as_ref())?;
    let next = net.fire(&marking, &request.transition_id)?;
    let marking = net.marking_to_map(&next);
    let mut model = request.net.clone();
    for place in &mut model.places {
        place.tokens = marking.get(&place.id).copied().unwrap_or(0);
    }
    Ok(FireResponse { marking, net: model })
}

/// 单个标识的可激发集与局部死锁状态，不做搜索。
pub fn analyze_state(request: &NetRequest) -> Result<StateResponse, ApiError> {
    let (net, marking) = compile(&request.net, request.marking.as_ref())?;
    let enabled = net.enabled_ids(&marking);
    Ok(StateResponse {
        deadlocked: enabled.is_empty(),
        enabled,
    })
}

/// 从请求标识出发的有界探索；此处 `deadlocked` 表示存在死锁的已探索标识。
pub fn analyze_k_bounded(
    request: &KBoundedRequest,
    settings: &ExploreSettings,
) -> Result<ExploreReport, ApiError> {
    let (net, marking) = compile(&request.net, request.marking.as_ref())?;
    let config = settings.resolve(request.k, request.max_depth, request.max_states);
    if config.max_states > settings.max_states_cap {
        return Err(ExploreError::InvalidConfig(format!(
            "maxStates {} exceeds the configured cap of {}",
            config.max_states, settings.max_states_cap
        ))
        .into());
    }
    Ok(explore(&net, &marking, config)?)
}
