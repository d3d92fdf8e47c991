//! 基于已探索状态空间的有界性与安全性判定.
//!
//! 仅当某个已访问标识在库所上放置了多于 `k` 个托肯时才判 `No`，因此每个
//! `No` 都有见证。`Yes` 要求搜索穷尽全部可达标识，否则结果为 `Unknown`。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::{Idx, Net, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
    Unknown,
}

impl Verdict {
    /// 依据目前观察到的最大托肯数，判定“从不超过 `threshold`”。
    pub fn for_bound(observed_max: Weight, threshold: Weight, exhaustive: bool) -> Self {
        if observed_max > threshold {
            Verdict::No
        } else if exhaustive {
            Verdict::Yes
        } else {
            Verdict::Unknown
        }
    }

    /// 将逐库所判定汇总为整网判定，任一 `No` 即决定结果。
    pub fn aggregate<I>(verdicts: I, exhaustive: bool) -> Self
    where
        I: IntoIterator<Item = Verdict>,
    {
        let mut result = if exhaustive {
            Verdict::Yes
        } else {
            Verdict::Unknown
        };
        for verdict in verdicts {
            match verdict {
                Verdict::No => return Verdict::No,
                Verdict::Unknown => result = Verdict::Unknown,
                Verdict::Yes => {}
            }
        }
        result
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Yes => "yes",
            Verdict::No => "no",
            Verdict::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceVerdict {
    pub place: String,
    pub max_tokens: Weight,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k_bounded: Option<Verdict>,
    pub safe: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundnessSummary {
    /// 未请求 `k` 时为 `None`。
    pub is_k_bounded: Option<Verdict>,
    pub is_safe: Verdict,
    /// 网的精确界，仅在穷尽搜索后可知。
    pub bound: Option<Weight>,
    pub minimal_k_observed: Weight,
    pub places: Vec<PlaceVerdict>,
}

pub fn summarize(
    net: &Net,
    per_place_max: &[Weight],
    k: Option<Weight>,
    exhaustive: bool,
) -> BoundnessSummary {
    let places: Vec<PlaceVerdict> = net
        .places()
        .map(|(place, p)| {
            let max_tokens = per_place_max.get(place.index()).copied().unwrap_or(0);
            PlaceVerdict {
                place: p.id.clone(),
                max_tokens,
                k_bounded: k.map(|k| Verdict::for_bound(max_tokens, k, exhaustive)),
                safe: Verdict::for_bound(max_tokens, 1, exhaustive),
            }
        })
        .collect();

    let minimal_k_observed = places.iter().map(|p| p.max_tokens).max().unwrap_or(0);
    let is_k_bounded = k.map(|_| {
        Verdict::aggregate(places.iter().filter_map(|p| p.k_bounded), exhaustive)
    });
    let is_safe = Verdict::aggregate(places.iter().map(|p| p.safe), exhaustive);

    BoundnessSummary {
        is_k_bounded,
        is_safe,
        bound: exhaustive.then_some(minimal_k_observed),
        minimal_k_observed,
        places,
    }
}
