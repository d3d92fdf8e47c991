use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::analysis::{ExploreReport, Verdict, Witness};

/// 单个网文件的探索结果，由 `pn` 打印或保存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub net_name: String,
    pub analysis_time: Duration,
    pub result: ExploreReport,
}

fn write_witness(f: &mut fmt::Formatter<'_>, title: &str, witness: &Witness) -> fmt::Result {
    writeln!(f, "\n{} (depth {}):", title, witness.depth)?;
    if witness.trace.is_empty() {
        writeln!(f, "  trace: <initial marking>")?;
    } else {
        writeln!(f, "  trace: {}", itertools::join(&witness.trace, " -> "))?;
    }
    for (place, tokens) in &witness.marking {
        writeln!(f, "  {}: {}", place, tokens)?;
    }
    Ok(())
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        writeln!(f, "Reachability report")?;
        writeln!(f, "Net: {}", self.net_name)?;
        writeln!(f, "Analysis time: {:?}", self.analysis_time)?;
        writeln!(
            f,
            "Explored states: {} (depth {}{})",
            r.explored_states,
            r.depth_reached,
            if r.hit_limits { ", limits reached" } else { "" }
        )?;
        writeln!(f, "Deadlock reachable: {}", r.deadlocked)?;
        writeln!(f, "Safe: {}", r.is_safe)?;
        if let (Some(k), Some(verdict)) = (r.k, r.is_k_bounded) {
            writeln!(f, "{}-bounded: {}", k, verdict)?;
        }
        match r.bound {
            Some(bound) => writeln!(f, "Bound: {}", bound)?,
            None => writeln!(f, "Largest count observed: {}", r.minimal_k_observed)?,
        }

        let exceeding: Vec<_> = r
            .place_verdicts
            .iter()
            .filter(|p| p.k_bounded == Some(Verdict::No))
            .map(|p| format!("{} ({})", p.place, p.max_tokens))
            .collect();
        if !exceeding.is_empty() {
            writeln!(f, "Places over k: {}", exceeding.join(", "))?;
        }

        if let Some(witness) = &r.deadlock_witness {
            write_witness(f, "Deadlock witness", witness)?;
        }
        if let Some(witness) = &r.k_witness {
            write_witness(f, "k-bound witness", witness)?;
        }
        if let Some(witness) = &r.unsafe_witness {
            write_witness(f, "Safety witness", witness)?;
        }
        Ok(())
    }
}

impl AnalysisReport {
    pub fn new(net_name: impl Into<String>, result: ExploreReport, analysis_time: Duration) -> Self {
        Self {
            net_name: net_name.into(),
            analysis_time,
            result,
        }
    }

    /// 文本写入 `path`，JSON 写入同目录下的 `.json` 文件。
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        use std::fs::File;
        use std::io::Write;

        let path = path.as_ref();
        let mut file = File::create(path)?;
        writeln!(file, "{}", self)?;

        let mut json_path = path.as_os_str().to_owned();
        json_path.push(".json");
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(json_path, json.as_bytes())?;

        Ok(())
    }
}
