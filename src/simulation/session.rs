//! 仿真会话：一个可编辑的网及其发射历史.
//!
//! 所有修改操作都取 `&mut self`，每个会话同一时刻至多进行一次发射及历史追加；
//! 多任务驱动同一会话时由宿主加互斥锁。
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::net::{FireError, Marking, Net, NetError, NetModel};
use crate::simulation::history::{History, HistoryEntry, HistoryError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidNet(#[from] NetError),
    #[error(transparent)]
    Fire(#[from] FireError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub fired: Vec<String>,
    /// 因没有可激发迁移而停止。
    pub deadlocked: bool,
}

pub struct Session {
    model: NetModel,
    net: Net,
    initial: Marking,
    history: History,
    rng: StdRng,
}

impl Session {
    pub fn new(model: NetModel) -> Result<Self, SessionError> {
        Self::with_seed(model, None)
    }

    /// 固定 `seed` 可使 [`step_random`](Self::step_random) 可复现。
    pub fn with_seed(model: NetModel, seed: Option<u64>) -> Result<Self, SessionError> {
        let net = Net::new(&model)?;
        let initial = net.initial_marking();
        let mut history = History::new();
        history.initialize(initial.clone())?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            model,
            net,
            initial,
            history,
            rng,
        })
    }

    pub fn model(&self) -> &NetModel {
        &self.model
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// 历史游标处的标识。
    pub fn marking(&self) -> &Marking {
        self.history
            .current()
            .map(|entry| &entry.marking)
            .unwrap_or(&self.initial)
    }

    pub fn enabled(&self) -> Vec<String> {
        self.net.enabled_ids(self.marking())
    }

    pub fn is_deadlocked(&self) -> bool {
        self.net.enabled_transitions(self.marking()).is_empty()
    }

    /// 从当前标识发射 `transition` 并记录；出错时标识与历史均不变。
    pub fn fire(&mut self, transition: &str) -> Result<&HistoryEntry, SessionError> {
        let next = self.net.fire(self.marking(), transition)?;
        log::debug!("fired {} -> {:?}", transition, next);
        Ok(self.history.append(transition, next)?)
    }

    /// 均匀随机地发射一个可激发迁移；当前标识为死锁时返回 `None`。
    pub fn step_random(&mut self) -> Result<Option<String>, SessionError> {
        let enabled = self.enabled();
        if enabled.is_empty() {
            return Ok(None);
        }
        let choice = self.rng.random_range(0..enabled.len());
        let transition = &enabled[choice];
        self.fire(transition)?;
        Ok(Some(transition.clone()))
    }

    /// 自动执行至多 `max_steps` 步，遇到死锁提前停止。
    pub fn run(&mut self, max_steps: usize) -> Result<RunSummary, SessionError> {
        let mut summary = RunSummary::default();
        for _ in 0..max_steps {
            match self.step_random()? {
                Some(transition) => summary.fired.push(transition),
                None => {
                    summary.deadlocked = true;
                    break;
                }
            }
        }
        if !summary.deadlocked && self.is_deadlocked() {
            summary.deadlocked = true;
        }
        Ok(summary)
    }

    pub fn goto(&mut self, index: usize) -> Result<&HistoryEntry, SessionError> {
        Ok(self.history.goto(index)?)
    }

    /// 清空历史并从初始标识重新开始。
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.history.clear();
        self.history.initialize(self.initial.clone())?;
        Ok(())
    }

    /// 应用结构编辑。历史被清空并从编辑后网的初始标识重新开始；编辑后的
    /// 模型未通过校验时会话保持原样。
    pub fn edit<F>(&mut self, edit: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut NetModel),
    {
        let mut model = self.model.clone();
        edit(&mut model);
        let net = Net::new(&model)?;
        log::debug!(
            "net edited ({} places, {} transitions); clearing history",
            net.places_len(),
            net.transitions_len()
        );
        self.initial = net.initial_marking();
        self.model = model;
        self.net = net;
        self.reset()
    }
}
