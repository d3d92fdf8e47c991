//! 仿真过程中访问过的标识日志，可回退并分支.
//!
//! 日志是带游标的单条路径。回退后追加会丢弃游标之后的所有条目并由此继续，
//! 即开启新分支。网结构变更后已记录的发射无法重放，持有者须调用
//! [`clear`](History::clear)。
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::Marking;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history is already initialized")]
    AlreadyInitialized,
    #[error("history is empty")]
    Empty,
    #[error("history index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 到达该条目所发射的迁移；初始条目为 `None`。
    pub fired: Option<String>,
    pub marking: Marking,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, marking: Marking) -> Result<&HistoryEntry, HistoryError> {
        if !self.entries.is_empty() {
            return Err(HistoryError::AlreadyInitialized);
        }
        self.entries.push(HistoryEntry {
            fired: None,
            marking,
            timestamp: SystemTime::now(),
        });
        self.cursor = Some(0);
        Ok(&self.entries[0])
    }

    /// 记录一次从当前条目出发的发射，先丢弃游标之后的条目。
    pub fn append(
        &mut self,
        transition: impl Into<String>,
        marking: Marking,
    ) -> Result<&HistoryEntry, HistoryError> {
        let cursor = self.cursor.ok_or(HistoryError::Empty)?;
        let dropped = self.entries.len() - (cursor + 1);
        if dropped > 0 {
            log::debug!("branching at entry {}, dropping {} entries", cursor, dropped);
        }
        self.entries.truncate(cursor + 1);
        self.entries.push(HistoryEntry {
            fired: Some(transition.into()),
            marking,
            timestamp: SystemTime::now(),
        });
        let last = self.entries.len() - 1;
        self.cursor = Some(last);
        Ok(&self.entries[last])
    }

    /// 只移动游标，不改动条目。
    pub fn goto(&mut self, index: usize) -> Result<&HistoryEntry, HistoryError> {
        let len = self.entries.len();
        if index >= len {
            return Err(HistoryError::IndexOutOfRange { index, len });
        }
        self.cursor = Some(index);
        Ok(&self.entries[index])
    }

    pub fn step_back(&mut self) -> Result<&HistoryEntry, HistoryError> {
        let cursor = self.cursor.ok_or(HistoryError::Empty)?;
        let target = cursor.checked_sub(1).ok_or(HistoryError::IndexOutOfRange {
            index: 0,
            len: self.entries.len(),
        })?;
        self.goto(target)
    }

    pub fn step_forward(&mut self) -> Result<&HistoryEntry, HistoryError> {
        let cursor = self.cursor.ok_or(HistoryError::Empty)?;
        self.goto(cursor + 1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|idx| self.entries.get(idx))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
