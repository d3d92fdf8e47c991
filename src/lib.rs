//! P/T 网引擎：结构校验、发生规则、有界可达性分析与可分支的仿真历史。
#![warn(non_snake_case)]

pub mod analysis;
pub mod api;
pub mod config;
pub mod net;
pub mod options;
pub mod report;
pub mod server;
pub mod simulation;
