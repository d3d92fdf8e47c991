//! I/O 支持：以 JSON 或 RON 读写网模型。
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::structure::NetModel;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonSpanned(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Ron,
}

impl Format {
    /// `.ron` 扩展名选择 RON，其余按 JSON 处理。
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Format::Ron,
            _ => Format::Json,
        }
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let pretty = PrettyConfig::default().new_line("\n".to_string());
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}

pub fn read_value<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match Format::from_path(path) {
        Format::Json => from_json_str(&content),
        Format::Ron => from_ron_str(&content),
    }
}

pub fn write_value<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let path = path.as_ref();
    let content = match Format::from_path(path) {
        Format::Json => to_json_string(value)?,
        Format::Ron => to_ron_string(value)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn read_model<P: AsRef<Path>>(path: P) -> Result<NetModel, IoError> {
    read_value(path)
}

pub fn write_model<P: AsRef<Path>>(path: P, model: &NetModel) -> Result<(), IoError> {
    write_value(path, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{Arc, Place, Transition};

    #[test]
    fn ron_and_json_agree() {
        let mut model = NetModel::new();
        model
            .add_place(Place::new("p", 2).with_label("buffer"))
            .add_transition(Transition::new("t"))
            .add_arc(Arc::new("a", "p", "t", 2));

        let from_ron: NetModel = from_ron_str(&to_ron_string(&model).unwrap()).unwrap();
        let from_json: NetModel = from_json_str(&to_json_string(&model).unwrap()).unwrap();
        assert_eq!(from_ron, model);
        assert_eq!(from_json, model);
    }

    #[test]
    fn malformed_ron_is_an_error_not_a_panic() {
        assert!(from_ron_str::<NetModel>("(places: [").is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("net.RON")), Format::Ron);
        assert_eq!(Format::from_path(Path::new("net.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("net")), Format::Json);
    }
}
