//! I/O 支持：JSON、RON、YAML 序列化接口，按文件扩展名选择格式。
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonSpanned(#[from] ron::error::SpannedError),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported file extension for {0}; expected .json, .ron, .yaml or .yml")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Ron,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("ron") => Ok(Format::Ron),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            _ => Err(IoError::UnknownFormat(path.display().to_string())),
        }
    }
}

pub fn to_string<T: Serialize>(value: &T, format: Format) -> Result<String, IoError> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Ron => {
            let mut pretty = PrettyConfig::default();
            pretty.new_line = "\n".into();
            ron::ser::to_string_pretty(value, pretty)?
        }
        Format::Yaml => serde_yaml::to_string(value)?,
    })
}

pub fn from_str<T: DeserializeOwned>(s: &str, format: Format) -> Result<T, IoError> {
    Ok(match format {
        Format::Json => serde_json::from_str(s)?,
        Format::Ron => ron::from_str(s)?,
        Format::Yaml => serde_yaml::from_str(s)?,
    })
}

pub fn write<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let path = path.as_ref();
    let content = to_string(value, Format::from_path(path)?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn read<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)?;
    from_str(&content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("m.json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("m.yml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("m.ron")).unwrap(), Format::Ron);
        assert!(matches!(
            Format::from_path(Path::new("m.txt")),
            Err(IoError::UnknownFormat(_))
        ));
    }

    #[test]
    fn every_format_reads_back_what_it_wrote() {
        let mut value = BTreeMap::new();
        value.insert("mRNA".to_string(), 5u64);
        value.insert("protein".to_string(), 0u64);
        for format in [Format::Json, Format::Ron, Format::Yaml] {
            let text = to_string(&value, format).unwrap();
            let back: BTreeMap<String, u64> = from_str(&text, format).unwrap();
            assert_eq!(back, value, "{format:?}");
        }
    }
}
