use crate::Result;
use std::path::Path;

pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

pub fn format_ron_pretty<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
    let config = ron::ser::PrettyConfig::default();
    let content = ron::ser::to_string_pretty(data, config)?;
    Ok(content)
}

pub fn parse_ron<T: serde::de::DeserializeOwned>(content: &str) -> Result<T> {
    let data: T = ron::from_str(content)?;
    Ok(data)
}