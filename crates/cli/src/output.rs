use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Absolute form of `path` for provenance fields; lexical only.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn absolute_display(path: &Path) -> String {
    absolute(path).to_string_lossy().into_owned()
}

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// One-line machine-readable status, printed with `--json`.
pub fn print_status(mode: &str, fields: Value) -> Result<()> {
    let mut status = serde_json::json!({
        "status": "ok",
        "mode": mode,
    });
    if let (Some(obj), Value::Object(extra)) = (status.as_object_mut(), fields) {
        obj.extend(extra);
    }
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_missing_directories() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("nested").join("out.json");
        write_json(&target, &serde_json::json!({"a": 1})).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(back["a"], 1);
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(absolute(temp.path()), temp.path());
        assert!(absolute(Path::new("relative.json")).is_absolute());
    }
}
