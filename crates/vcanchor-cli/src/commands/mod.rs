pub mod issue;
pub mod verify;

/// Read a JSON argument given inline or as a path to a file.
pub fn read_json_arg(arg: &str) -> anyhow::Result<serde_json::Value> {
    let text = if std::path::Path::new(arg).is_file() {
        std::fs::read_to_string(arg)?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("invalid JSON: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inline_json() {
        let value = read_json_arg(r#"{"a":1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_read_json_file() {
        let path = std::env::temp_dir().join(format!("vcanchor-cli-{}.json", rand::random::<u64>()));
        std::fs::write(&path, r#"{"sequenceId":7}"#).unwrap();
        let value = read_json_arg(path.to_str().unwrap()).unwrap();
        assert_eq!(value["sequenceId"], 7);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(read_json_arg("{not json").is_err());
    }
}
