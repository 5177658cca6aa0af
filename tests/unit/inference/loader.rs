//! Tests for model specification loading and graceful load failure

#[cfg(test)]
mod tests {
    use aerial_watch::EngineError;
    use aerial_watch::inference::loader::{ModelSpec, build_model, load_model, read_model_spec};
    use std::fs;
    use tempfile::TempDir;

    // Tests no path loads the built-in model
    // Verified by returning Unavailable without a path
    #[test]
    fn test_default_model() {
        assert!(load_model(None).is_ready());
        assert!(build_model(ModelSpec::default()).is_ready());
    }

    // Tests a JSON specification configures the blob detector
    // Verified by ignoring the parsed parameters
    #[test]
    fn test_reads_blob_spec() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, r#"{ "kind": "blob", "min_area": 4, "dark_class": "shadow" }"#).unwrap();

        let ModelSpec::Blob(params) = read_model_spec(&path).unwrap();
        assert_eq!(params.min_area, 4);
        assert_eq!(params.dark_class, "shadow");
        assert_eq!(params.contrast_threshold, 60);

        assert!(load_model(Some(path.as_path())).is_ready());
    }

    // Tests missing and malformed specifications become unavailable handles
    // Verified by propagating the read error
    #[test]
    fn test_failed_loads_are_unavailable() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let unknown = dir.path().join("unknown.json");
        fs::write(&unknown, r#"{ "kind": "yolo" }"#).unwrap();

        assert!(matches!(
            read_model_spec(&missing),
            Err(EngineError::FileSystem { .. })
        ));
        assert!(matches!(
            read_model_spec(&unknown),
            Err(EngineError::Config { .. })
        ));
        assert!(!load_model(Some(missing.as_path())).is_ready());
        assert!(!load_model(Some(unknown.as_path())).is_ready());
    }
}
