use copyfinder::cli::Cli;
use copyfinder::config::Config;
use copyfinder::duplicates::{CopySearchEngine, EngineConfig, SearchProcessor};
use copyfinder::progress::SilentProgress;
use copyfinder::scanner::HashAlgorithm;
use figment::providers::Serialized;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.prefix_threshold, 10_240);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
prefix_threshold = 65536
block_size = 1048576
algorithm = "blake3"
skip_hidden = false
progress = false
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path);

    assert_eq!(config.prefix_threshold, 65_536);
    assert_eq!(config.block_size, 1_048_576);
    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
    assert!(!config.skip_hidden);
    assert!(!config.progress);
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"blake3\"\n").unwrap();

    let config = Config::load_from_path(&config_path);

    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
    assert_eq!(config.prefix_threshold, Config::default().prefix_threshold);
    assert!(config.skip_hidden);
}

#[test]
fn test_config_malformed_toml_falls_back() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "this is [not toml").unwrap();

    assert_eq!(Config::load_from_path(&config_path), Config::default());
}

#[test]
fn test_cli_flags_override_file() {
    use clap::Parser;

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "prefix_threshold = 4096\nalgorithm = \"blake3\"\n").unwrap();

    let cli = Cli::try_parse_from(["copyfinder", "scan", "--threshold", "1KiB"]).unwrap();
    let mut config = Config::load_from_path(&config_path);
    match &cli.command {
        copyfinder::cli::Commands::Scan(args) => args.apply(&mut config),
        copyfinder::cli::Commands::Config(_) => panic!("Expected Scan command"),
    }

    assert_eq!(config.prefix_threshold, 1024);
    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
}

#[test]
fn test_saved_config_drives_engine() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("conf").join("config.toml");
    let data = temp_dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join(".a"), "hidden twin").unwrap();
    fs::write(data.join(".b"), "hidden twin").unwrap();

    let config = Config {
        skip_hidden: false,
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let loaded = Config::load_from_path(&config_path);
    let processor = SearchProcessor::new(CopySearchEngine::new(
        &data,
        EngineConfig::from(&loaded),
    ));
    let groups = processor.launch(&SilentProgress).unwrap();

    assert_eq!(groups.len(), 1);
}
