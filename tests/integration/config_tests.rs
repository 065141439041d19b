use dupmerge::actions::PotentialPolicy;
use dupmerge::config::{Config, ConfigError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Jail};
use std::path::Path;

#[test]
fn test_config_load_defaults() {
    // Defaults only, so the process environment cannot interfere.
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.scan.io_threads, 4);
    assert_eq!(config.scan.prefix_bytes, 8 * 1024);
    assert_eq!(config.scan.large_file_threshold, 1024 * 1024);
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "dupmerge.toml",
            r#"
            [scan]
            io_threads = 2
            max_depth = 4

            [merge]
            permanent = true
            "#,
        )?;
        jail.set_env("DUPMERGE_SCAN__IO_THREADS", "6");
        jail.set_env("DUPMERGE_MERGE__POTENTIAL_POLICY", "allow");

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("dupmerge.toml"))
            .merge(Env::prefixed("DUPMERGE_").split("__"))
            .extract()?;

        assert_eq!(config.scan.io_threads, 6);
        assert_eq!(config.scan.max_depth, 4);
        assert!(config.merge.permanent);
        assert_eq!(config.merge.potential_policy, PotentialPolicy::Allow);
        Ok(())
    });
}

#[test]
fn test_load_applies_validation() {
    Jail::expect_with(|jail| {
        jail.create_file("bad.toml", "[scan]\nio_threads = 0\n")?;
        match Config::load(Some(Path::new("bad.toml"))) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "scan.io_threads"),
            other => panic!("expected Invalid, got {other:?}"),
        }
        Ok(())
    });
}

#[test]
fn test_engine_configs_follow_settings() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "dupmerge.toml",
            r#"
            [scan]
            prefix_bytes = 4096
            large_file_threshold = 65536
            ignore_patterns = ["*.part"]

            [merge]
            potential_policy = "skip"
            verify_unchanged = false
            protected_paths = ["/srv/archive"]
            "#,
        )?;

        let config = Config::load(Some(Path::new("dupmerge.toml"))).map_err(|e| e.to_string())?;
        let finder = config.finder_config();
        assert_eq!(finder.hasher.prefix_bytes(), 4096);
        assert_eq!(finder.hasher.large_file_threshold(), 65536);
        assert_eq!(finder.walker_config.ignore_patterns, vec!["*.part".to_string()]);

        let merge = config.merge_config();
        assert_eq!(merge.potential_policy, PotentialPolicy::Skip);
        assert!(!merge.verify_unchanged);

        let guard = config.path_guard();
        assert!(guard.check(Path::new("/srv/archive/photo.jpg")).is_err());
        Ok(())
    });
}
