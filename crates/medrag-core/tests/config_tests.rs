use figment::Jail;

use medrag_core::config::{expand_path, resolve_with_base, BackendKind, Config, EmbeddingKind, Settings};

#[test]
fn defaults_apply_without_config_files() {
    Jail::expect_with(|_jail| {
        let settings = Config::load().expect("load").settings().expect("settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.chunking.max_words, 100);
        assert_eq!(settings.chunking.overlap_sentences, 1);
        assert_eq!(settings.retrieval.context_budget_chars, 8000);
        assert_eq!(settings.index.backend, BackendKind::Flat);
        Ok(())
    });
}

#[test]
fn toml_and_env_layers_merge() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                [chunking]
                max_words = 40

                [index]
                backend = "collection"
                dir = "/tmp/medrag-index"

                [embedding]
                kind = "hash"
            "#,
        )?;
        jail.create_file("config.test.toml", "[retrieval]\nk = 8\n")?;
        jail.set_env("RUST_ENV", "test");
        jail.set_env("MEDRAG_GENERATION__MODEL", "gemma3:4b");
        jail.set_env("MEDRAG_CHUNKING__OVERLAP_SENTENCES", "2");

        let config = Config::load().expect("load");
        let settings = config.settings().expect("settings");

        assert_eq!(settings.chunking.max_words, 40);
        assert_eq!(settings.chunking.overlap_sentences, 2);
        assert_eq!(settings.index.backend, BackendKind::Collection);
        assert_eq!(settings.index.dir, "/tmp/medrag-index");
        assert_eq!(settings.embedding.kind, EmbeddingKind::Hash);
        assert_eq!(settings.retrieval.k, 8);
        assert_eq!(settings.generation.model, "gemma3:4b");
        assert_eq!(config.get::<usize>("chunking.max_words").expect("get"), 40);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\nk = 0\n")?;
        assert!(Config::load().expect("load").settings().is_err());
        Ok(())
    });
}

#[test]
fn path_helpers_expand_and_resolve() {
    std::env::set_var("MEDRAG_TEST_ROOT", "/srv/medrag");
    assert_eq!(expand_path("${MEDRAG_TEST_ROOT}/index"), std::path::PathBuf::from("/srv/medrag/index"));

    let base = std::path::Path::new("/work");
    assert_eq!(resolve_with_base(base, "index"), std::path::PathBuf::from("/work/index"));
    assert_eq!(resolve_with_base(base, "/abs/index"), std::path::PathBuf::from("/abs/index"));
}
