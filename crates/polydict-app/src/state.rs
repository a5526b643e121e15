use std::sync::Arc;

use anyhow::Context;
use polydict_config::{ALL_GROUP, Config};
use polydict_core::{
    ArticleRequest, DictionaryGroup, DictionaryRegistry, FullTextOptions, FullTextPolicy,
    FullTextSearchCoordinator, LookupOptions, WordFinder,
};

/// Everything a command needs: loaded dictionaries plus one engine of each kind
pub struct AppState {
    pub config: Config,
    pub registry: DictionaryRegistry,
    pub finder: WordFinder,
    pub articles: ArticleRequest,
    pub full_text: Arc<FullTextSearchCoordinator>,
}

impl AppState {
    pub async fn load(config: Config) -> Self {
        let registry = polydict_dictionary::load_registry(&config).await;
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: Config, registry: DictionaryRegistry) -> Self {
        let full_text = config.full_text.clamped();
        let policy = FullTextPolicy {
            skip_dictionaries_above: full_text.skip_dictionaries_above,
            min_word_length: full_text.min_word_length,
        };
        let coordinator = FullTextSearchCoordinator::init(
            registry.all().iter().cloned(),
            policy,
            full_text.state_file.clone(),
        );

        if full_text.prebuild {
            let started = coordinator.prebuild_all();
            tracing::info!("Prebuilding {started} full-text indexes");
        }

        Self {
            config,
            registry,
            finder: WordFinder::new(),
            articles: ArticleRequest::new(),
            full_text: coordinator,
        }
    }

    /// Named group, or the default one
    pub fn group(&self, name: Option<&str>) -> anyhow::Result<DictionaryGroup> {
        polydict_dictionary::build_group(&self.registry, &self.config, name)
            .with_context(|| {
                let wanted = name
                    .or(self.config.lookup.default_group.as_deref())
                    .unwrap_or(ALL_GROUP);
                format!("Unknown group {wanted}")
            })
    }

    pub fn lookup_options(&self) -> LookupOptions {
        let lookup = &self.config.lookup;
        LookupOptions {
            mode: lookup.mode,
            max_results_per_dictionary: lookup.max_results_per_dictionary,
            max_total_results: lookup.max_total_results,
        }
    }

    pub fn full_text_options(&self) -> FullTextOptions {
        let full_text = self.config.full_text.clamped();
        FullTextOptions {
            mode: full_text.mode,
            ignore_diacritics: full_text.ignore_diacritics,
            ignore_word_order: full_text.ignore_word_order,
            max_distance: full_text.max_distance as usize,
            max_articles_per_dictionary: full_text.max_articles_per_dictionary,
            wait: full_text.wait,
        }
    }

    /// Cancels running work and flushes index state
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.finder.cancel_current();
        self.articles.cancel_current();
        self.full_text
            .shutdown()
            .await
            .context("Failed to persist full-text index state")
    }
}
