use std::time::Duration;

use async_trait::async_trait;
use polydict_config::dictionary::WikiConfig;
use polydict_core::{
    ArticleOptions, ArticleReply, DictError, Dictionary, DictionaryInfo, WordMatch, WordMatches,
    WordPattern,
};
use polydict_types::MatchKind;
use serde_json::Value;

/// MediaWiki site: `opensearch` for suggestions, `action=parse` for articles
pub struct WikiDictionary {
    info: DictionaryInfo,
    api_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl WikiDictionary {
    pub fn new(config: &WikiConfig, default_timeout: Duration) -> Result<Self, DictError> {
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DictError::BackendUnavailable(e.to_string()))?;

        let mut info = DictionaryInfo::new(config.id.as_str(), config.name.as_str());
        info.icon = config.icon.clone();

        Ok(Self {
            info,
            api_url: config.api_url.clone(),
            timeout,
            client,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value, DictError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?;

        response.json::<Value>().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, err: reqwest::Error) -> DictError {
        if err.is_timeout() {
            DictError::BackendTimeout(self.timeout)
        } else {
            DictError::BackendUnavailable(format!("{}: {err}", self.info.name))
        }
    }
}

#[async_trait]
impl Dictionary for WikiDictionary {
    fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn match_word(
        &self,
        pattern: &WordPattern,
        max_results: usize,
    ) -> Result<WordMatches, DictError> {
        if pattern.is_empty() {
            return Ok(WordMatches::default());
        }

        let limit = max_results.to_string();
        let value = self
            .get(&[
                ("action", "opensearch"),
                ("search", pattern.text()),
                ("limit", &limit),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .await?;

        let matches = parse_opensearch(&value)?
            .into_iter()
            .map(|title| {
                let kind = pattern.classify(&title).unwrap_or(MatchKind::Fuzzy);
                WordMatch::new(title, kind)
            })
            .take(max_results)
            .collect();

        Ok(WordMatches::new(matches))
    }

    async fn fetch_article(
        &self,
        headword: &str,
        _options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError> {
        let value = self
            .get(&[
                ("action", "parse"),
                ("page", headword),
                ("prop", "text"),
                ("redirects", "1"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        Ok(match parse_article(&value)? {
            Some(html) => ArticleReply::with_body(format!("<div class='wikiarticle'>{html}</div>")),
            None => ArticleReply::empty(),
        })
    }
}

/// Titles from an opensearch reply: `[query, [titles], [descriptions], [urls]]`
pub fn parse_opensearch(value: &Value) -> Result<Vec<String>, DictError> {
    let titles = value
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| DictError::BackendUnavailable("malformed opensearch reply".into()))?;

    Ok(titles
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// Article HTML from a `parse` reply. A missing page is not an error.
pub fn parse_article(value: &Value) -> Result<Option<String>, DictError> {
    if let Some(error) = value.get("error") {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        if code == "missingtitle" || code == "invalidtitle" {
            return Ok(None);
        }
        let info = error.get("info").and_then(Value::as_str).unwrap_or(code);
        return Err(DictError::BackendUnavailable(info.to_string()));
    }

    let text = value.pointer("/parse/text");
    let html = match text {
        Some(Value::String(html)) => Some(html.clone()),
        // formatversion=1 nests the html under "*"
        Some(other) => other.get("*").and_then(Value::as_str).map(str::to_string),
        None => None,
    };

    match html {
        Some(html) if !html.trim().is_empty() => Ok(Some(html)),
        Some(_) => Ok(None),
        None => Err(DictError::BackendUnavailable("malformed parse reply".into())),
    }
}
