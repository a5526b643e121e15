pub mod article;
pub mod dictionary;
pub mod error;
pub mod full_text;
pub mod group;
pub mod merger;
pub mod pattern;
pub mod preprocess;
pub mod request;
pub mod subscription;
pub mod word_finder;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use article::ArticleRequest;
pub use dictionary::{
    ArticleOptions, ArticleReply, Dictionary, DictionaryInfo, IndexProgress, WordMatch, WordMatches,
};
pub use error::DictError;
pub use full_text::{FullTextOptions, FullTextPolicy, FullTextQuery, FullTextSearchCoordinator, QueryTerm};
pub use group::{DictionaryGroup, DictionaryRegistry};
pub use merger::ResultMerger;
pub use pattern::WordPattern;
pub use subscription::Subscription;
pub use word_finder::{LookupOptions, WordFinder};
