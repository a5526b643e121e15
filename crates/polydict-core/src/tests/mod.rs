mod article_tests;
mod lookup_tests;
