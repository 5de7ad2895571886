//! Integration tests for Site-Indexer

mod crawl_tests;
