// Library for tests to access modules

pub mod backfill;
pub mod collector;
pub mod collectors;
pub mod config;
pub mod models;
pub mod rollup;
pub mod rollup_worker;
pub mod storage;
pub mod version;
