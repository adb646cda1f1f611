// src/core/mod.rs

pub mod binary;
pub mod catalog;
pub mod config_store;
pub mod directive;
pub mod ini;
pub mod paths;
pub mod shebang;
pub mod version_resolver;
