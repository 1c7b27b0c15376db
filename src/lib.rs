pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod flatfile;
pub mod graph;
pub mod kegg;
pub mod materialize;
pub mod output;
pub mod pacing;
pub mod pathways;
pub mod resolver;
