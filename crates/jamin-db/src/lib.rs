//! Jamin database layer
//!
//! Postgres connection setup, migrations and the repositories for themes and
//! layers.

pub mod db;

pub use db::{connect, run_migrations, LayerRepository, LayerStore, ThemeRepository};
