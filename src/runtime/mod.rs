//! Runtime adapters for executing task actions.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
