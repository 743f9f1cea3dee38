mod artifact_repo;
mod unit_run_repo;

pub use artifact_repo::ArtifactRepo;
pub use unit_run_repo::UnitRunRepo;
