pub mod bucket;
pub mod plan;
pub mod task;
pub mod transfer;
