pub mod frame;
pub mod grid;
pub mod names;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod sector;
pub mod shards;
pub mod sidecar;
pub mod state;
pub mod store;
