pub mod api;
pub mod config;
pub mod error;
pub mod folder_name;
pub mod models;
pub mod relay;
pub mod state;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;
