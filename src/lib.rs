mod app;
pub use app::*;

mod config;
pub use config::*;

mod reddit;
pub use reddit::*;
