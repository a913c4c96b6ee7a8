//! Character sheet engine library.
//!
//! Everything between the sheet document model and the outside world.
//!
//! ## Structure
//!
//! - `use_cases/` - Sheet synchronization, login flow, dice roller
//! - `infrastructure/` - Ports, adapters, debounced writer, config, logging
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
