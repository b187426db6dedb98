pub mod process_manager;

pub use process_manager::LocalProcessManager;
