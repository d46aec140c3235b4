pub mod build;
pub mod source;
pub mod virtual_service;

pub use build::Build;
pub use source::Source;
pub use virtual_service::VirtualService;
