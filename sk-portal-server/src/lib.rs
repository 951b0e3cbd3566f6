pub mod api;
pub mod blob;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod repository;
pub mod service;

pub use error::PortalError;
pub use service::PortalService;

pub struct AppState {
    pub portal: PortalService,
}

impl AppState {
    pub fn new(portal: PortalService) -> Self {
        Self { portal }
    }
}
