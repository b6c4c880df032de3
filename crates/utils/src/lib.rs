pub mod hostname;
pub mod logging;
pub mod version;
