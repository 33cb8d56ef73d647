//! External service clients.

pub mod weather;

pub use weather::OpenWeatherClient;
