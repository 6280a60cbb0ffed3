pub mod graphics;
pub mod logging;
