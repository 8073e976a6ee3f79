pub mod clock;
pub mod dir;
pub mod ids;
pub mod logging;
pub mod runtime;
pub mod time;
