pub mod cluster;
pub mod command;
pub mod config;
pub mod error;
pub mod poll;
pub mod provider;
pub mod subnet;

pub use error::{Error, Result};

#[macro_export]
macro_rules! exit {
    ($err:expr, $($arg:tt)*) => {
        {
            tracing::error!($($arg)*);
            anyhow::bail!($err)
        }
    };
}
