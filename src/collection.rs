mod core;
mod ops;

pub use self::core::Collection;
pub(crate) use self::core::Store;
