mod dbus_backend;
mod registry;
pub use dbus_backend::*;
pub use registry::*;

#[derive(Debug)]
pub enum Error {
    /// Registration was consulted before identity and entry-point setup
    /// completed. A programming error, not runtime-recoverable.
    NotRegistered,
    /// An identity field was empty.
    InvalidArgument(&'static str),
    DBus(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotRegistered => {
                write!(f, "Activation registry consulted before registration completed")
            }
            Error::InvalidArgument(field) => {
                write!(f, "Identity field {:?} must not be empty", field)
            }
            Error::DBus(e) => write!(f, "D-Bus error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<zbus::Error> for Error {
    fn from(e: zbus::Error) -> Self {
        Error::DBus(e.to_string())
    }
}

impl From<zbus::fdo::Error> for Error {
    fn from(e: zbus::fdo::Error) -> Self {
        Error::DBus(e.to_string())
    }
}
