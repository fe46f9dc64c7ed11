//! Macros for creating and returning [`crate::error::RelayError`] values.

/// Creates a [`crate::error::RelayError`] from an error kind, a static description and an
/// optional dynamic detail.
#[macro_export]
macro_rules! relay_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::RelayError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::RelayError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates a [`crate::error::RelayError`] and returns it from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::relay_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::relay_error!($kind, $desc, $detail))
    };
}
