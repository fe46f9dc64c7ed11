//! Failpoint integration for testing failure scenarios of the publishing tiers.
//!
//! Failpoints are configured from tests through the `fail` crate and let a test fail a
//! whole tier without touching the adapters behind it.

use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};

pub const PUBLISHER_BEFORE_PRIMARY: &str = "publisher.before_primary";
pub const PUBLISHER_BEFORE_FALLBACK: &str = "publisher.before_fallback";

/// Executes a configurable failpoint.
///
/// When the failpoint is active and set to return, this function returns an error of kind
/// [`ErrorKind::InjectedFailure`], carrying the optional failpoint parameter as detail.
///
/// Returns `Ok(())` when the failpoint is inactive.
pub fn relay_fail_point(name: &str) -> RelayResult<()> {
    fail_point!(name, |parameter| {
        let detail = match parameter {
            Some(parameter) => format!("The failpoint '{name}' returned an error: {parameter}"),
            None => format!("The failpoint '{name}' returned an error"),
        };

        bail!(
            ErrorKind::InjectedFailure,
            "An error occurred in a fail point",
            detail
        );
    });

    Ok(())
}
