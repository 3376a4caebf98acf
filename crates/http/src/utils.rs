//! Small helpers shared across the crate.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// Reads like `assert!`, but produces an `Err` instead of panicking, which is
/// what the decoders need when peer input violates a limit.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
