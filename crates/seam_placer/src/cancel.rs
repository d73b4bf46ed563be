//! Cooperative cancellation for the init pipeline.
//!
//! Long-running phases (occlusion mesh gathering, decimation, sampling,
//! raycasting, shell optimization) poll a caller-provided callback between
//! phases. There is no preemption; a parallel region always runs to
//! completion before the next check.

use thiserror::Error;

/// Seam placement was cancelled by the caller.
///
/// This is the only error the crate surfaces. All other degenerate
/// conditions are recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("seam placement was cancelled")]
pub struct Cancelled;

/// Callback polled between init phases. Returns `true` to cancel.
pub type CancelCallback<'a> = dyn Fn() -> bool + Sync + 'a;

/// Check the callback and bail out with [`Cancelled`] if it fired.
pub fn ensure_not_cancelled(cancel: &CancelCallback) -> Result<(), Cancelled> {
  if cancel() {
    Err(Cancelled)
  } else {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_cancelled() {
    assert_eq!(ensure_not_cancelled(&|| false), Ok(()));
  }

  #[test]
  fn test_cancelled() {
    assert_eq!(ensure_not_cancelled(&|| true), Err(Cancelled));
  }
}
