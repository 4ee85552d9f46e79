//! Stale source recovery.
//!
//! A listing can go stale between the time it was shown and the time an operation
//! runs. Before mutating anything the source is re-probed; if it vanished, two
//! bounded attempts are made from the last directory listed successfully:
//! 1. rebuild `<current dir>/<basename>` and probe it
//! 2. list the current dir once and look for the basename (exact, then ASCII case-insensitive)
//!
//! Anything else is `PathStale`.

use tracing::{debug, info};

use super::{FileOperationCoordinator, hostpath};
use crate::errors::CourierError;

impl FileOperationCoordinator {
    pub(super) async fn recover_source(&self, path: &str) -> Result<String, CourierError> {
        match self.path_info_checked(path).await {
            Ok(info) if info.exists => return Ok(path.to_string()),
            Ok(_) => {}
            Err(e) => {
                // Cannot tell; let the host decide.
                debug!(path, error = %e, "source probe failed; using path as given");
                return Ok(path.to_string());
            }
        }

        let stale = || CourierError::PathStale {
            path: path.to_string(),
        };
        let Some(ancestor) = self.current_directory() else {
            return Err(stale());
        };
        let name = hostpath::basename(path);
        if name.is_empty() {
            return Err(stale());
        }

        let rebuilt = hostpath::join(&ancestor, name);
        if rebuilt != path
            && let Ok(info) = self.path_info_checked(&rebuilt).await
            && info.exists
        {
            info!(from = path, to = %rebuilt, "recovered stale path from current directory");
            return Ok(rebuilt);
        }

        match self.fetch_listing(&ancestor).await {
            Ok(listing) => {
                let found = listing.find(name).or_else(|| {
                    listing
                        .directories
                        .iter()
                        .chain(listing.files.iter())
                        .find(|e| e.name.eq_ignore_ascii_case(name))
                });
                if let Some(entry) = found {
                    let recovered = hostpath::join(&ancestor, &entry.name);
                    info!(from = path, to = %recovered, "recovered stale path by listing");
                    return Ok(recovered);
                }
            }
            Err(e) => debug!(dir = %ancestor, error = %e, "recovery listing failed"),
        }
        Err(stale())
    }
}
