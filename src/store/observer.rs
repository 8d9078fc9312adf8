/// Receives progress notifications from a [`Store`](super::Store).
///
/// Notifications are delivered on the thread that drives the store, never on the write worker.
pub trait StoreObserver: Send + Sync {
    /// `completed` of `total` submitted writes have reached the store file.
    fn writes_completed(&self, completed: u64, total: u64) {
        let _ = (completed, total);
    }

    /// `completed` of `total` source files have been processed by a bulk ingestion pass.
    fn files_processed(&self, completed: u64, total: u64) {
        let _ = (completed, total);
    }
}
