use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// A receiver several consumers take turns on.
pub type SharedReceiver<T> = Arc<Mutex<Receiver<T>>>;

/// Create a bounded channel with the specified buffer size
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size.max(1))
}

/// Wrap a receiver so a pool of workers can pull from it
pub fn share_receiver<T>(receiver: Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(receiver))
}
