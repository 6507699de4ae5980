use futures_util::Stream;
use std::pin::Pin;

// Long-running loops in this service consume boxed streams so the sweeper's
// ticker and the console's line reader share one shutdown path.
pub type GenericBoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;
