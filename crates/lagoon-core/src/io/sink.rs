use crate::error::Result;
use crate::scene::CompositeImage;

/// Persistence boundary for finished composites — a local directory, an
/// object store, or anything else that can hold a keyed raster.
///
/// `store` is only ever called with a fully formed composite, and
/// implementations must be all-or-nothing: a failed store must not
/// leave a partial object behind.
pub trait CompositeSink: Send + Sync {
    fn store(&self, key: &str, image: &CompositeImage) -> Result<()>;
}
