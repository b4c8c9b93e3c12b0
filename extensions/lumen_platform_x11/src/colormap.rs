//! Colormaps attached to windows by this connection

use lumen_platform::SurfaceId;
use rustc_hash::FxHashMap;
use std::sync::{Mutex, PoisonError};
use x11_dl::xlib::Colormap;

/// Tracks the colormap created for each window so it can be freed
///
/// A window keeps at most one colormap from this connection: attaching a new
/// one hands back the replaced colormap for freeing.
#[derive(Debug, Default)]
pub struct ColormapRegistry {
    owned: Mutex<FxHashMap<SurfaceId, Colormap>>,
}

impl ColormapRegistry {
    /// Record `colormap` as attached to `window`, returning the one it replaces
    pub fn attach(&self, window: SurfaceId, colormap: Colormap) -> Option<Colormap> {
        self.lock().insert(window, colormap)
    }

    /// Forget the colormap of a destroyed window, returning it for freeing
    pub fn detach(&self, window: SurfaceId) -> Option<Colormap> {
        self.lock().remove(&window)
    }

    /// Take every remaining colormap
    pub fn drain(&self) -> Vec<Colormap> {
        self.lock().drain().map(|(_, colormap)| colormap).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<SurfaceId, Colormap>> {
        self.owned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(raw: u64) -> SurfaceId {
        SurfaceId::from_raw(raw).unwrap()
    }

    #[test]
    fn test_rebinding_returns_replaced_colormap() {
        let registry = ColormapRegistry::default();

        assert_eq!(registry.attach(window(0x0420_0001), 0x21), None);
        assert_eq!(registry.attach(window(0x0420_0001), 0x22), Some(0x21));
        assert_eq!(registry.attach(window(0x0420_0002), 0x23), None);
    }

    #[test]
    fn test_destroyed_window_releases_its_colormap() {
        let registry = ColormapRegistry::default();
        registry.attach(window(0x0420_0001), 0x21);

        assert_eq!(registry.detach(window(0x0420_0001)), Some(0x21));
        assert_eq!(registry.detach(window(0x0420_0001)), None);
        assert!(registry.drain().is_empty());
    }

    #[test]
    fn test_drain_takes_everything() {
        let registry = ColormapRegistry::default();
        registry.attach(window(0x0420_0001), 0x21);
        registry.attach(window(0x0420_0002), 0x22);

        let mut remaining = registry.drain();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![0x21, 0x22]);
        assert!(registry.drain().is_empty());
    }
}
