//! Lookup of color spaces by identifier string.

use std::sync::Arc;

use hashbrown::HashMap;

use super::alpha::AlphaU8ColorSpace;
use super::gray::GrayU8ColorSpace;
use super::rgb::RgbU8ColorSpace;
use super::ycbcr::YCbCrU8ColorSpace;
use super::ColorSpace;

/// Maps color space ids ("RGBA", "GRAYA", ...) to shared instances.
///
/// All built-in spaces are registered on construction; plugins may add
/// more through [`register`](Self::register).
#[derive(Debug)]
pub struct ColorSpaceRegistry {
    spaces: HashMap<&'static str, Arc<dyn ColorSpace>>,
}

impl ColorSpaceRegistry {
    pub fn new() -> Self {
        let mut registry = ColorSpaceRegistry { spaces: HashMap::new() };
        registry.register(Arc::new(RgbU8ColorSpace::new()));
        registry.register(Arc::new(GrayU8ColorSpace::new()));
        registry.register(Arc::new(YCbCrU8ColorSpace::new()));
        registry.register(Arc::new(AlphaU8ColorSpace::new()));
        registry
    }

    /// Registers a space under its own id, replacing any previous entry.
    pub fn register(&mut self, space: Arc<dyn ColorSpace>) {
        self.spaces.insert(space.id(), space);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ColorSpace>> {
        self.spaces.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.spaces.keys().copied()
    }
}

impl Default for ColorSpaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_spaces_are_registered() {
        let registry = ColorSpaceRegistry::new();
        for id in ["RGBA", "GRAYA", "YCbCrAU8", "ALPHA"] {
            let space = registry.get(id).unwrap_or_else(|| panic!("missing {id}"));
            assert_eq!(space.id(), id);
            assert!(space.pixel_size() > 0);
        }
        assert!(registry.get("CMYK").is_none());
    }

    #[test]
    fn pixel_sizes_match_layouts() {
        let registry = ColorSpaceRegistry::new();
        assert_eq!(registry.get("RGBA").unwrap().pixel_size(), 4);
        assert_eq!(registry.get("GRAYA").unwrap().pixel_size(), 2);
        assert_eq!(registry.get("YCbCrAU8").unwrap().pixel_size(), 4);
        assert_eq!(registry.get("ALPHA").unwrap().pixel_size(), 1);
    }
}
