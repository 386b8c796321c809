//! Values stored in a tile cache.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use image::RgbaImage;

use crate::provider::TileAny;

/// Shape of a decoded tile payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Data,
    Image,
    Object,
}

/// A decoded tile payload.
///
/// Cloning is cheap: every variant is reference counted.
#[derive(Clone)]
pub enum TileObject {
    Data(Bytes),
    Image(Arc<RgbaImage>),
    Object(TileAny),
}

impl TileObject {
    pub fn kind(&self) -> TileKind {
        match self {
            TileObject::Data(_) => TileKind::Data,
            TileObject::Image(_) => TileKind::Image,
            TileObject::Object(_) => TileKind::Object,
        }
    }

    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            TileObject::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            TileObject::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Returns the caller-defined object if it has type `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self {
            TileObject::Object(any) => Arc::clone(any).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for TileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileObject::Data(data) => write!(f, "Data({} bytes)", data.len()),
            TileObject::Image(image) => {
                write!(f, "Image({}x{})", image.width(), image.height())
            }
            TileObject::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Cache entry: a loaded payload, or a confirmed-absent marker.
#[derive(Debug, Clone)]
pub enum CachedTile {
    Present(TileObject),
    /// The reader confirmed the tile does not exist
    Absent,
}

impl CachedTile {
    pub fn object(&self) -> Option<&TileObject> {
        match self {
            CachedTile::Present(object) => Some(object),
            CachedTile::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CachedTile::Absent)
    }

    /// True if this entry can satisfy a request for `kind`. Absent entries match every kind.
    pub fn matches(&self, kind: TileKind) -> bool {
        match self {
            CachedTile::Present(object) => object.kind() == kind,
            CachedTile::Absent => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_object() {
        let obj = TileObject::Object(Arc::new(7u32));
        assert_eq!(obj.downcast::<u32>().as_deref(), Some(&7));
        assert!(obj.downcast::<i64>().is_none());
        assert!(TileObject::Data(Bytes::new()).downcast::<u32>().is_none());
    }

    #[test]
    fn test_kind_matching() {
        let data = CachedTile::Present(TileObject::Data(Bytes::from_static(b"x")));
        assert!(data.matches(TileKind::Data));
        assert!(!data.matches(TileKind::Image));
        assert!(CachedTile::Absent.matches(TileKind::Image));
    }
}
