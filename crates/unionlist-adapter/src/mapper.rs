#![forbid(unsafe_code)]

//! Union type to holder-factory mapping.
//!
//! [`RegistryMapper`] is the common case: a table of creator closures keyed
//! by union type. [`ChainMapper`] composes mappers for hosts assembling
//! their surface from independent feature modules; the first mapper that
//! answers wins.

use ahash::AHashMap;
use unionlist_core::UnionType;

use crate::holder::ViewHolder;

/// Creates a fresh holder for a union type, or `None` when the type is not
/// this mapper's to render.
pub trait HolderMapper {
    fn map(&self, union_type: UnionType) -> Option<Box<dyn ViewHolder>>;
}

type Creator = Box<dyn Fn() -> Box<dyn ViewHolder>>;

/// Table-backed mapper.
#[derive(Default)]
pub struct RegistryMapper {
    creators: AHashMap<UnionType, Creator>,
}

impl RegistryMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creator; replaces any earlier one for the same type.
    pub fn put<F, H>(&mut self, union_type: UnionType, creator: F) -> &mut Self
    where
        F: Fn() -> H + 'static,
        H: ViewHolder + 'static,
    {
        self.creators
            .insert(union_type, Box::new(move || Box::new(creator())));
        self
    }
}

impl HolderMapper for RegistryMapper {
    fn map(&self, union_type: UnionType) -> Option<Box<dyn ViewHolder>> {
        self.creators.get(&union_type).map(|create| create())
    }
}

/// Ordered composition of mappers; first non-`None` answer wins.
#[derive(Default)]
pub struct ChainMapper {
    mappers: Vec<Box<dyn HolderMapper>>,
}

impl ChainMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mapper: impl HolderMapper + 'static) -> &mut Self {
        self.mappers.push(Box::new(mapper));
        self
    }
}

impl HolderMapper for ChainMapper {
    fn map(&self, union_type: UnionType) -> Option<Box<dyn ViewHolder>> {
        self.mappers.iter().find_map(|m| m.map(union_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unionlist_core::UnionItem;

    struct Tagged(UnionType);

    impl ViewHolder for Tagged {
        fn bind(&mut self, _position: usize, _item: &UnionItem) {}
        fn best_union_type(&self) -> UnionType {
            self.0
        }
    }

    #[test]
    fn registry_maps_registered_types_only() {
        let mut mapper = RegistryMapper::new();
        mapper.put(1, || Tagged(1)).put(2, || Tagged(2));
        assert_eq!(mapper.map(1).map(|h| h.best_union_type()), Some(1));
        assert_eq!(mapper.map(2).map(|h| h.best_union_type()), Some(2));
        assert!(mapper.map(3).is_none());
    }

    #[test]
    fn registry_put_replaces_existing_creator() {
        let mut mapper = RegistryMapper::new();
        mapper.put(1, || Tagged(1));
        mapper.put(1, || Tagged(9));
        assert_eq!(mapper.map(1).map(|h| h.best_union_type()), Some(9));
    }

    #[test]
    fn chain_prefers_earlier_mappers() {
        let mut first = RegistryMapper::new();
        first.put(1, || Tagged(10));
        let mut second = RegistryMapper::new();
        second.put(1, || Tagged(20)).put(2, || Tagged(2));

        let mut chain = ChainMapper::new();
        chain.add(first).add(second);
        assert_eq!(chain.map(1).map(|h| h.best_union_type()), Some(10));
        assert_eq!(chain.map(2).map(|h| h.best_union_type()), Some(2));
        assert!(chain.map(3).is_none());
    }
}
